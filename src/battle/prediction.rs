//! Outcome estimate
//!
//! A rough hours-to-resolution figure and a signed score, recomputed every
//! tick for display. Nothing in the combat math reads it.

use serde::{Deserialize, Serialize};

use crate::battle::accountant::average_hardness;
use crate::battle::events::Side;
use crate::battle::execution::Battle;
use crate::core::config::BattleConfig;
use crate::core::types::UnitId;
use crate::world::{ModifierContext, PropertyTag, World};

/// Cached estimate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Prediction {
    /// Hours until the first side runs out of organisation (>= 0)
    pub hours: f64,
    /// In [-1, 1]; positive favours the attacker
    pub score: f64,
}

/// Organisation a side can still spend, reserves counted at a discount
fn organisation_pool(battle: &Battle, side: Side, world: &World, config: &BattleConfig) -> f64 {
    let sum = |ids: &[UnitId]| -> f64 {
        ids.iter()
            .filter_map(|id| world.unit(*id))
            .map(|u| u.organisation())
            .sum()
    };
    sum(battle.frontline(side)) + config.prediction.reserve_org_weight * sum(battle.reserve(side))
}

/// Attack rolls a side's frontline would throw against the current enemy front
fn attack_rolls(battle: &Battle, side: Side, world: &World, config: &BattleConfig) -> f64 {
    let hardness = average_hardness(
        battle
            .frontline(side.opposite())
            .iter()
            .filter_map(|id| world.unit(*id)),
    );

    battle
        .frontline(side)
        .iter()
        .filter_map(|id| world.unit(*id))
        .map(|u| {
            let base = hardness * u.stats.hard_attack + (1.0 - hardness) * u.stats.soft_attack;
            (u.modifiers.effective_value(base, &[PropertyTag::Attack]) / config.combat.stat_divisor).round()
        })
        .sum()
}

/// Defence points of a side's frontline
fn defence_points(battle: &Battle, side: Side, world: &World, config: &BattleConfig) -> f64 {
    battle
        .frontline(side)
        .iter()
        .filter_map(|id| world.unit(*id))
        .map(|u| {
            let (base, tag) = match side {
                Side::Defender => (u.stats.defence, PropertyTag::Defence),
                Side::Attacker => (u.stats.breakthrough, PropertyTag::Breakthrough),
            };
            (u.modifiers.effective_value(base, &[tag]) / config.combat.stat_divisor).round()
        })
        .sum()
}

/// Organisation per hour `side` strips from its opponent
fn damage_per_hour(battle: &Battle, side: Side, world: &World, config: &BattleConfig) -> f64 {
    let p = &config.prediction;
    let attacks = attack_rolls(battle, side, world, config);
    let defences = defence_points(battle, side.opposite(), world, config);

    let resisted = attacks.min(defences);
    let unresisted = attacks - resisted;
    let hits = resisted * p.resisted_hit_rate + unresisted * p.unresisted_hit_rate;

    (hits * p.mean_org_roll * config.combat.org_damage_per_hit).max(p.min_damage_per_hour)
}

pub fn predict_outcome(battle: &Battle, world: &World, config: &BattleConfig) -> Prediction {
    let attacker_pool = organisation_pool(battle, Side::Attacker, world, config);
    let defender_pool = organisation_pool(battle, Side::Defender, world, config);

    let to_break_attacker = attacker_pool / damage_per_hour(battle, Side::Defender, world, config);
    let to_break_defender = defender_pool / damage_per_hour(battle, Side::Attacker, world, config);

    let hours = (to_break_attacker.min(to_break_defender) * config.prediction.hours_factor).max(0.0);
    let longest = to_break_attacker.max(to_break_defender);
    let score = if longest > 0.0 {
        ((to_break_attacker - to_break_defender) / longest).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    Prediction { hours, score }
}
