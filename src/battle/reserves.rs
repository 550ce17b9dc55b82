//! Frontline / reserve membership
//!
//! Initial greedy selection, hourly promotion rolls, the defence values the
//! combat phase reads, and disengagement of broken frontline units.

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use rand::Rng;

use crate::battle::accountant::{frontline_powers, frontline_width, max_width};
use crate::battle::events::{RemovalReason, Side};
use crate::battle::execution::Battle;
use crate::core::config::BattleConfig;
use crate::core::types::UnitId;
use crate::world::{ModifierContext, PropertyTag, World};

/// First candidate with the strictly highest score
fn best_candidate(candidates: impl Iterator<Item = (UnitId, f64)>) -> Option<UnitId> {
    candidates
        .fold(None, |best: Option<(UnitId, OrderedFloat<f64>)>, (id, score)| {
            let score = OrderedFloat(score);
            match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((id, score)),
            }
        })
        .map(|(id, _)| id)
}

fn combat_width(world: &World, id: UnitId) -> f64 {
    world.unit(id).map_or(0.0, |u| u.stats.combat_width)
}

/// Strongest reserve unit that keeps the front at or under `limit`
fn best_fitting(
    reserve: &[UnitId],
    powers: &AHashMap<UnitId, f64>,
    width: f64,
    limit: f64,
    world: &World,
) -> Option<UnitId> {
    best_candidate(
        reserve
            .iter()
            .filter(|id| width + combat_width(world, **id) <= limit)
            .map(|id| (*id, powers.get(id).copied().unwrap_or(0.0))),
    )
}

/// Greedy fill of a frontline from its reserve
///
/// While the front is under `max_width`, the strongest reserve unit that
/// still fits under `max_width` moves up. A unit that only fits under the
/// hard ceiling is taken only while the front is still empty, so a side
/// always fields something when it can. Returns the promoted units in order.
pub fn select_units(
    reserve: &mut Vec<UnitId>,
    frontline: &mut Vec<UnitId>,
    powers: &AHashMap<UnitId, f64>,
    max_width: f64,
    world: &World,
    config: &BattleConfig,
) -> Vec<UnitId> {
    let ceiling = config.width_ceiling(max_width);
    let mut width: f64 = frontline.iter().map(|id| combat_width(world, *id)).sum();
    let mut promoted = Vec::new();

    while width < max_width {
        let best_under = best_fitting(reserve, powers, width, max_width, world);
        let best_over = if frontline.is_empty() {
            best_fitting(reserve, powers, width, ceiling, world)
        } else {
            None
        };

        let Some(chosen) = best_under.or(best_over) else {
            break;
        };

        reserve.retain(|id| *id != chosen);
        frontline.push(chosen);
        width += combat_width(world, chosen);
        promoted.push(chosen);
    }

    promoted
}

/// Hourly promotion rolls for every reserve unit of both sides
///
/// A unit that would push the front past the hard ceiling never moves up;
/// one that would push it past max width moves up at a reduced chance.
pub fn tick_reserves(
    battle: &mut Battle,
    world: &World,
    rng: &mut impl Rng,
    config: &BattleConfig,
) -> Vec<UnitId> {
    let max_width = max_width(battle, world, config);
    let ceiling = config.width_ceiling(max_width);
    let mut promoted = Vec::new();

    for side in [Side::Attacker, Side::Defender] {
        for id in battle.reserve(side).to_vec() {
            let Some(unit) = world.unit(id) else {
                continue;
            };

            let potential = frontline_width(battle, side, world) + unit.stats.combat_width;
            if potential > ceiling {
                continue;
            }

            let overflow = potential > max_width;
            let mut chance = config.reserves.promotion_chance * (1.0 + unit.stats.initiative);
            if overflow {
                chance *= config.reserves.overflow_factor;
            }

            if rng.gen::<f64>() < chance {
                battle.promote(id, side);
                promoted.push(id);
                tracing::debug!(
                    battle = %battle.id(),
                    unit = %id,
                    ?side,
                    overflow,
                    "reserve unit moved up"
                );
            }
        }
    }

    promoted
}

/// Pull the weakest frontline units back until both sides fit the hard
/// ceiling again
///
/// Frontage shrinks when an attacking direction empties out. Units never
/// leave the battle here, they only return to reserve.
pub fn fit_to_ceiling(battle: &mut Battle, world: &World, config: &BattleConfig) -> Vec<UnitId> {
    let max_width = max_width(battle, world, config);
    let ceiling = config.width_ceiling(max_width);
    let mut relieved = Vec::new();

    for side in [Side::Attacker, Side::Defender] {
        if frontline_width(battle, side, world) <= ceiling {
            continue;
        }

        let powers = frontline_powers(battle, world, config);
        let mut weakest: Vec<(UnitId, f64)> = battle
            .frontline(side)
            .iter()
            .map(|id| (*id, powers.get(id).copied().unwrap_or(0.0)))
            .collect();
        // stable: among equals the latest arrival goes first
        weakest.reverse();
        weakest.sort_by_key(|(_, power)| OrderedFloat(*power));

        for (id, _) in weakest {
            if frontline_width(battle, side, world) <= ceiling {
                break;
            }
            if battle.relieve(id, side) {
                relieved.push(id);
            }
        }

        tracing::debug!(
            battle = %battle.id(),
            ?side,
            max_width,
            relieved = relieved.len(),
            "front pulled back under ceiling"
        );
    }

    relieved
}

/// Over-width multiplier for a side: 1.0 at or under capacity, shrinking
/// linearly with the excess above it
pub fn crowding_factor(width: f64, max_width: f64) -> f64 {
    if max_width <= 0.0 {
        return 1.0;
    }
    let over = max_width - width;
    if over < 0.0 {
        (1.0 + over / max_width).max(0.0)
    } else {
        1.0
    }
}

/// Rebuild the defence value of a side's frontline units for this tick
///
/// Defenders hold with `defence`, attackers with `breakthrough`; both are
/// divided into roll-sized points and reduced when the side is crowded.
pub fn build_defences(battle: &mut Battle, side: Side, world: &World, config: &BattleConfig) {
    let max_width = max_width(battle, world, config);
    let crowding = crowding_factor(frontline_width(battle, side, world), max_width);

    for id in battle.frontline(side).to_vec() {
        let Some(unit) = world.unit(id) else {
            continue;
        };

        let (base, tag) = match side {
            Side::Defender => (unit.stats.defence, PropertyTag::Defence),
            Side::Attacker => (unit.stats.breakthrough, PropertyTag::Breakthrough),
        };
        let value = unit.modifiers.effective_value(base, &[tag]) / config.combat.stat_divisor;

        battle.ledger_mut().set_defence(id, value * crowding);
    }
}

/// Pull broken units out of both frontlines
///
/// Units that died during the hour leave as dead. Units whose organisation
/// ratio fell under the threshold leave alive: defenders are ordered to
/// retreat, attackers drop their current (advance) order.
pub fn disengage(battle: &mut Battle, world: &mut World, config: &BattleConfig) -> Vec<UnitId> {
    let mut removed = Vec::new();

    for side in [Side::Attacker, Side::Defender] {
        for id in battle.frontline(side).to_vec() {
            let Some(unit) = world.unit(id) else {
                battle.remove_unit(id, RemovalReason::Died);
                removed.push(id);
                continue;
            };

            if !unit.is_alive() {
                battle.remove_unit(id, RemovalReason::Died);
                removed.push(id);
                continue;
            }

            if unit.org_ratio() >= config.reserves.disengage_org_ratio {
                continue;
            }

            match side {
                Side::Defender => {
                    let to = world.order_retreat(id);
                    tracing::debug!(battle = %battle.id(), unit = %id, ?to, "defender retreats");
                }
                Side::Attacker => {
                    world.cancel_order(id);
                    tracing::debug!(battle = %battle.id(), unit = %id, "attacker breaks off");
                }
            }
            battle.remove_unit(id, RemovalReason::Disengaged);
            removed.push(id);
        }
    }

    removed
}
