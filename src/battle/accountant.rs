//! Width, power and attack bookkeeping
//!
//! Pure computations over a battle's current membership, plus the per-battle
//! ledger the other phases write into. The ledger is a field of the battle,
//! so it disappears with it.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::battle::events::Side;
use crate::battle::execution::Battle;
use crate::core::config::BattleConfig;
use crate::core::types::{HexCoord, UnitId};
use crate::world::{Unit, World};

/// Running totals for one side
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SideStats {
    pub rolls: u64,
    pub hits: u64,
    pub hp_damage: f64,
    pub org_damage: f64,
}

/// Per-battle side tables
#[derive(Debug, Clone, Default)]
pub struct CombatLedger {
    attacks: AHashMap<UnitId, f64>,
    defences: AHashMap<UnitId, f64>,
    attacker_stats: SideStats,
    defender_stats: SideStats,
}

impl CombatLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attacks(&mut self, unit: UnitId, attacks: f64) {
        self.attacks.insert(unit, attacks);
    }

    /// Attack volume recorded this tick (0 if the unit did not attack)
    pub fn attacks(&self, unit: UnitId) -> f64 {
        self.attacks.get(&unit).copied().unwrap_or(0.0)
    }

    pub fn reset_attacks(&mut self) {
        self.attacks.clear();
    }

    pub fn set_defence(&mut self, unit: UnitId, defence: f64) {
        self.defences.insert(unit, defence);
    }

    /// Defence value built this tick (0 if none was built)
    pub fn defence(&self, unit: UnitId) -> f64 {
        self.defences.get(&unit).copied().unwrap_or(0.0)
    }

    /// Use up one point of a unit's defence against an incoming roll
    ///
    /// Returns whether the roll met any defence at all.
    pub fn spend_defence(&mut self, unit: UnitId) -> bool {
        match self.defences.get_mut(&unit) {
            Some(defence) if *defence > 0.0 => {
                *defence = (*defence - 1.0).max(0.0);
                true
            }
            _ => false,
        }
    }

    pub fn reset_defences(&mut self) {
        self.defences.clear();
    }

    /// Drop everything known about a unit that left the battle
    pub fn forget(&mut self, unit: UnitId) {
        self.attacks.remove(&unit);
        self.defences.remove(&unit);
    }

    pub fn stats(&self, side: Side) -> &SideStats {
        match side {
            Side::Attacker => &self.attacker_stats,
            Side::Defender => &self.defender_stats,
        }
    }

    pub fn stats_mut(&mut self, side: Side) -> &mut SideStats {
        match side {
            Side::Attacker => &mut self.attacker_stats,
            Side::Defender => &mut self.defender_stats,
        }
    }
}

/// Distinct hexes the attackers come from
pub fn flanks(battle: &Battle, world: &World) -> AHashSet<HexCoord> {
    battle
        .units(Side::Attacker)
        .filter_map(|id| world.unit(id))
        .map(|u| u.position)
        .collect()
}

/// Contestable frontage: every attacking direction beyond the first widens it
pub fn max_width(battle: &Battle, world: &World, config: &BattleConfig) -> f64 {
    let extra_flanks = flanks(battle, world).len().saturating_sub(1) as f64;
    config.width.base + config.width.base * config.width.flank_factor * extra_flanks
}

/// Combined combat width of a side's frontline
pub fn frontline_width(battle: &Battle, side: Side, world: &World) -> f64 {
    battle
        .frontline(side)
        .iter()
        .filter_map(|id| world.unit(*id))
        .map(|u| u.stats.combat_width)
        .sum()
}

/// Mean hardness over a set of units (0 when empty)
pub fn average_hardness<'a>(units: impl IntoIterator<Item = &'a Unit>) -> f64 {
    let (sum, count) = units
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), u| (sum + u.stats.hardness, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[derive(Debug, Default)]
struct StatMaxima {
    soft_attack: f64,
    hard_attack: f64,
    defence: f64,
    breakthrough: f64,
    armor: f64,
    piercing: f64,
}

impl StatMaxima {
    fn absorb(&mut self, unit: &Unit) {
        let s = &unit.stats;
        self.soft_attack = self.soft_attack.max(s.soft_attack);
        self.hard_attack = self.hard_attack.max(s.hard_attack);
        self.defence = self.defence.max(s.defence);
        self.breakthrough = self.breakthrough.max(s.breakthrough);
        self.armor = self.armor.max(s.armor);
        self.piercing = self.piercing.max(s.piercing);
    }
}

fn normalized(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Ranking score of every reserve unit for frontline promotion
///
/// Stats are normalised against the best reserve unit of either side, and
/// weighted by how hard the opposing coalition is on average.
pub fn compute_powers(battle: &Battle, world: &World, config: &BattleConfig) -> AHashMap<UnitId, f64> {
    powers_over(battle, world, config, Battle::reserve)
}

/// Same score over the frontline units, normalised among themselves
pub fn frontline_powers(battle: &Battle, world: &World, config: &BattleConfig) -> AHashMap<UnitId, f64> {
    powers_over(battle, world, config, Battle::frontline)
}

fn powers_over(
    battle: &Battle,
    world: &World,
    config: &BattleConfig,
    lines: fn(&Battle, Side) -> &[UnitId],
) -> AHashMap<UnitId, f64> {
    let mut maxima = StatMaxima::default();
    for side in [Side::Attacker, Side::Defender] {
        for unit in lines(battle, side).iter().filter_map(|id| world.unit(*id)) {
            maxima.absorb(unit);
        }
    }

    let attacker_hardness =
        average_hardness(battle.units(Side::Attacker).filter_map(|id| world.unit(id)));
    let defender_hardness =
        average_hardness(battle.units(Side::Defender).filter_map(|id| world.unit(id)));

    let mut powers = AHashMap::new();
    for side in [Side::Attacker, Side::Defender] {
        let enemy_hardness = match side {
            Side::Attacker => defender_hardness,
            Side::Defender => attacker_hardness,
        };

        for unit in lines(battle, side).iter().filter_map(|id| world.unit(*id)) {
            let s = &unit.stats;
            // defence stands in for the whole breakthrough/armor pair
            let staying_power = match side {
                Side::Attacker => {
                    normalized(s.breakthrough, maxima.breakthrough) * 0.5
                        + normalized(s.armor, maxima.armor) * 0.5
                }
                Side::Defender => normalized(s.defence, maxima.defence),
            };

            let firepower = normalized(s.soft_attack, maxima.soft_attack) * (1.0 - enemy_hardness)
                + normalized(s.hard_attack, maxima.hard_attack) * enemy_hardness
                + normalized(s.piercing, maxima.piercing) * enemy_hardness
                + staying_power;

            let health = unit.hp_ratio().min(unit.org_ratio());
            let power = firepower * health / s.combat_width.max(1.0)
                + s.initiative * config.reserves.initiative_weight;

            powers.insert(unit.id, power);
        }
    }

    powers
}
