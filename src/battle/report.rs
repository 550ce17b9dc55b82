//! Read-only battle snapshots for display and export
//!
//! Every number here is derived from public getters, so a replication layer
//! can build the same view without touching engine internals.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::battle::accountant::{frontline_width, max_width, SideStats};
use crate::battle::events::{BattleOutcome, Side};
use crate::battle::execution::{Battle, BattlePhase};
use crate::battle::prediction::Prediction;
use crate::core::config::BattleConfig;
use crate::core::types::{BattleId, Hour, HexCoord, NationId, UnitId};
use crate::world::World;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRow {
    pub id: UnitId,
    pub name: String,
    pub owner: NationId,
    pub frontline: bool,
    pub hp: f64,
    pub max_hp: f64,
    pub organisation: f64,
    pub max_organisation: f64,
    pub combat_width: f64,
    pub hardness: f64,
    /// Attack recorded during the last tick
    pub attack: f64,
    /// Defence built during the last tick
    pub defence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideReport {
    pub nations: Vec<NationId>,
    pub frontline_width: f64,
    pub units: Vec<UnitRow>,
    pub stats: SideStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    pub battle: BattleId,
    pub location: HexCoord,
    pub phase: BattlePhase,
    pub outcome: Option<BattleOutcome>,
    pub hours: Hour,
    pub max_width: f64,
    pub prediction: Option<Prediction>,
    pub attackers: SideReport,
    pub defenders: SideReport,
}

impl BattleSnapshot {
    pub fn capture(battle: &Battle, world: &World, config: &BattleConfig) -> Self {
        Self {
            battle: battle.id(),
            location: battle.location(),
            phase: battle.phase(),
            outcome: battle.outcome(),
            hours: battle.hours(),
            max_width: max_width(battle, world, config),
            prediction: battle.last_prediction(),
            attackers: side_report(battle, Side::Attacker, world),
            defenders: side_report(battle, Side::Defender, world),
        }
    }
}

fn side_report(battle: &Battle, side: Side, world: &World) -> SideReport {
    let frontline = battle.frontline(side);
    let units = battle
        .units(side)
        .filter_map(|id| world.unit(id))
        .map(|u| UnitRow {
            id: u.id,
            name: u.name.clone(),
            owner: u.owner,
            frontline: frontline.contains(&u.id),
            hp: u.hp(),
            max_hp: u.stats.max_hp,
            organisation: u.organisation(),
            max_organisation: u.stats.max_organisation,
            combat_width: u.stats.combat_width,
            hardness: u.stats.hardness,
            attack: battle.ledger().attacks(u.id),
            defence: battle.ledger().defence(u.id),
        })
        .collect();

    SideReport {
        nations: match side {
            Side::Attacker => battle.attacking_nations(),
            Side::Defender => battle.defending_nations(),
        },
        frontline_width: frontline_width(battle, side, world),
        units,
        stats: *battle.ledger().stats(side),
    }
}

impl fmt::Display for BattleSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} at ({}, {})  hour {}  width {:.1}",
            self.battle, self.location.q, self.location.r, self.hours, self.max_width
        )?;
        match self.outcome {
            Some(outcome) => writeln!(f, "  outcome: {outcome:?}")?,
            None => writeln!(f, "  in progress")?,
        }
        if let Some(p) = self.prediction {
            writeln!(f, "  prediction: {:.1}h, score {:+.2}", p.hours, p.score)?;
        }
        write_side(f, "attackers", &self.attackers)?;
        write_side(f, "defenders", &self.defenders)
    }
}

fn write_side(f: &mut fmt::Formatter<'_>, label: &str, side: &SideReport) -> fmt::Result {
    let nations: Vec<String> = side.nations.iter().map(ToString::to_string).collect();
    writeln!(
        f,
        "  {label} [{}]  front {:.0}  rolls {}  hits {}  dealt {:.2} hp / {:.2} org",
        nations.join(", "),
        side.frontline_width,
        side.stats.rolls,
        side.stats.hits,
        side.stats.hp_damage,
        side.stats.org_damage
    )?;
    for row in &side.units {
        let name = if row.name.is_empty() { row.id.to_string() } else { row.name.clone() };
        writeln!(
            f,
            "    {} {:<24} hp {:>6.2}/{:<6.0} org {:>6.2}/{:<5.0} atk {:>4.0} def {:>5.2}",
            if row.frontline { "F" } else { "R" },
            name,
            row.hp,
            row.max_hp,
            row.organisation,
            row.max_organisation,
            row.attack,
            row.defence
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::testing::{spawn, two_nation_world};
    use crate::world::UnitStats;

    #[test]
    fn test_snapshot_lists_both_sides() {
        let (mut world, red, blue) = two_nation_world();
        let location = HexCoord::new(0, 0);
        let att = spawn(&mut world, red, HexCoord::new(1, 0), UnitStats::default());
        let spare = spawn(&mut world, red, HexCoord::new(1, 0), UnitStats { combat_width: 65.0, ..UnitStats::default() });
        let def = spawn(&mut world, blue, location, UnitStats::default());
        let config = BattleConfig::default();
        let battle = Battle::new(BattleId(2), location, vec![def], vec![att, spare], &world, &config);

        let snapshot = battle.snapshot(&world, &config);

        assert_eq!(snapshot.battle, BattleId(2));
        assert_eq!(snapshot.max_width, 70.0);
        assert_eq!(snapshot.attackers.nations, vec![red]);
        assert_eq!(snapshot.attackers.units.len(), 2);
        assert_eq!(snapshot.attackers.units.iter().filter(|u| u.frontline).count(), 1);
        assert_eq!(snapshot.defenders.frontline_width, 10.0);
    }

    #[test]
    fn test_snapshot_renders_text_and_json() {
        let (mut world, red, blue) = two_nation_world();
        let location = HexCoord::new(0, 0);
        let att = spawn(&mut world, red, HexCoord::new(1, 0), UnitStats::default());
        let def = spawn(&mut world, blue, location, UnitStats::default());
        world.unit_mut(def).unwrap().name = "1st Guards".to_string();
        let config = BattleConfig::default();
        let battle = Battle::new(BattleId(1), location, vec![def], vec![att], &world, &config);

        let snapshot = battle.snapshot(&world, &config);
        let text = snapshot.to_string();
        assert!(text.contains("battle:1"));
        assert!(text.contains("1st Guards"));

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: BattleSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.defenders.units[0].name, "1st Guards");
    }
}
