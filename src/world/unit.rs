//! Military units as seen by the battle engine

use serde::{Deserialize, Serialize};

use crate::core::types::{HexCoord, NationId, UnitId};
use crate::world::modifiers::ModifierSet;

/// Flat combat stats of a unit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitStats {
    pub max_hp: f64,
    pub max_organisation: f64,
    pub soft_attack: f64,
    pub hard_attack: f64,
    pub defence: f64,
    pub breakthrough: f64,
    pub armor: f64,
    pub piercing: f64,
    /// 0.0 (sluggish) to 1.0 (aggressive)
    pub initiative: f64,
    /// 0.0 (soft, infantry) to 1.0 (hard, armour)
    pub hardness: f64,
    pub combat_width: f64,
}

impl Default for UnitStats {
    fn default() -> Self {
        // Line infantry division
        Self {
            max_hp: 100.0,
            max_organisation: 50.0,
            soft_attack: 40.0,
            hard_attack: 5.0,
            defence: 50.0,
            breakthrough: 10.0,
            armor: 0.0,
            piercing: 5.0,
            initiative: 0.2,
            hardness: 0.0,
            combat_width: 10.0,
        }
    }
}

/// Standing order of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitOrder {
    #[default]
    Idle,
    Move { to: HexCoord },
    /// Falling back; `to` is None when there was nowhere to go
    Retreat { to: Option<HexCoord> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub owner: NationId,
    pub position: HexCoord,
    pub stats: UnitStats,
    pub order: UnitOrder,
    #[serde(default)]
    pub modifiers: ModifierSet,
    hp: f64,
    organisation: f64,
}

impl Unit {
    /// A fresh unit at full health and organisation
    pub fn new(owner: NationId, position: HexCoord, stats: UnitStats) -> Self {
        Self {
            id: UnitId::new(),
            name: String::new(),
            owner,
            position,
            hp: stats.max_hp,
            organisation: stats.max_organisation,
            stats,
            order: UnitOrder::Idle,
            modifiers: ModifierSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn hp(&self) -> f64 {
        self.hp
    }

    pub fn organisation(&self) -> f64 {
        self.organisation
    }

    pub fn set_hp(&mut self, hp: f64) {
        self.hp = hp.clamp(0.0, self.stats.max_hp);
    }

    pub fn set_organisation(&mut self, organisation: f64) {
        self.organisation = organisation.clamp(0.0, self.stats.max_organisation);
    }

    pub fn hp_ratio(&self) -> f64 {
        ratio(self.hp, self.stats.max_hp)
    }

    pub fn org_ratio(&self) -> f64 {
        ratio(self.organisation, self.stats.max_organisation)
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Fall back from the current position
    pub fn retreat(&mut self, to: Option<HexCoord>) {
        self.order = UnitOrder::Retreat { to };
    }

    pub fn cancel_current_order(&mut self) {
        self.order = UnitOrder::Idle;
    }
}

fn ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
