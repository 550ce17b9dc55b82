//! Scenario files - a small campaign situation described in TOML
//!
//! Nations, their relations, map hexes (with forts), units and the
//! engagements to open. `loader` turns a parsed scenario into a `World` and a
//! `BattleRepository` ready to be driven hour by hour.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::config::BattleConfig;
use crate::core::error::Result;
use crate::world::{Modifier, PropertyTag, Relation, UnitStats};

pub use loader::{build, LoadedScenario};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NationSpec {
    pub id: u32,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationSpec {
    pub a: u32,
    pub b: u32,
    pub relation: Relation,
}

/// One modifier entry, e.g. `{ tag = "Attack", mult = 0.1 }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierSpec {
    pub tag: PropertyTag,
    #[serde(flatten)]
    pub modifier: Modifier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HexSpec {
    pub q: i32,
    pub r: i32,
    #[serde(default)]
    pub owner: Option<u32>,
    #[serde(default)]
    pub land_fort: u32,
    #[serde(default)]
    pub modifiers: Vec<ModifierSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Scenario-local name used by engagements
    pub key: String,
    #[serde(default)]
    pub name: String,
    pub owner: u32,
    pub q: i32,
    pub r: i32,
    #[serde(default)]
    pub stats: UnitStats,
    #[serde(default)]
    pub modifiers: Vec<ModifierSpec>,
    /// Starting organisation, if not full
    #[serde(default)]
    pub organisation: Option<f64>,
}

/// Units moving into a hex to fight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementSpec {
    pub q: i32,
    pub r: i32,
    pub units: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    /// Engine tunables; defaults when absent
    #[serde(default)]
    pub config: Option<BattleConfig>,
    #[serde(default)]
    pub nations: Vec<NationSpec>,
    #[serde(default)]
    pub relations: Vec<RelationSpec>,
    #[serde(default)]
    pub hexes: Vec<HexSpec>,
    #[serde(default)]
    pub units: Vec<UnitSpec>,
    #[serde(default)]
    pub engagements: Vec<EngagementSpec>,
}

impl Scenario {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Engine config embedded in the scenario, or the defaults
    pub fn battle_config(&self) -> BattleConfig {
        self.config.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_scenario() {
        let scenario = Scenario::from_toml_str(
            r#"
            name = "skirmish"

            [[nations]]
            id = 1

            [[units]]
            key = "a"
            owner = 1
            q = 0
            r = 0
            stats = { soft_attack = 70.0 }
            modifiers = [{ tag = "Attack", mult = 0.1 }]
            "#,
        )
        .unwrap();

        assert_eq!(scenario.name, "skirmish");
        assert!(scenario.config.is_none());
        assert_eq!(scenario.units[0].stats.soft_attack, 70.0);
        assert_eq!(scenario.units[0].stats.combat_width, 10.0);
        assert_eq!(scenario.units[0].modifiers[0].modifier.mult, 0.1);
    }

    #[test]
    fn test_parse_rejects_bad_relation() {
        let result = Scenario::from_toml_str(
            r#"
            [[relations]]
            a = 1
            b = 2
            relation = "Frenemy"
            "#,
        );
        assert!(result.is_err());
    }
}
