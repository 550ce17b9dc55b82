//! Build a running simulation from a parsed scenario

use ahash::{AHashMap, AHashSet};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::battle::repository::{BattleRepository, Engagement};
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{HexCoord, NationId, UnitId};
use crate::scenario::{ModifierSpec, Scenario};
use crate::world::{BuildingKind, Hex, ModifierSet, Unit, World};

/// A scenario turned into live state
pub struct LoadedScenario {
    pub name: String,
    pub world: World,
    pub repository: BattleRepository,
    /// Scenario key -> unit id
    pub units: AHashMap<String, UnitId>,
    pub nation_names: AHashMap<NationId, String>,
    /// Result of each `[[engagements]]` entry, in file order
    pub engagements: Vec<Engagement>,
}

impl LoadedScenario {
    pub fn unit(&self, key: &str) -> Option<UnitId> {
        self.units.get(key).copied()
    }
}

fn invalid(msg: impl Into<String>) -> BattleError {
    BattleError::InvalidScenario(msg.into())
}

fn modifier_set(specs: &[ModifierSpec]) -> ModifierSet {
    let mut set = ModifierSet::new();
    for spec in specs {
        set.push(spec.tag, spec.modifier);
    }
    set
}

/// Populate a world, open every engagement and hand back the repository
///
/// Unit ids are drawn from the config seed, so the same scenario and seed
/// always produce the same battles.
pub fn build(scenario: &Scenario, config: BattleConfig) -> Result<LoadedScenario> {
    config.validate()?;

    let mut nation_names = AHashMap::new();
    for nation in &scenario.nations {
        let id = NationId(nation.id);
        if nation_names.insert(id, nation.name.clone()).is_some() {
            return Err(invalid(format!("duplicate nation {}", nation.id)));
        }
    }
    let known = |id: u32, what: &str| -> Result<NationId> {
        let nation = NationId(id);
        if nation_names.contains_key(&nation) {
            Ok(nation)
        } else {
            Err(invalid(format!("{what} refers to unknown nation {id}")))
        }
    };

    let mut world = World::new();
    for relation in &scenario.relations {
        let a = known(relation.a, "relation")?;
        let b = known(relation.b, "relation")?;
        world.diplomacy.set_relation(a, b, relation.relation);
    }

    let mut seen_hexes = AHashSet::new();
    for spec in &scenario.hexes {
        let coord = HexCoord::new(spec.q, spec.r);
        if !seen_hexes.insert(coord) {
            return Err(invalid(format!("hex ({}, {}) listed twice", spec.q, spec.r)));
        }
        let owner = spec.owner.map(|o| known(o, "hex owner")).transpose()?;
        let mut hex = Hex::new(coord, owner);
        if spec.land_fort > 0 {
            hex = hex.with_building(BuildingKind::LandFort, spec.land_fort);
        }
        hex.modifiers = modifier_set(&spec.modifiers);
        world.add_hex(hex);
    }

    let mut id_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut units = AHashMap::new();
    for spec in &scenario.units {
        let owner = known(spec.owner, "unit owner")?;
        let mut unit = Unit::new(owner, HexCoord::new(spec.q, spec.r), spec.stats.clone())
            .with_name(if spec.name.is_empty() { spec.key.clone() } else { spec.name.clone() });
        unit.id = UnitId::from_rng(&mut id_rng);
        unit.modifiers = modifier_set(&spec.modifiers);
        if let Some(org) = spec.organisation {
            unit.set_organisation(org);
        }

        if units.insert(spec.key.clone(), unit.id).is_some() {
            return Err(invalid(format!("duplicate unit key {}", spec.key)));
        }
        world.add_unit(unit);
    }

    let mut repository = BattleRepository::new(config);
    let mut engagements = Vec::new();
    for spec in &scenario.engagements {
        let ids = spec
            .units
            .iter()
            .map(|key| {
                units
                    .get(key)
                    .copied()
                    .ok_or_else(|| invalid(format!("engagement refers to unknown unit {key}")))
            })
            .collect::<Result<Vec<UnitId>>>()?;
        let engagement = repository.engage(&ids, HexCoord::new(spec.q, spec.r), &world)?;
        tracing::info!(battle = %engagement.battle, created = engagement.created, "engagement opened");
        engagements.push(engagement);
    }

    Ok(LoadedScenario {
        name: scenario.name.clone(),
        world,
        repository,
        units,
        nation_names,
        engagements,
    })
}
