//! Map cells read by the battle engine

use serde::{Deserialize, Serialize};

use crate::core::types::{HexCoord, NationId};
use crate::world::modifiers::ModifierSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    LandFort,
    CoastalFort,
    Infrastructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub kind: BuildingKind,
    pub level: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hex {
    pub coord: HexCoord,
    pub owner: Option<NationId>,
    #[serde(default)]
    pub buildings: Vec<Building>,
    #[serde(default)]
    pub modifiers: ModifierSet,
}

impl Hex {
    pub fn new(coord: HexCoord, owner: Option<NationId>) -> Self {
        Self {
            coord,
            owner,
            buildings: Vec::new(),
            modifiers: ModifierSet::new(),
        }
    }

    pub fn with_building(mut self, kind: BuildingKind, level: u32) -> Self {
        self.buildings.push(Building { kind, level });
        self
    }

    pub fn owner(&self) -> Option<NationId> {
        self.owner
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn neighbors(&self) -> [HexCoord; 6] {
        self.coord.neighbors()
    }

    /// Total level of all buildings of one kind
    pub fn building_level(&self, kind: BuildingKind) -> u32 {
        self.buildings
            .iter()
            .filter(|b| b.kind == kind)
            .map(|b| b.level)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_building_levels_sum_per_kind() {
        let hex = Hex::new(HexCoord::new(0, 0), Some(NationId(1)))
            .with_building(BuildingKind::LandFort, 2)
            .with_building(BuildingKind::LandFort, 1)
            .with_building(BuildingKind::Infrastructure, 5);

        assert_eq!(hex.building_level(BuildingKind::LandFort), 3);
        assert_eq!(hex.building_level(BuildingKind::CoastalFort), 0);
    }
}
