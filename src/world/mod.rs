//! Campaign-map state the battle engine reads and writes
//!
//! Units, hexes and diplomacy are owned by the wider game; this is the
//! minimal surface the engine needs. Battles refer to units by id and reach
//! them through `World`.

pub mod diplomacy;
pub mod hex;
pub mod modifiers;
pub mod unit;

use ahash::AHashMap;

use crate::core::types::{HexCoord, NationId, UnitId};

pub use diplomacy::{Diplomacy, Relation};
pub use hex::{Building, BuildingKind, Hex};
pub use modifiers::{Modifier, ModifierContext, ModifierSet, PropertyTag};
pub use unit::{Unit, UnitOrder, UnitStats};

static NO_MODIFIERS: std::sync::OnceLock<ModifierSet> = std::sync::OnceLock::new();

/// Units, hexes and relations
#[derive(Debug, Clone, Default)]
pub struct World {
    units: AHashMap<UnitId, Unit>,
    hexes: AHashMap<HexCoord, Hex>,
    pub diplomacy: Diplomacy,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unit(&mut self, unit: Unit) -> UnitId {
        let id = unit.id;
        self.units.insert(id, unit);
        id
    }

    /// Remove a unit from the map entirely (destroyed, disbanded)
    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// True if the unit exists and still has hp
    pub fn is_alive(&self, id: UnitId) -> bool {
        self.units.get(&id).is_some_and(Unit::is_alive)
    }

    /// Living units standing on a hex, sorted by id for stable iteration
    pub fn units_at(&self, coord: HexCoord) -> Vec<UnitId> {
        let mut ids: Vec<UnitId> = self
            .units
            .values()
            .filter(|u| u.position == coord && u.is_alive())
            .map(|u| u.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn add_hex(&mut self, hex: Hex) {
        self.hexes.insert(hex.coord, hex);
    }

    pub fn hex(&self, coord: HexCoord) -> Option<&Hex> {
        self.hexes.get(&coord)
    }

    pub fn hex_mut(&mut self, coord: HexCoord) -> Option<&mut Hex> {
        self.hexes.get_mut(&coord)
    }

    /// Land fort level at a hex (0 for unknown hexes)
    pub fn fort_level(&self, coord: HexCoord) -> u32 {
        self.hexes
            .get(&coord)
            .map_or(0, |h| h.building_level(BuildingKind::LandFort))
    }

    /// Modifier context of a hex; unknown hexes have no modifiers
    pub fn hex_modifiers(&self, coord: HexCoord) -> &ModifierSet {
        self.hexes
            .get(&coord)
            .map(|h| &h.modifiers)
            .unwrap_or_else(|| NO_MODIFIERS.get_or_init(ModifierSet::new))
    }

    /// Order a unit to fall back to a neighbouring friendly hex
    ///
    /// Preference: own or allied hex, then any hex not held by an enemy.
    /// With nowhere to go the unit still gets a retreat order, in place.
    pub fn order_retreat(&mut self, id: UnitId) -> Option<HexCoord> {
        let (owner, position) = {
            let unit = self.units.get(&id)?;
            (unit.owner, unit.position)
        };

        let destination = self
            .pick_retreat_hex(owner, position, |d, o, h| d.is_allied(o, h))
            .or_else(|| self.pick_retreat_hex(owner, position, |d, o, h| !d.is_at_war(o, h)));

        if let Some(unit) = self.units.get_mut(&id) {
            unit.retreat(destination);
        }
        destination
    }

    fn pick_retreat_hex(
        &self,
        owner: NationId,
        from: HexCoord,
        accept: impl Fn(&Diplomacy, NationId, NationId) -> bool,
    ) -> Option<HexCoord> {
        from.neighbors().into_iter().find(|coord| {
            self.hexes
                .get(coord)
                .and_then(Hex::owner)
                .is_some_and(|holder| accept(&self.diplomacy, owner, holder))
        })
    }

    pub fn cancel_order(&mut self, id: UnitId) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.cancel_current_order();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_at_skips_dead_and_elsewhere() {
        let mut world = World::new();
        let here = HexCoord::new(0, 0);
        let a = world.add_unit(Unit::new(NationId(1), here, UnitStats::default()));
        let b = world.add_unit(Unit::new(NationId(1), here, UnitStats::default()));
        world.add_unit(Unit::new(NationId(1), HexCoord::new(1, 0), UnitStats::default()));
        world.unit_mut(b).unwrap().set_hp(0.0);

        assert_eq!(world.units_at(here), vec![a]);
    }

    #[test]
    fn test_retreat_prefers_own_territory() {
        let mut world = World::new();
        let home = NationId(1);
        let enemy = NationId(2);
        world.diplomacy.declare_war(home, enemy);

        let origin = HexCoord::new(0, 0);
        world.add_hex(Hex::new(HexCoord::new(1, 0), Some(enemy)));
        world.add_hex(Hex::new(HexCoord::new(-1, 0), Some(home)));

        let id = world.add_unit(Unit::new(home, origin, UnitStats::default()));
        let to = world.order_retreat(id);

        assert_eq!(to, Some(HexCoord::new(-1, 0)));
        assert_eq!(
            world.unit(id).unwrap().order,
            UnitOrder::Retreat { to: Some(HexCoord::new(-1, 0)) }
        );
    }

    #[test]
    fn test_retreat_with_nowhere_to_go() {
        let mut world = World::new();
        let id = world.add_unit(Unit::new(NationId(1), HexCoord::new(0, 0), UnitStats::default()));
        assert_eq!(world.order_retreat(id), None);
        assert_eq!(world.unit(id).unwrap().order, UnitOrder::Retreat { to: None });
    }

    #[test]
    fn test_fort_level_of_unknown_hex() {
        let world = World::new();
        assert_eq!(world.fort_level(HexCoord::new(5, 5)), 0);
    }
}
