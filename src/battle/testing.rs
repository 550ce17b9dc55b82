//! Fixtures shared by the engine's unit tests

use crate::core::types::{HexCoord, NationId, UnitId};
use crate::world::{Unit, UnitStats, World};

/// Empty world with nation 1 and nation 2 at war
pub fn two_nation_world() -> (World, NationId, NationId) {
    let mut world = World::new();
    let red = NationId(1);
    let blue = NationId(2);
    world.diplomacy.declare_war(red, blue);
    (world, red, blue)
}

pub fn spawn(world: &mut World, owner: NationId, position: HexCoord, stats: UnitStats) -> UnitId {
    world.add_unit(Unit::new(owner, position, stats))
}
