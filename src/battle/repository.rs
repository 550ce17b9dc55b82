//! BattleRepository - registry of running battles and the hourly driver

use ahash::{AHashMap, AHashSet};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::battle::events::{BattleEvent, RemovalReason, Side};
use crate::battle::execution::Battle;
use crate::battle::report::BattleSnapshot;
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{BattleId, Hour, HexCoord, NationId, UnitId};
use crate::world::World;

/// Monotonic battle id source, owned by the repository
#[derive(Debug, Clone)]
pub struct IdSequence {
    next: u32,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u32) -> Self {
        Self { next: first }
    }

    pub fn next_id(&mut self) -> BattleId {
        let id = BattleId(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Where an `engage` call put the units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engagement {
    pub battle: BattleId,
    pub side: Side,
    /// False when the units joined a battle already running at the hex
    pub created: bool,
}

/// All running battles, indexed by hex and by participating unit
pub struct BattleRepository {
    config: BattleConfig,
    rng: ChaCha8Rng,
    ids: IdSequence,
    /// Registration order is tick order
    battles: Vec<Battle>,
    by_hex: AHashMap<HexCoord, Vec<BattleId>>,
    by_unit: AHashMap<UnitId, AHashSet<BattleId>>,
    /// Battles that ended and were deregistered, oldest first
    concluded: Vec<Battle>,
    outbox: Vec<BattleEvent>,
    hour: Hour,
}

impl BattleRepository {
    pub fn new(config: BattleConfig) -> Self {
        Self::with_sequence(config, IdSequence::new())
    }

    pub fn with_sequence(config: BattleConfig, ids: IdSequence) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            ids,
            battles: Vec::new(),
            by_hex: AHashMap::new(),
            by_unit: AHashMap::new(),
            concluded: Vec::new(),
            outbox: Vec::new(),
            hour: 0,
        }
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Hours driven so far
    pub fn hour(&self) -> Hour {
        self.hour
    }

    /// Bring `units` into combat at `hex`
    ///
    /// The owner of the first unit is the engaging nation. Its units join the
    /// first battle at the hex that accepts that nation on either side;
    /// otherwise a new battle opens against every enemy unit standing there.
    /// Units already fighting elsewhere are left where they are.
    pub fn engage(&mut self, units: &[UnitId], hex: HexCoord, world: &World) -> Result<Engagement> {
        let first = *units.first().ok_or(BattleError::NoUnits)?;
        let nation = world.unit(first).ok_or(BattleError::UnitNotFound(first))?.owner;

        let mut joining: Vec<UnitId> = Vec::new();
        for id in units {
            let Some(unit) = world.unit(*id) else {
                tracing::warn!(unit = %id, "unknown unit cannot engage");
                continue;
            };
            if self.is_engaged(*id) {
                tracing::warn!(unit = %id, "unit already fighting elsewhere");
                continue;
            }
            let friendly = unit.owner == nation || world.diplomacy.is_allied(nation, unit.owner);
            if friendly && unit.is_alive() && !joining.contains(id) {
                joining.push(*id);
            }
        }
        if joining.is_empty() {
            return Err(BattleError::NoUnits);
        }

        if let Some(engagement) = self.join_existing(&joining, nation, hex, world) {
            return Ok(engagement);
        }

        let enemies = self.hostiles_at(hex, nation, world);
        if enemies.is_empty() {
            return Err(BattleError::NoHostiles(hex));
        }

        let id = self.ids.next_id();
        let battle = Battle::new(id, hex, enemies, joining, world, &self.config);
        self.battles.push(battle);
        self.by_hex.entry(hex).or_default().push(id);
        self.collect_from(id);

        Ok(Engagement {
            battle: id,
            side: Side::Attacker,
            created: true,
        })
    }

    fn join_existing(
        &mut self,
        joining: &[UnitId],
        nation: NationId,
        hex: HexCoord,
        world: &World,
    ) -> Option<Engagement> {
        let candidates = self.by_hex.get(&hex)?.clone();

        for id in candidates {
            let Some(battle) = self.battles.iter_mut().find(|b| b.id() == id) else {
                continue;
            };
            let side = if battle.can_join_as_attacker(nation, &world.diplomacy) {
                Side::Attacker
            } else if battle.can_join_as_defender(nation, &world.diplomacy) {
                Side::Defender
            } else {
                continue;
            };

            for unit in joining {
                match side {
                    Side::Attacker => battle.add_attacker(*unit, world),
                    Side::Defender => battle.add_defender(*unit, world),
                };
            }
            self.collect_from(id);

            return Some(Engagement {
                battle: id,
                side,
                created: false,
            });
        }

        None
    }

    /// Free enemy units at a hex, restricted to one mutually friendly coalition
    fn hostiles_at(&self, hex: HexCoord, nation: NationId, world: &World) -> Vec<UnitId> {
        let diplomacy = &world.diplomacy;
        let mut coalition: Vec<NationId> = Vec::new();
        let mut enemies = Vec::new();

        for id in world.units_at(hex) {
            if self.is_engaged(id) {
                continue;
            }
            let Some(owner) = world.unit(id).map(|u| u.owner) else {
                continue;
            };
            if !diplomacy.is_at_war(nation, owner) {
                continue;
            }
            if !coalition.iter().all(|n| *n == owner || diplomacy.is_allied(owner, *n)) {
                continue;
            }
            if !coalition.contains(&owner) {
                coalition.push(owner);
            }
            enemies.push(id);
        }

        enemies
    }

    /// Tick every battle once, in registration order
    ///
    /// Returns the events of this hour, preceded by anything still pending
    /// from joins and removals since the last drain. Battles that ended are
    /// deregistered before this returns.
    pub fn hour_elapsed(&mut self, world: &mut World) -> Vec<BattleEvent> {
        self.hour += 1;
        let mut emitted = std::mem::take(&mut self.outbox);

        let mut ticked = Vec::new();
        for battle in self.battles.iter_mut() {
            ticked.extend(battle.tick(world, &mut self.rng, &self.config));
        }
        self.index_events(&ticked);
        self.deregister_ended();
        emitted.extend(ticked);

        tracing::debug!(hour = self.hour, battles = self.battles.len(), events = emitted.len(), "hour elapsed");
        emitted
    }

    /// Pull a unit out of every battle it is in (death or teleport outside
    /// combat). Battles left without a side end immediately.
    pub fn remove_unit_from_all_battles(&mut self, unit: UnitId) -> bool {
        let Some(ids) = self.by_unit.remove(&unit) else {
            return false;
        };
        let mut ids: Vec<BattleId> = ids.into_iter().collect();
        ids.sort();

        for id in ids {
            let Some(battle) = self.battles.iter_mut().find(|b| b.id() == id) else {
                continue;
            };
            battle.remove_unit(unit, RemovalReason::Withdrawn);
            if battle.units(Side::Attacker).next().is_none() || battle.units(Side::Defender).next().is_none() {
                battle.end();
            }
            self.collect_from(id);
        }

        self.deregister_ended();
        true
    }

    /// Drain a battle's outbox into ours, keeping the unit index in step
    fn collect_from(&mut self, id: BattleId) {
        let Some(battle) = self.battles.iter_mut().find(|b| b.id() == id) else {
            return;
        };
        let events = battle.drain_events();
        self.index_events(&events);
        self.outbox.extend(events);
    }

    fn index_events(&mut self, events: &[BattleEvent]) {
        for event in events {
            match event {
                BattleEvent::BattleStarted { battle, .. } => {
                    let members = self.get(*battle).map(Battle::all_units).unwrap_or_default();
                    for unit in members {
                        self.index_unit(unit, *battle);
                    }
                }
                BattleEvent::UnitAdded { battle, unit, .. } => self.index_unit(*unit, *battle),
                BattleEvent::UnitRemoved { battle, unit, .. } => self.unindex_unit(*unit, *battle),
                BattleEvent::UnitPromoted { .. }
                | BattleEvent::UnitRelieved { .. }
                | BattleEvent::BattleEnded { .. } => {}
            }
        }
    }

    fn index_unit(&mut self, unit: UnitId, battle: BattleId) {
        let battles = self.by_unit.entry(unit).or_default();
        battles.insert(battle);
        debug_assert!(battles.len() == 1, "{unit} registered in {} battles", battles.len());
    }

    fn unindex_unit(&mut self, unit: UnitId, battle: BattleId) {
        if let Some(battles) = self.by_unit.get_mut(&unit) {
            battles.remove(&battle);
            if battles.is_empty() {
                self.by_unit.remove(&unit);
            }
        }
    }

    fn deregister_ended(&mut self) {
        let (ended, running): (Vec<Battle>, Vec<Battle>) =
            std::mem::take(&mut self.battles).into_iter().partition(Battle::is_ended);
        self.battles = running;

        for battle in ended {
            let id = battle.id();
            for unit in battle.all_units() {
                self.unindex_unit(unit, id);
            }
            if let Some(ids) = self.by_hex.get_mut(&battle.location()) {
                ids.retain(|b| *b != id);
                if ids.is_empty() {
                    self.by_hex.remove(&battle.location());
                }
            }
            tracing::debug!(battle = %id, "battle deregistered");
            self.concluded.push(battle);
        }
    }

    pub fn is_engaged(&self, unit: UnitId) -> bool {
        self.by_unit.contains_key(&unit)
    }

    /// Report of a running battle
    pub fn snapshot(&self, id: BattleId, world: &World) -> Result<BattleSnapshot> {
        self.get(id)
            .map(|b| b.snapshot(world, &self.config))
            .ok_or(BattleError::BattleNotFound(id))
    }

    pub fn get(&self, id: BattleId) -> Option<&Battle> {
        self.battles.iter().find(|b| b.id() == id)
    }

    /// Running battles at a hex, in registration order
    pub fn battles_at(&self, hex: HexCoord) -> Vec<&Battle> {
        self.by_hex
            .get(&hex)
            .map(|ids| ids.iter().filter_map(|id| self.get(*id)).collect())
            .unwrap_or_default()
    }

    /// The battle a unit is fighting in
    pub fn battle_of(&self, unit: UnitId) -> Option<&Battle> {
        let ids = self.by_unit.get(&unit)?;
        ids.iter().min().and_then(|id| self.get(*id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Battle> {
        self.battles.iter()
    }

    pub fn len(&self) -> usize {
        self.battles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.battles.is_empty()
    }

    /// Events from joins and removals not yet returned by `hour_elapsed`
    pub fn drain_events(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn concluded(&self) -> &[Battle] {
        &self.concluded
    }

    /// Hand finished battles to the caller and forget them
    pub fn drain_concluded(&mut self) -> Vec<Battle> {
        std::mem::take(&mut self.concluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::testing::{spawn, two_nation_world};
    use crate::world::UnitStats;

    #[test]
    fn test_id_sequence_is_monotonic() {
        let mut ids = IdSequence::starting_at(10);
        assert_eq!(ids.next_id(), BattleId(10));
        assert_eq!(ids.next_id(), BattleId(11));
    }

    #[test]
    fn test_engage_creates_battle_against_hostiles() {
        let (mut world, red, blue) = two_nation_world();
        let hex = HexCoord::new(0, 0);
        let att = spawn(&mut world, red, HexCoord::new(1, 0), UnitStats::default());
        let def = spawn(&mut world, blue, hex, UnitStats::default());
        let mut repo = BattleRepository::new(BattleConfig::default());

        let engagement = repo.engage(&[att], hex, &world).unwrap();

        assert!(engagement.created);
        assert_eq!(engagement.side, Side::Attacker);
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.battle_of(att).map(Battle::id), Some(engagement.battle));
        assert_eq!(repo.battle_of(def).map(Battle::id), Some(engagement.battle));
        assert_eq!(repo.battles_at(hex).len(), 1);
    }

    #[test]
    fn test_engage_errors() {
        let (mut world, red, _) = two_nation_world();
        let hex = HexCoord::new(0, 0);
        let att = spawn(&mut world, red, HexCoord::new(1, 0), UnitStats::default());
        let mut repo = BattleRepository::new(BattleConfig::default());

        assert!(matches!(repo.engage(&[], hex, &world), Err(BattleError::NoUnits)));
        assert!(matches!(
            repo.engage(&[UnitId::new()], hex, &world),
            Err(BattleError::UnitNotFound(_))
        ));
        assert!(matches!(repo.engage(&[att], hex, &world), Err(BattleError::NoHostiles(_))));
        assert!(repo.is_empty());
    }

    #[test]
    fn test_second_wave_joins_existing_battle() {
        let (mut world, red, blue) = two_nation_world();
        let hex = HexCoord::new(0, 0);
        let first = spawn(&mut world, red, HexCoord::new(1, 0), UnitStats::default());
        let second = spawn(&mut world, red, HexCoord::new(0, 1), UnitStats::default());
        spawn(&mut world, blue, hex, UnitStats::default());
        let mut repo = BattleRepository::new(BattleConfig::default());

        let a = repo.engage(&[first], hex, &world).unwrap();
        let b = repo.engage(&[second], hex, &world).unwrap();

        assert_eq!(a.battle, b.battle);
        assert!(!b.created);
        assert_eq!(b.side, Side::Attacker);
        assert_eq!(repo.len(), 1);
        let battle = repo.get(a.battle).unwrap();
        assert_eq!(battle.reserve(Side::Attacker), &[second]);
    }

    #[test]
    fn test_engaged_units_are_not_pulled_twice() {
        let (mut world, red, blue) = two_nation_world();
        let hex = HexCoord::new(0, 0);
        let att = spawn(&mut world, red, HexCoord::new(1, 0), UnitStats::default());
        spawn(&mut world, blue, hex, UnitStats::default());
        let mut repo = BattleRepository::new(BattleConfig::default());

        repo.engage(&[att], hex, &world).unwrap();
        assert!(matches!(repo.engage(&[att], hex, &world), Err(BattleError::NoUnits)));
    }

    #[test]
    fn test_remove_last_defender_ends_and_deregisters() {
        let (mut world, red, blue) = two_nation_world();
        let hex = HexCoord::new(0, 0);
        let att = spawn(&mut world, red, HexCoord::new(1, 0), UnitStats::default());
        let def = spawn(&mut world, blue, hex, UnitStats::default());
        let mut repo = BattleRepository::new(BattleConfig::default());
        let engagement = repo.engage(&[att], hex, &world).unwrap();
        repo.drain_events();

        assert!(repo.remove_unit_from_all_battles(def));
        assert!(!repo.remove_unit_from_all_battles(def));

        assert!(repo.is_empty());
        assert!(!repo.is_engaged(att));
        assert!(repo.battles_at(hex).is_empty());
        assert_eq!(repo.concluded()[0].id(), engagement.battle);
        let events = repo.drain_events();
        assert!(matches!(events.last(), Some(BattleEvent::BattleEnded { .. })));
    }

    #[test]
    fn test_hour_elapsed_drives_battles() {
        let (mut world, red, blue) = two_nation_world();
        let hex = HexCoord::new(0, 0);
        let att = spawn(&mut world, red, HexCoord::new(1, 0), UnitStats::default());
        spawn(&mut world, blue, hex, UnitStats::default());
        let mut repo = BattleRepository::new(BattleConfig::default());
        let engagement = repo.engage(&[att], hex, &world).unwrap();

        let events = repo.hour_elapsed(&mut world);

        assert_eq!(repo.hour(), 1);
        assert!(matches!(events.first(), Some(BattleEvent::BattleStarted { .. })));
        assert_eq!(repo.get(engagement.battle).map(Battle::hours), Some(1));
        assert_eq!(repo.snapshot(engagement.battle, &world).unwrap().hours, 1);
        assert!(matches!(
            repo.snapshot(BattleId(99), &world),
            Err(BattleError::BattleNotFound(BattleId(99)))
        ));
    }
}
