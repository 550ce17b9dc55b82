//! Battle aggregate and hourly tick
//!
//! Each tick: casualties -> reserves -> defences -> attacks -> disengage ->
//! prediction -> termination

use ahash::{AHashMap, AHashSet};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::accountant::{compute_powers, max_width, CombatLedger};
use crate::battle::events::{BattleEvent, BattleOutcome, RemovalReason, Side};
use crate::battle::prediction::{predict_outcome, Prediction};
use crate::battle::report::BattleSnapshot;
use crate::battle::reserves::{build_defences, disengage, fit_to_ceiling, select_units, tick_reserves};
use crate::battle::resolution;
use crate::core::config::BattleConfig;
use crate::core::types::{BattleId, Hour, HexCoord, NationId, UnitId};
use crate::world::{Diplomacy, World};

/// Battle lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BattlePhase {
    #[default]
    Active,
    Ended,
}

/// Frontline and reserve of one coalition
#[derive(Debug, Clone, Default)]
struct SideLines {
    frontline: Vec<UnitId>,
    reserve: Vec<UnitId>,
}

impl SideLines {
    fn contains(&self, id: UnitId) -> bool {
        self.frontline.contains(&id) || self.reserve.contains(&id)
    }

    fn remove(&mut self, id: UnitId) -> bool {
        if let Some(pos) = self.frontline.iter().position(|u| *u == id) {
            self.frontline.remove(pos);
            return true;
        }
        if let Some(pos) = self.reserve.iter().position(|u| *u == id) {
            self.reserve.remove(pos);
            return true;
        }
        false
    }

    fn len(&self) -> usize {
        self.frontline.len() + self.reserve.len()
    }
}

/// A contested hex and the two coalitions fighting over it
#[derive(Debug, Clone)]
pub struct Battle {
    id: BattleId,
    location: HexCoord,
    phase: BattlePhase,
    attackers: SideLines,
    defenders: SideLines,
    /// Owner of every member at the time it joined
    owners: AHashMap<UnitId, NationId>,
    ledger: CombatLedger,
    last_prediction: Option<Prediction>,
    hours: Hour,
    outcome: Option<BattleOutcome>,
    outbox: Vec<BattleEvent>,
}

impl Battle {
    /// Open a battle and pick both initial frontlines
    pub fn new(
        id: BattleId,
        location: HexCoord,
        defenders: Vec<UnitId>,
        attackers: Vec<UnitId>,
        world: &World,
        config: &BattleConfig,
    ) -> Self {
        let mut battle = Self::unselected(id, location, defenders, attackers, world);

        let powers = compute_powers(&battle, world, config);
        let max_width = max_width(&battle, world, config);
        for side in [Side::Attacker, Side::Defender] {
            let lines = battle.lines_mut(side);
            select_units(
                &mut lines.reserve,
                &mut lines.frontline,
                &powers,
                max_width,
                world,
                config,
            );
        }

        let started = BattleEvent::BattleStarted {
            battle: id,
            location,
            attackers: battle.attacking_nations(),
            defenders: battle.defending_nations(),
        };
        battle.outbox.push(started);
        tracing::info!(
            battle = %id,
            q = location.q,
            r = location.r,
            attackers = battle.attackers.len(),
            defenders = battle.defenders.len(),
            max_width,
            "battle started"
        );

        battle
    }

    /// Everyone in reserve, no frontline picked yet
    pub(crate) fn unselected(
        id: BattleId,
        location: HexCoord,
        defenders: Vec<UnitId>,
        attackers: Vec<UnitId>,
        world: &World,
    ) -> Self {
        let mut battle = Self {
            id,
            location,
            phase: BattlePhase::Active,
            attackers: SideLines::default(),
            defenders: SideLines::default(),
            owners: AHashMap::new(),
            ledger: CombatLedger::new(),
            last_prediction: None,
            hours: 0,
            outcome: None,
            outbox: Vec::new(),
        };

        for (side, ids) in [(Side::Attacker, attackers), (Side::Defender, defenders)] {
            for id in ids {
                let Some(unit) = world.unit(id) else {
                    continue;
                };
                if battle.contains(id) {
                    continue;
                }
                battle.owners.insert(id, unit.owner);
                battle.lines_mut(side).reserve.push(id);
            }
        }

        battle
    }

    pub fn id(&self) -> BattleId {
        self.id
    }

    pub fn location(&self) -> HexCoord {
        self.location
    }

    pub fn phase(&self) -> BattlePhase {
        self.phase
    }

    pub fn is_ended(&self) -> bool {
        self.phase == BattlePhase::Ended
    }

    pub fn outcome(&self) -> Option<BattleOutcome> {
        self.outcome
    }

    /// Hours this battle has been ticked
    pub fn hours(&self) -> Hour {
        self.hours
    }

    pub fn last_prediction(&self) -> Option<Prediction> {
        self.last_prediction
    }

    fn lines(&self, side: Side) -> &SideLines {
        match side {
            Side::Attacker => &self.attackers,
            Side::Defender => &self.defenders,
        }
    }

    fn lines_mut(&mut self, side: Side) -> &mut SideLines {
        match side {
            Side::Attacker => &mut self.attackers,
            Side::Defender => &mut self.defenders,
        }
    }

    pub fn frontline(&self, side: Side) -> &[UnitId] {
        &self.lines(side).frontline
    }

    pub fn reserve(&self, side: Side) -> &[UnitId] {
        &self.lines(side).reserve
    }

    /// Frontline then reserve of one side
    pub fn units(&self, side: Side) -> impl Iterator<Item = UnitId> + '_ {
        let lines = self.lines(side);
        lines.frontline.iter().chain(lines.reserve.iter()).copied()
    }

    /// Every member, attackers first
    pub fn all_units(&self) -> Vec<UnitId> {
        self.units(Side::Attacker).chain(self.units(Side::Defender)).collect()
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.attackers.contains(id) || self.defenders.contains(id)
    }

    /// Which side a member fights on
    pub fn side_of(&self, id: UnitId) -> Option<Side> {
        if self.attackers.contains(id) {
            Some(Side::Attacker)
        } else if self.defenders.contains(id) {
            Some(Side::Defender)
        } else {
            None
        }
    }

    fn nations(&self, side: Side) -> Vec<NationId> {
        let mut nations: Vec<NationId> = self
            .units(side)
            .filter_map(|id| self.owners.get(&id).copied())
            .collect();
        nations.sort();
        nations.dedup();
        nations
    }

    /// Owners of the current attacking members, sorted
    pub fn attacking_nations(&self) -> Vec<NationId> {
        self.nations(Side::Attacker)
    }

    /// Owners of the current defending members, sorted
    pub fn defending_nations(&self) -> Vec<NationId> {
        self.nations(Side::Defender)
    }

    pub fn ledger(&self) -> &CombatLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut CombatLedger {
        &mut self.ledger
    }

    /// Move a reserve unit up to its side's frontline
    pub fn promote(&mut self, id: UnitId, side: Side) -> bool {
        let lines = self.lines_mut(side);
        let Some(pos) = lines.reserve.iter().position(|u| *u == id) else {
            return false;
        };
        lines.reserve.remove(pos);
        lines.frontline.push(id);

        self.outbox.push(BattleEvent::UnitPromoted {
            battle: self.id,
            unit: id,
            side,
        });
        true
    }

    /// Move a frontline unit back to the reserve
    pub fn relieve(&mut self, id: UnitId, side: Side) -> bool {
        let lines = self.lines_mut(side);
        let Some(pos) = lines.frontline.iter().position(|u| *u == id) else {
            return false;
        };
        lines.frontline.remove(pos);
        lines.reserve.push(id);

        self.outbox.push(BattleEvent::UnitRelieved {
            battle: self.id,
            unit: id,
            side,
        });
        true
    }

    /// A nation may attack here only alongside friends and against enemies
    pub fn can_join_as_attacker(&self, nation: NationId, diplomacy: &Diplomacy) -> bool {
        self.can_join(Side::Attacker, nation, diplomacy)
    }

    pub fn can_join_as_defender(&self, nation: NationId, diplomacy: &Diplomacy) -> bool {
        self.can_join(Side::Defender, nation, diplomacy)
    }

    fn can_join(&self, side: Side, nation: NationId, diplomacy: &Diplomacy) -> bool {
        if self.is_ended() {
            return false;
        }
        let friends_ok = self
            .nations(side)
            .into_iter()
            .all(|n| n == nation || diplomacy.is_allied(nation, n));
        let enemies_ok = self
            .nations(side.opposite())
            .into_iter()
            .all(|n| diplomacy.is_at_war(nation, n));
        friends_ok && enemies_ok
    }

    pub fn add_attacker(&mut self, id: UnitId, world: &World) -> bool {
        self.add_unit(id, Side::Attacker, world)
    }

    pub fn add_defender(&mut self, id: UnitId, world: &World) -> bool {
        self.add_unit(id, Side::Defender, world)
    }

    /// Newcomers queue in reserve; unknown or already-present units are ignored
    fn add_unit(&mut self, id: UnitId, side: Side, world: &World) -> bool {
        if self.is_ended() || self.contains(id) {
            return false;
        }
        let Some(unit) = world.unit(id) else {
            return false;
        };

        self.owners.insert(id, unit.owner);
        self.lines_mut(side).reserve.push(id);
        self.outbox.push(BattleEvent::UnitAdded {
            battle: self.id,
            unit: id,
            is_attacker: side.is_attacker(),
        });
        tracing::debug!(battle = %self.id, unit = %id, ?side, "unit joined");
        true
    }

    /// Take a unit out of whichever list holds it; absent units are a no-op
    pub fn remove_unit(&mut self, id: UnitId, reason: RemovalReason) -> bool {
        let removed = self.attackers.remove(id) || self.defenders.remove(id);
        if !removed {
            return false;
        }

        self.owners.remove(&id);
        self.ledger.forget(id);
        self.outbox.push(BattleEvent::UnitRemoved {
            battle: self.id,
            unit: id,
            reason,
        });
        true
    }

    /// Either frontline is empty
    pub fn is_decided(&self) -> bool {
        self.attackers.frontline.is_empty() || self.defenders.frontline.is_empty()
    }

    /// Close the battle; the repository deregisters it
    pub fn end(&mut self) {
        if self.is_ended() {
            return;
        }

        let outcome = match (self.attackers.frontline.is_empty(), self.defenders.frontline.is_empty()) {
            (true, true) => BattleOutcome::Stalemate,
            (true, false) => BattleOutcome::DefenderVictory,
            (false, _) => BattleOutcome::AttackerVictory,
        };
        self.phase = BattlePhase::Ended;
        self.outcome = Some(outcome);
        self.outbox.push(BattleEvent::BattleEnded {
            battle: self.id,
            outcome,
            hours: self.hours,
        });
        tracing::info!(battle = %self.id, ?outcome, hours = self.hours, "battle ended");
    }

    /// One simulated hour; returns everything emitted since the last drain
    pub fn tick(
        &mut self,
        world: &mut World,
        rng: &mut impl Rng,
        config: &BattleConfig,
    ) -> Vec<BattleEvent> {
        if self.is_ended() {
            return self.drain_events();
        }
        self.hours += 1;

        // Casualties from outside the battle
        for id in self.all_units() {
            if !world.is_alive(id) {
                self.remove_unit(id, RemovalReason::Died);
            }
        }

        fit_to_ceiling(self, world, config);
        tick_reserves(self, world, rng, config);

        self.ledger.reset_defences();
        build_defences(self, Side::Attacker, world, config);
        build_defences(self, Side::Defender, world, config);

        self.ledger.reset_attacks();
        for side in [Side::Attacker, Side::Defender] {
            for id in self.frontline(side).to_vec() {
                resolution::tick(self, id, side, world, rng, config);
            }
        }

        disengage(self, world, config);
        fit_to_ceiling(self, world, config);

        self.last_prediction = Some(predict_outcome(self, world, config));
        self.debug_check_membership();

        if self.is_decided() {
            self.end();
        }

        self.drain_events()
    }

    pub fn drain_events(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn pending_events(&self) -> &[BattleEvent] {
        &self.outbox
    }

    pub fn snapshot(&self, world: &World, config: &BattleConfig) -> BattleSnapshot {
        BattleSnapshot::capture(self, world, config)
    }

    fn debug_check_membership(&self) {
        if cfg!(debug_assertions) {
            let mut seen = AHashSet::new();
            for id in self.all_units() {
                debug_assert!(seen.insert(id), "{id} listed twice in {}", self.id);
            }
            debug_assert_eq!(seen.len(), self.owners.len(), "owner table out of sync in {}", self.id);
        }
    }
}
