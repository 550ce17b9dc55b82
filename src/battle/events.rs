//! Battle lifecycle events
//!
//! Battles never call out to observers. Everything an outside layer might
//! want to replicate is pushed into an outbox as a `BattleEvent` and drained
//! by the caller after the battle has reached a consistent state.

use serde::{Deserialize, Serialize};

use crate::core::types::{BattleId, Hour, HexCoord, NationId, UnitId};

/// Attacking or defending coalition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }

    pub fn is_attacker(self) -> bool {
        matches!(self, Side::Attacker)
    }
}

/// How a battle finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleOutcome {
    AttackerVictory,
    DefenderVictory,
    /// Both fronts collapsed in the same hour
    Stalemate,
}

/// Why a unit left a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalReason {
    Died,
    Disengaged,
    /// Pulled out from outside the battle (teleport, disband, reassignment)
    Withdrawn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BattleEvent {
    BattleStarted {
        battle: BattleId,
        location: HexCoord,
        attackers: Vec<NationId>,
        defenders: Vec<NationId>,
    },
    UnitAdded {
        battle: BattleId,
        unit: UnitId,
        is_attacker: bool,
    },
    UnitPromoted {
        battle: BattleId,
        unit: UnitId,
        side: Side,
    },
    /// Pulled back to reserve because the front lost frontage
    UnitRelieved {
        battle: BattleId,
        unit: UnitId,
        side: Side,
    },
    UnitRemoved {
        battle: BattleId,
        unit: UnitId,
        reason: RemovalReason,
    },
    BattleEnded {
        battle: BattleId,
        outcome: BattleOutcome,
        hours: Hour,
    },
}

impl BattleEvent {
    pub fn battle(&self) -> BattleId {
        match self {
            BattleEvent::BattleStarted { battle, .. }
            | BattleEvent::UnitAdded { battle, .. }
            | BattleEvent::UnitPromoted { battle, .. }
            | BattleEvent::UnitRelieved { battle, .. }
            | BattleEvent::UnitRemoved { battle, .. }
            | BattleEvent::BattleEnded { battle, .. } => *battle,
        }
    }
}
