//! Battle engine - hourly resolution of land battles over a contested hex
//!
//! Two coalitions, each with a frontline limited by combat width and a
//! reserve queued behind it. The repository owns every running battle and
//! advances all of them once per simulated hour.

pub mod accountant;
pub mod constants;
pub mod events;
pub mod execution;
pub mod prediction;
pub mod report;
pub mod repository;
pub mod reserves;
pub mod resolution;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use crate::core::types::BattleId;
pub use accountant::{
    average_hardness, compute_powers, flanks, frontline_powers, frontline_width, max_width,
    CombatLedger, SideStats,
};
pub use events::{BattleEvent, BattleOutcome, RemovalReason, Side};
pub use execution::{Battle, BattlePhase};
pub use prediction::{predict_outcome, Prediction};
pub use report::{BattleSnapshot, SideReport, UnitRow};
pub use repository::{BattleRepository, Engagement, IdSequence};
pub use reserves::{
    build_defences, crowding_factor, disengage, fit_to_ceiling, select_units, tick_reserves,
};
pub use resolution::{fort_penalty, AttackReport};
