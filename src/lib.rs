//! Frontline - hourly battle resolution engine
//!
//! Battles between two coalitions contesting a hex, resolved one simulated
//! hour at a time: reserve rotation under a combat-width budget, stochastic
//! attack rolls, disengagement of broken units and an outcome estimate.

pub mod battle;
pub mod core;
pub mod scenario;
pub mod world;

pub use crate::core::config::BattleConfig;
pub use crate::core::error::{BattleError, Result};
