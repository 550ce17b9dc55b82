use thiserror::Error;

use crate::core::types::{BattleId, HexCoord, UnitId};

#[derive(Error, Debug)]
pub enum BattleError {
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("Battle not found: {0}")]
    BattleNotFound(BattleId),

    #[error("Engagement requires at least one unit")]
    NoUnits,

    #[error("No hostile units to engage at {0:?}")]
    NoHostiles(HexCoord),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BattleError>;
