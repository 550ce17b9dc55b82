//! Battle engine constants - default values for every tunable in `BattleConfig`
//!
//! Widths are in combat-width units, chances are per roll, damage is absolute
//! hp / organisation per hit before the attacker's hp ratio is applied.

// Combat width
pub const BASE_COMBAT_WIDTH: f64 = 70.0;
pub const FLANK_WIDTH_FACTOR: f64 = 0.5; // each extra flank adds base * 0.5
pub const OVER_WIDTH_CEILING: f64 = 1.33;

// Reserve rotation (per hour)
pub const RESERVE_PROMOTION_CHANCE: f64 = 0.02;
pub const OVERFLOW_PROMOTION_FACTOR: f64 = 0.5;
pub const DISENGAGE_ORG_RATIO: f64 = 0.05;
pub const INITIATIVE_POWER_WEIGHT: f64 = 0.05;

// Attack resolution
pub const ENGAGEMENT_WIDTH_FACTOR: f64 = 2.0;
pub const STAT_DIVISOR: f64 = 10.0; // attack / defence points per roll
pub const COORDINATED_SHARE: f64 = 0.35;
pub const DEFENDED_HIT_CHANCE: f64 = 0.1;
pub const UNDEFENDED_HIT_CHANCE: f64 = 0.4;
pub const HP_DAMAGE_PER_HIT: f64 = 0.06;
pub const ORG_DAMAGE_PER_HIT: f64 = 0.053;
pub const HP_DAMAGE_DIE: u32 = 2;
pub const ORG_DAMAGE_DIE: u32 = 4;
pub const ARMORED_ORG_DAMAGE_DIE: u32 = 6;

// Fortifications
pub const MAX_FORT_LEVEL: u32 = 10;
pub const FORT_PENALTY_PER_LEVEL: f64 = 0.05;
pub const MAX_FORT_DEBUFF: f64 = 0.5;

// Prediction
pub const RESERVE_ORG_WEIGHT: f64 = 0.25;
pub const MEAN_ORG_ROLL: f64 = 2.5; // mean of a d4
pub const MIN_DAMAGE_PER_HOUR: f64 = 0.01;
pub const PREDICTION_HOURS_FACTOR: f64 = 0.75;

// RNG
pub const DEFAULT_SEED: u64 = 0x5EED_BA77;
