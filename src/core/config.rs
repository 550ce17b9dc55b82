//! Battle engine configuration
//!
//! Every tunable number of the engine lives here, grouped the way it is laid
//! out in a TOML config file (`[width]`, `[reserves]`, `[combat]`, `[fort]`,
//! `[prediction]`). Missing tables and keys fall back to the defaults in
//! `battle::constants`. The config is passed explicitly to the repository;
//! there is no global instance.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::battle::constants::*;
use crate::core::error::{BattleError, Result};

/// Combat-width budget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WidthConfig {
    /// Frontage of a single-direction battle
    pub base: f64,
    /// Fraction of `base` added by each additional attacking direction
    pub flank_factor: f64,
    /// Hard ceiling on frontline width, as a multiple of max width
    pub ceiling: f64,
}

impl Default for WidthConfig {
    fn default() -> Self {
        Self {
            base: BASE_COMBAT_WIDTH,
            flank_factor: FLANK_WIDTH_FACTOR,
            ceiling: OVER_WIDTH_CEILING,
        }
    }
}

/// Reserve rotation and disengagement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReserveConfig {
    /// Hourly chance a reserve unit moves up, before initiative
    pub promotion_chance: f64,
    /// Multiplier on the promotion chance when the move would overflow max width
    pub overflow_factor: f64,
    /// Organisation ratio under which a frontline unit disengages
    pub disengage_org_ratio: f64,
    /// Weight of initiative in the reserve power score
    pub initiative_weight: f64,
}

impl Default for ReserveConfig {
    fn default() -> Self {
        Self {
            promotion_chance: RESERVE_PROMOTION_CHANCE,
            overflow_factor: OVERFLOW_PROMOTION_FACTOR,
            disengage_org_ratio: DISENGAGE_ORG_RATIO,
            initiative_weight: INITIATIVE_POWER_WEIGHT,
        }
    }
}

/// Attack resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Targets per attacker are bounded by `factor * own combat width`
    pub engagement_width_factor: f64,
    /// Attack (and defence) points per discrete roll
    pub stat_divisor: f64,
    /// Share of rolls concentrated on the best-rated target
    pub coordinated_share: f64,
    pub defended_hit_chance: f64,
    pub undefended_hit_chance: f64,
    pub hp_damage_per_hit: f64,
    pub org_damage_per_hit: f64,
    pub hp_damage_die: u32,
    pub org_damage_die: u32,
    /// Organisation die when the attacker's armor beats the target's piercing
    pub armored_org_damage_die: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            engagement_width_factor: ENGAGEMENT_WIDTH_FACTOR,
            stat_divisor: STAT_DIVISOR,
            coordinated_share: COORDINATED_SHARE,
            defended_hit_chance: DEFENDED_HIT_CHANCE,
            undefended_hit_chance: UNDEFENDED_HIT_CHANCE,
            hp_damage_per_hit: HP_DAMAGE_PER_HIT,
            org_damage_per_hit: ORG_DAMAGE_PER_HIT,
            hp_damage_die: HP_DAMAGE_DIE,
            org_damage_die: ORG_DAMAGE_DIE,
            armored_org_damage_die: ARMORED_ORG_DAMAGE_DIE,
        }
    }
}

/// Land fort attack penalty
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FortConfig {
    pub max_level: u32,
    pub penalty_per_level: f64,
    /// Upper bound on the attack reduction after modifiers
    pub max_debuff: f64,
}

impl Default for FortConfig {
    fn default() -> Self {
        Self {
            max_level: MAX_FORT_LEVEL,
            penalty_per_level: FORT_PENALTY_PER_LEVEL,
            max_debuff: MAX_FORT_DEBUFF,
        }
    }
}

/// Outcome estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub reserve_org_weight: f64,
    pub resisted_hit_rate: f64,
    pub unresisted_hit_rate: f64,
    /// Expected organisation roll per hit (before the per-hit factor)
    pub mean_org_roll: f64,
    pub min_damage_per_hour: f64,
    pub hours_factor: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            reserve_org_weight: RESERVE_ORG_WEIGHT,
            resisted_hit_rate: DEFENDED_HIT_CHANCE,
            unresisted_hit_rate: UNDEFENDED_HIT_CHANCE,
            mean_org_roll: MEAN_ORG_ROLL,
            min_damage_per_hour: MIN_DAMAGE_PER_HOUR,
            hours_factor: PREDICTION_HOURS_FACTOR,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Seed for the repository's deterministic RNG
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub width: WidthConfig,
    #[serde(default)]
    pub reserves: ReserveConfig,
    #[serde(default)]
    pub combat: CombatConfig,
    #[serde(default)]
    pub fort: FortConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            width: WidthConfig::default(),
            reserves: ReserveConfig::default(),
            combat: CombatConfig::default(),
            fort: FortConfig::default(),
            prediction: PredictionConfig::default(),
        }
    }
}

impl BattleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same config with a different RNG seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Parse and validate a config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: BattleConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.width.base <= 0.0 {
            return Err(BattleError::InvalidConfig(format!(
                "width.base ({}) must be positive",
                self.width.base
            )));
        }

        if self.width.ceiling < 1.0 {
            return Err(BattleError::InvalidConfig(format!(
                "width.ceiling ({}) must be >= 1.0",
                self.width.ceiling
            )));
        }

        if self.combat.stat_divisor <= 0.0 {
            return Err(BattleError::InvalidConfig(
                "combat.stat_divisor must be positive".into(),
            ));
        }

        let chances = [
            ("reserves.promotion_chance", self.reserves.promotion_chance),
            ("combat.defended_hit_chance", self.combat.defended_hit_chance),
            ("combat.undefended_hit_chance", self.combat.undefended_hit_chance),
            ("fort.max_debuff", self.fort.max_debuff),
        ];
        for (name, value) in chances {
            if !(0.0..=1.0).contains(&value) {
                return Err(BattleError::InvalidConfig(format!(
                    "{name} ({value}) must be within [0, 1]"
                )));
            }
        }

        if self.combat.hp_damage_die == 0
            || self.combat.org_damage_die == 0
            || self.combat.armored_org_damage_die == 0
        {
            return Err(BattleError::InvalidConfig("damage dice need at least one face".into()));
        }

        if self.fort.max_level == 0 {
            return Err(BattleError::InvalidConfig("fort.max_level must be >= 1".into()));
        }

        if self.prediction.min_damage_per_hour <= 0.0 {
            return Err(BattleError::InvalidConfig(
                "prediction.min_damage_per_hour must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Hard frontline ceiling for a given max width
    pub fn width_ceiling(&self, max_width: f64) -> f64 {
        max_width * self.width.ceiling
    }
}
