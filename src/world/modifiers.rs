//! Effective-value queries against a modifier context
//!
//! The engine never inspects modifiers directly; it asks a unit's or a hex's
//! context for the effective value of a base number under a list of
//! property tags.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Property a modifier applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyTag {
    Attack,
    Defence,
    Breakthrough,
    FortPenalty,
}

/// Flat bonus and relative multiplier for one property
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    #[serde(default)]
    pub add: f64,
    /// Relative change, 0.1 = +10%
    #[serde(default)]
    pub mult: f64,
}

impl Modifier {
    pub fn additive(add: f64) -> Self {
        Self { add, mult: 0.0 }
    }

    pub fn multiplicative(mult: f64) -> Self {
        Self { add: 0.0, mult }
    }
}

/// Anything the engine can ask for an effective value
pub trait ModifierContext {
    fn effective_value(&self, base: f64, tags: &[PropertyTag]) -> f64;
}

/// Simple modifier store: `(base + sum(add)) * product(1 + mult)`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModifierSet {
    entries: AHashMap<PropertyTag, Modifier>,
}

impl ModifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack a modifier onto a property (adds to anything already there)
    pub fn push(&mut self, tag: PropertyTag, modifier: Modifier) {
        let entry = self.entries.entry(tag).or_default();
        entry.add += modifier.add;
        entry.mult += modifier.mult;
    }

    pub fn get(&self, tag: PropertyTag) -> Option<&Modifier> {
        self.entries.get(&tag)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ModifierContext for ModifierSet {
    fn effective_value(&self, base: f64, tags: &[PropertyTag]) -> f64 {
        let mut add = 0.0;
        let mut mult = 1.0;
        for tag in tags {
            if let Some(m) = self.entries.get(tag) {
                add += m.add;
                mult *= 1.0 + m.mult;
            }
        }
        ((base + add) * mult).max(0.0)
    }
}
