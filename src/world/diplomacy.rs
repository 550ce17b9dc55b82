//! Relations between nations

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::NationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Relation {
    #[default]
    Neutral,
    Enemy,
    Allied,
}

/// Symmetric relation table; unlisted pairs are neutral
#[derive(Debug, Clone, Default)]
pub struct Diplomacy {
    relations: AHashMap<(NationId, NationId), Relation>,
}

impl Diplomacy {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: NationId, b: NationId) -> (NationId, NationId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn set_relation(&mut self, a: NationId, b: NationId, relation: Relation) {
        if a == b {
            return;
        }
        self.relations.insert(Self::key(a, b), relation);
    }

    /// Relation between two nations. A nation counts as allied with itself.
    pub fn relation(&self, a: NationId, b: NationId) -> Relation {
        if a == b {
            return Relation::Allied;
        }
        self.relations
            .get(&Self::key(a, b))
            .copied()
            .unwrap_or_default()
    }

    pub fn is_at_war(&self, a: NationId, b: NationId) -> bool {
        self.relation(a, b) == Relation::Enemy
    }

    pub fn is_allied(&self, a: NationId, b: NationId) -> bool {
        self.relation(a, b) == Relation::Allied
    }

    pub fn declare_war(&mut self, a: NationId, b: NationId) {
        self.set_relation(a, b, Relation::Enemy);
    }

    pub fn ally(&mut self, a: NationId, b: NationId) {
        self.set_relation(a, b, Relation::Allied);
    }
}
