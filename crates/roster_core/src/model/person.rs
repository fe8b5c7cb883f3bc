//! Person identity record.
//!
//! # Responsibility
//! - Represent one registered person with a stable ID and a unique name.
//!
//! # Invariants
//! - `id` is stable and never reused for another person.
//! - `name` uniqueness is enforced by the registry service and storage.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a registered person.
pub type PersonId = Uuid;

/// One registered person. Duties and career status hang off `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Stable global ID used for duty/status ownership and auditing.
    pub id: PersonId,
    /// Unique display name used for all lookups.
    pub name: String,
}

impl Person {
    /// Creates a person with a generated stable ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates a person with a caller-provided stable ID.
    ///
    /// Used by read paths that rehydrate an already-persisted row.
    pub fn with_id(id: PersonId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
