//! Canonical store: the only durable state in the subsystem.
//!
//! Ownership rules: the store owns all Posting and RunRecord writes; the
//! orchestrator owns Job writes but persists them exclusively through here.
//! Adapters never touch storage.

mod sqlite;

pub use sqlite::Store;

use crate::model::Posting;

/// Result of pushing one raw posting through the dedup gate.
///
/// `Duplicate` is a normal outcome, not an error: a storage-level uniqueness
/// violation and a pre-existing fingerprint are indistinguishable to callers.
#[derive(Debug)]
pub enum InsertOutcome {
    New(Posting),
    Duplicate,
}

impl InsertOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, InsertOutcome::New(_))
    }
}
