//! Mutable routing state shared by the ingest workers and the migration
//! orchestrator.
//!
//! The table holds three independent slots: the index served for reads, the
//! primary write index, and an optional secondary write index that enables
//! dual-writing during a migration. Each slot is read and written on its
//! own; there is no transaction across the triple, so a write that straddles
//! a transition may observe a mix of pre- and post-transition values.
//! Operators bridge that window by verifying index convergence between
//! migration steps rather than relying on an atomic flip.

use std::sync::{PoisonError, RwLock};

/// Point-in-time copy of the routing fields.
///
/// Assembled one field at a time, so under concurrent mutation it can mix
/// values from before and after a transition, exactly as the ingest path
/// can.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingSnapshot {
    /// Index currently served for queries.
    pub read_index: String,
    /// Index of record for writes.
    pub primary_index: String,
    /// Additional write target during migration, if any.
    pub secondary_index: Option<String>,
}

/// Process-wide routing table.
///
/// Created once at startup pointing at a single index; mutated only through
/// the migration orchestrator's operations. The primary slot always names an
/// index, with no way to unset it while the table exists.
#[derive(Debug)]
pub struct RoutingTable {
    read: RwLock<String>,
    primary: RwLock<String>,
    secondary: RwLock<Option<String>>,
}

impl RoutingTable {
    /// Create a routing table with reads and writes pointed at a single
    /// index and dual-writing disabled.
    pub fn new(initial_index: impl Into<String>) -> Self {
        let index = initial_index.into();
        Self {
            read: RwLock::new(index.clone()),
            primary: RwLock::new(index),
            secondary: RwLock::new(None),
        }
    }

    /// Index currently served for queries.
    pub fn read_index(&self) -> String {
        read_slot(&self.read)
    }

    /// Index of record for writes.
    pub fn primary_index(&self) -> String {
        read_slot(&self.primary)
    }

    /// Secondary write index, or `None` when dual-writing is disabled.
    pub fn secondary_index(&self) -> Option<String> {
        read_slot(&self.secondary)
    }

    /// Point queries at a different index.
    pub fn set_read_index(&self, index: impl Into<String>) {
        write_slot(&self.read, index.into());
    }

    /// Point primary writes at a different index.
    pub fn set_primary_index(&self, index: impl Into<String>) {
        write_slot(&self.primary, index.into());
    }

    /// Enable dual-writing to `index`, or disable it with `None`.
    pub fn set_secondary_index(&self, index: Option<String>) {
        write_slot(&self.secondary, index);
    }

    /// Whether any routing slot currently names `index`.
    ///
    /// Used for operator visibility before retiring an index; the check is
    /// as racy as any other multi-slot read.
    pub fn references(&self, index: &str) -> bool {
        self.read_index() == index
            || self.primary_index() == index
            || self.secondary_index().as_deref() == Some(index)
    }

    /// Copy the current routing fields for logging or assertions.
    pub fn snapshot(&self) -> RoutingSnapshot {
        RoutingSnapshot {
            read_index: self.read_index(),
            primary_index: self.primary_index(),
            secondary_index: self.secondary_index(),
        }
    }
}

// Slots hold owned data, so a panicked writer cannot leave a torn value
// behind; a poisoned lock is simply taken over.
fn read_slot<T: Clone>(slot: &RwLock<T>) -> T {
    slot.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn write_slot<T>(slot: &RwLock<T>, value: T) {
    *slot.write().unwrap_or_else(PoisonError::into_inner) = value;
}
