//! crates/inventory_core/src/oplog.rs
//!
//! Bounded, append-only audit trail of domain events. Entries are kept
//! most-recent-first; once the bound is exceeded the oldest entries are
//! evicted. Entries are never edited in place.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

use crate::events::{Actor, DomainEvent, OperationKind};

/// Bound used by the application when none is configured.
pub const DEFAULT_CAPACITY: usize = 50;

/// One recorded operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationEntry {
    /// Monotonically increasing within one log instance.
    pub id: u64,
    pub kind: OperationKind,
    pub details: String,
    pub actor: Option<Actor>,
    pub at: DateTime<Utc>,
}

/// The operation history. Not internally synchronized; callers that share a
/// log across tasks wrap it in a mutex.
#[derive(Debug)]
pub struct OperationLog {
    entries: VecDeque<OperationEntry>,
    capacity: usize,
    next_id: u64,
}

impl OperationLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity: capacity.max(1),
            next_id: 1,
        }
    }

    /// Records an event at the head of the log, stamping it with the current
    /// time and the next id, then evicts past the bound.
    pub fn record(&mut self, event: DomainEvent) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_front(OperationEntry {
            id,
            kind: event.kind(),
            details: event.details(),
            actor: event.actor().cloned(),
            at: Utc::now(),
        });
        self.entries.truncate(self.capacity);
        id
    }

    /// The most recent `limit` entries, newest first. Does not mutate the log.
    pub fn recent(&self, limit: usize) -> Vec<OperationEntry> {
        self.entries.iter().take(limit).cloned().collect()
    }

    /// Administrative reset.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn material_event(n: usize) -> DomainEvent {
        DomainEvent::MaterialAdded {
            material_id: Uuid::new_v4(),
            name: format!("material-{n}"),
            actor: None,
        }
    }

    #[test]
    fn keeps_only_the_most_recent_entries() {
        let mut log = OperationLog::new(50);
        for n in 0..55 {
            log.record(material_event(n));
        }

        assert_eq!(log.len(), 50);
        let entries = log.recent(100);
        assert_eq!(entries.len(), 50);
        // Newest first: the last recorded event heads the log, and the five
        // oldest were evicted.
        assert_eq!(entries[0].details, "Material 'material-54' added");
        assert_eq!(entries[49].details, "Material 'material-5' added");
        for pair in entries.windows(2) {
            assert!(pair[0].id > pair[1].id);
        }
    }

    #[test]
    fn recent_respects_limit_without_mutating() {
        let mut log = OperationLog::new(10);
        for n in 0..4 {
            log.record(material_event(n));
        }

        let top2 = log.recent(2);
        assert_eq!(top2.len(), 2);
        assert_eq!(top2[0].details, "Material 'material-3' added");
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn clear_empties_the_log() {
        let mut log = OperationLog::default();
        log.record(material_event(0));
        assert!(!log.is_empty());
        log.clear();
        assert!(log.is_empty());
        // Ids keep advancing after a reset.
        let id = log.record(material_event(1));
        assert_eq!(id, 2);
    }
}
