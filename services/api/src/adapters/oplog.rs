//! services/api/src/adapters/oplog.rs
//!
//! In-process operation log shared across request handlers. Implements the
//! `EventSink` port so mutating handlers publish events without knowing who
//! consumes them.

use std::sync::Mutex;

use inventory_core::events::{DomainEvent, EventSink};
use inventory_core::oplog::{OperationEntry, OperationLog};

/// Thread-safe wrapper around the core operation log.
pub struct LogSink {
    inner: Mutex<OperationLog>,
}

impl LogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(OperationLog::new(capacity)),
        }
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<OperationEntry> {
        self.lock().recent(limit)
    }

    /// Administrative reset.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, OperationLog> {
        // A poisoned mutex only means a panic happened mid-record; the log
        // itself is still usable for auditing.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventSink for LogSink {
    fn publish(&self, event: DomainEvent) {
        self.lock().record(event);
    }
}
