//! crates/inventory_core/src/events.rs
//!
//! Typed domain events published by mutating operations. The operation log is
//! the primary consumer; additional consumers can hang off the same seam
//! without the publishers knowing about them.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::UserRole;

/// The user on whose behalf an operation ran, when known.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub role: UserRole,
}

/// A tagged domain mutation, carried from the point of change to whoever is
/// listening.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    MaterialAdded {
        material_id: Uuid,
        name: String,
        actor: Option<Actor>,
    },
    MaterialUpdated {
        material_id: Uuid,
        name: String,
        actor: Option<Actor>,
    },
    MaterialDeleted {
        material_id: Uuid,
        name: String,
        actor: Option<Actor>,
    },
    UserRegistered {
        user_id: Uuid,
        name: String,
    },
    UserAuthenticated {
        user_id: Uuid,
        name: String,
    },
    FilesProcessed {
        files: usize,
        inserted: usize,
        updated: usize,
        failed_rows: usize,
        actor: Option<Actor>,
    },
}

/// Wire-stable tag for an event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    MaterialAdded,
    MaterialUpdated,
    MaterialDeleted,
    UserRegistered,
    UserAuthenticated,
    FilesProcessed,
}

impl DomainEvent {
    pub fn kind(&self) -> OperationKind {
        match self {
            DomainEvent::MaterialAdded { .. } => OperationKind::MaterialAdded,
            DomainEvent::MaterialUpdated { .. } => OperationKind::MaterialUpdated,
            DomainEvent::MaterialDeleted { .. } => OperationKind::MaterialDeleted,
            DomainEvent::UserRegistered { .. } => OperationKind::UserRegistered,
            DomainEvent::UserAuthenticated { .. } => OperationKind::UserAuthenticated,
            DomainEvent::FilesProcessed { .. } => OperationKind::FilesProcessed,
        }
    }

    pub fn actor(&self) -> Option<&Actor> {
        match self {
            DomainEvent::MaterialAdded { actor, .. }
            | DomainEvent::MaterialUpdated { actor, .. }
            | DomainEvent::MaterialDeleted { actor, .. }
            | DomainEvent::FilesProcessed { actor, .. } => actor.as_ref(),
            DomainEvent::UserRegistered { .. } | DomainEvent::UserAuthenticated { .. } => None,
        }
    }

    /// Human-readable summary used for audit display.
    pub fn details(&self) -> String {
        match self {
            DomainEvent::MaterialAdded { name, .. } => format!("Material '{name}' added"),
            DomainEvent::MaterialUpdated { name, .. } => format!("Material '{name}' updated"),
            DomainEvent::MaterialDeleted { name, .. } => format!("Material '{name}' deleted"),
            DomainEvent::UserRegistered { name, .. } => format!("User '{name}' registered"),
            DomainEvent::UserAuthenticated { name, .. } => format!("User '{name}' logged in"),
            DomainEvent::FilesProcessed {
                files,
                inserted,
                updated,
                failed_rows,
                actor,
            } => {
                let prefix = match actor {
                    Some(a) => format!("{} ({}) processed", a.name, a.role),
                    None => "Processed".to_string(),
                };
                format!(
                    "{prefix} {files} file(s): {inserted} new, {updated} updated, {failed_rows} failed rows"
                )
            }
        }
    }
}

/// Observer seam for domain events. Publishers fire and forget; sinks must
/// not block.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

/// Sink that drops every event. Useful for callers that do not audit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: DomainEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_event_details_mention_actor_and_counts() {
        let event = DomainEvent::FilesProcessed {
            files: 2,
            inserted: 5,
            updated: 3,
            failed_rows: 1,
            actor: Some(Actor {
                id: Uuid::new_v4(),
                name: "Ana".to_string(),
                role: UserRole::Analyst,
            }),
        };
        assert_eq!(event.kind(), OperationKind::FilesProcessed);
        assert_eq!(
            event.details(),
            "Ana (analyst) processed 2 file(s): 5 new, 3 updated, 1 failed rows"
        );
    }

    #[test]
    fn user_events_carry_no_actor() {
        let event = DomainEvent::UserRegistered {
            user_id: Uuid::new_v4(),
            name: "Ana".to_string(),
        };
        assert!(event.actor().is_none());
        assert_eq!(event.details(), "User 'Ana' registered");
    }
}
