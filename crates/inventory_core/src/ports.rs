//! crates/inventory_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific persistence implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Material, MaterialPatch, NewMaterial, NewUser, User, UserCredentials, UserPatch,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Filters
//=========================================================================================

/// Listing filter for materials. All fields are optional and combine with AND.
#[derive(Debug, Clone, Default)]
pub struct MaterialFilter {
    /// Exact category match.
    pub category: Option<String>,
    /// Case-insensitive substring match on the provider name.
    pub provider: Option<String>,
    /// Case-insensitive substring match across name, category, and provider.
    pub search: Option<String>,
}

//=========================================================================================
// Store Ports (Traits)
//=========================================================================================

/// Persistent collection of material records. The single source of truth for
/// inventory; concurrent writers are last-write-wins.
#[async_trait]
pub trait MaterialStore: Send + Sync {
    /// Lists active materials matching the filter, newest first.
    async fn list(&self, filter: &MaterialFilter) -> PortResult<Vec<Material>>;

    /// Fetches one material by id, regardless of its active flag.
    async fn get(&self, id: Uuid) -> PortResult<Material>;

    async fn insert(&self, material: NewMaterial) -> PortResult<Material>;

    async fn insert_many(&self, materials: Vec<NewMaterial>) -> PortResult<Vec<Material>>;

    async fn update(&self, id: Uuid, patch: &MaterialPatch) -> PortResult<Material>;

    /// Marks a material inactive, keeping the record.
    async fn soft_delete(&self, id: Uuid) -> PortResult<Material>;

    /// Physically removes a material record.
    async fn hard_delete(&self, id: Uuid) -> PortResult<()>;

    async fn distinct_categories(&self) -> PortResult<Vec<String>>;

    async fn distinct_providers(&self) -> PortResult<Vec<String>>;

    /// Snapshot of the full active set, used by the statistics and
    /// reconciliation engines.
    async fn all_active(&self) -> PortResult<Vec<Material>>;
}

/// Persistent collection of user records keyed uniquely by document number.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Lists all users, newest first.
    async fn list(&self) -> PortResult<Vec<User>>;

    async fn get(&self, id: Uuid) -> PortResult<User>;

    /// Exact lookup by document number, returning the stored credential hash
    /// alongside the user for authentication.
    async fn find_by_document(&self, document_number: &str) -> PortResult<UserCredentials>;

    /// Inserts a new user. Fails with `Conflict` when the document number is
    /// already registered.
    async fn insert(&self, user: NewUser, password_hash: String) -> PortResult<User>;

    async fn update(&self, id: Uuid, patch: &UserPatch) -> PortResult<User>;

    async fn delete(&self, id: Uuid) -> PortResult<()>;
}

/// Opaque login session tokens with server-side expiry.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, token: &str, user_id: Uuid, expires_at: DateTime<Utc>)
        -> PortResult<()>;

    /// Resolves a token to its user id. Expired or unknown tokens are
    /// reported as `NotFound`.
    async fn validate(&self, token: &str) -> PortResult<Uuid>;

    async fn delete(&self, token: &str) -> PortResult<()>;
}
