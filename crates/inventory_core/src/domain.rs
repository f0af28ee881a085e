//! crates/inventory_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or HTTP framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Default unit of measure assigned to materials that do not specify one.
pub const DEFAULT_UNIT: &str = "unit";

/// A tracked inventory item (construction supply).
///
/// `name` is not globally unique; the reconciliation engine treats the
/// case-insensitive name as the natural merge key within one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub category: String,
    pub stock: i32,
    pub provider: String,
    pub unit: String,
    pub description: Option<String>,
    /// Soft-delete flag. Inactive materials stay in the store but are
    /// excluded from listings and statistics.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation payload for a material, without identity or timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewMaterial {
    pub name: String,
    pub price: f64,
    pub category: String,
    #[serde(default)]
    pub stock: i32,
    pub provider: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

impl NewMaterial {
    /// Checks the required-field constraints before the payload reaches a store.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::MissingField("category"));
        }
        if self.provider.trim().is_empty() {
            return Err(ValidationError::MissingField("provider"));
        }
        if self.price < 0.0 {
            return Err(ValidationError::NegativeValue("price"));
        }
        if self.stock < 0 {
            return Err(ValidationError::NegativeValue("stock"));
        }
        Ok(())
    }
}

/// Partial update for a material. `None` fields preserve the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl MaterialPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.category.is_none()
            && self.stock.is_none()
            && self.provider.is_none()
            && self.unit.is_none()
            && self.description.is_none()
            && self.active.is_none()
    }

    /// Applies the patch to a material in place, refreshing `updated_at`.
    pub fn apply_to(&self, material: &mut Material, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            material.name = name.clone();
        }
        if let Some(price) = self.price {
            material.price = price;
        }
        if let Some(category) = &self.category {
            material.category = category.clone();
        }
        if let Some(stock) = self.stock {
            material.stock = stock;
        }
        if let Some(provider) = &self.provider {
            material.provider = provider.clone();
        }
        if let Some(unit) = &self.unit {
            material.unit = unit.clone();
        }
        if let Some(description) = &self.description {
            material.description = Some(description.clone());
        }
        if let Some(active) = self.active {
            material.active = active;
        }
        material.updated_at = now;
    }
}

/// The kind of identity document a user registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    NationalId,
    ForeignId,
    MinorId,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::NationalId => "national-id",
            DocumentType::ForeignId => "foreign-id",
            DocumentType::MinorId => "minor-id",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "national-id" => Ok(DocumentType::NationalId),
            "foreign-id" => Ok(DocumentType::ForeignId),
            "minor-id" => Ok(DocumentType::MinorId),
            _ => Err(ValidationError::InvalidValue("document type")),
        }
    }
}

/// Role assigned to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    PurchasingLead,
    Analyst,
    Developer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::PurchasingLead => "purchasing-lead",
            UserRole::Analyst => "analyst",
            UserRole::Developer => "developer",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchasing-lead" => Ok(UserRole::PurchasingLead),
            "analyst" => Ok(UserRole::Analyst),
            "developer" => Ok(UserRole::Developer),
            _ => Err(ValidationError::InvalidValue("user role")),
        }
    }
}

/// A registered user. Deliberately carries no password material so it can
/// never leak a credential through a response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub document_type: DocumentType,
    pub document_number: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration payload for a user account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub document_type: DocumentType,
    pub document_number: String,
    pub role: UserRole,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.document_number.trim().is_empty() {
            return Err(ValidationError::MissingField("documentNumber"));
        }
        Ok(())
    }
}

/// Partial update for a user. A password change arrives pre-hashed;
/// handlers hash before the patch reaches the store.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub document_type: Option<DocumentType>,
    pub document_number: Option<String>,
    pub role: Option<UserRole>,
    pub password_hash: Option<String>,
}

/// Only used internally for login - pairs a user with their stored hash.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// A constraint violation on an incoming payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("{0} must not be negative")]
    NegativeValue(&'static str),
    #[error("invalid {0}")]
    InvalidValue(&'static str),
}
