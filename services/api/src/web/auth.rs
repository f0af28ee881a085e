//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: login, register, and account recovery.
//!
//! Passwords are stored as argon2 hashes and login issues an opaque session
//! token with server-side expiry. The recovery endpoint therefore cannot
//! return a password; it only confirms the account name.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{Duration, Utc};
use inventory_core::domain::{NewUser, User};
use inventory_core::events::{DomainEvent, EventSink};
use inventory_core::ports::{PortError, UserStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::{error as reply, port_error, HandlerError};
use crate::web::state::AppState;

/// How long an issued session token stays valid.
const SESSION_TTL_DAYS: i64 = 30;

//=========================================================================================
// Password Hashing
//=========================================================================================

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("stored password hash is unparseable: {e}");
            false
        }
    }
}

//=========================================================================================
// Registration Core (shared by /users and /auth/register)
//=========================================================================================

/// Registration payload. Fields are optional so missing ones surface as a
/// 400 with a message instead of a deserialization failure.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("{0}")]
    Invalid(String),
    #[error("A user with document number {0} already exists")]
    Duplicate(String),
    #[error(transparent)]
    Store(PortError),
}

impl RegisterError {
    pub fn into_response(self) -> HandlerError {
        match self {
            RegisterError::Invalid(message) => reply(StatusCode::BAD_REQUEST, message),
            RegisterError::Duplicate(document) => reply(
                StatusCode::BAD_REQUEST,
                format!("A user with document number {document} already exists"),
            ),
            RegisterError::Store(e) => port_error(e),
        }
    }
}

fn require(field: Option<String>, name: &str) -> Result<String, RegisterError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(RegisterError::Invalid(format!("{name} is required"))),
    }
}

/// Validates a registration payload and creates the user with a hashed
/// password. Duplicate document numbers are rejected and leave the original
/// registration untouched.
pub async fn register_user(
    users: &dyn UserStore,
    req: RegisterRequest,
) -> Result<User, RegisterError> {
    let name = require(req.name, "name")?;
    let document_type = require(req.document_type, "documentType")?
        .parse()
        .map_err(|_| RegisterError::Invalid("invalid documentType".to_string()))?;
    let document_number = require(req.document_number, "documentNumber")?;
    let role = require(req.role, "role")?
        .parse()
        .map_err(|_| RegisterError::Invalid("invalid role".to_string()))?;
    let password = require(req.password, "password")?;

    match users.find_by_document(&document_number).await {
        Ok(_) => return Err(RegisterError::Duplicate(document_number)),
        Err(PortError::NotFound(_)) => {}
        Err(e) => return Err(RegisterError::Store(e)),
    }

    let password_hash = hash_password(&password).map_err(|e| {
        error!("failed to hash password: {e}");
        RegisterError::Store(PortError::Unexpected("failed to hash password".to_string()))
    })?;

    let new_user = NewUser {
        name,
        document_type,
        document_number: document_number.clone(),
        role,
    };
    match users.insert(new_user, password_hash).await {
        Ok(user) => Ok(user),
        Err(PortError::Conflict(_)) => Err(RegisterError::Duplicate(document_number)),
        Err(e) => Err(RegisterError::Store(e)),
    }
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub document_number: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    /// Opaque session token; send as `Authorization: Bearer <token>`.
    pub token: String,
    #[schema(value_type = Object)]
    pub user: User,
}

#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub user: User,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecoverRequest {
    pub document_number: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct RecoverResponse {
    pub message: String,
    pub name: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/login - Authenticate by document number and password.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, HandlerError> {
    let (document_number, password) = match (req.document_number, req.password) {
        (Some(d), Some(p)) if !d.is_empty() && !p.is_empty() => (d, p),
        _ => {
            return Err(reply(
                StatusCode::BAD_REQUEST,
                "Document number and password are required",
            ))
        }
    };

    let credentials = match state.users.find_by_document(&document_number).await {
        Ok(credentials) => credentials,
        Err(PortError::NotFound(_)) => {
            return Err(reply(
                StatusCode::UNAUTHORIZED,
                "Invalid document number or password",
            ))
        }
        Err(e) => return Err(port_error(e)),
    };

    if !verify_password(&password, &credentials.password_hash) {
        return Err(reply(
            StatusCode::UNAUTHORIZED,
            "Invalid document number or password",
        ));
    }

    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);
    state
        .sessions
        .create(&token, credentials.user.id, expires_at)
        .await
        .map_err(port_error)?;

    state.oplog.publish(DomainEvent::UserAuthenticated {
        user_id: credentials.user.id,
        name: credentials.user.name.clone(),
    });

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: credentials.user,
    }))
}

/// POST /auth/register - Create a new user account.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Missing fields or duplicate document number"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = register_user(state.users.as_ref(), req)
        .await
        .map_err(RegisterError::into_response)?;

    state.oplog.publish(DomainEvent::UserRegistered {
        user_id: user.id,
        name: user.name.clone(),
    });

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered".to_string(),
            user,
        }),
    ))
}

/// POST /auth/recover - Confirm the account behind a document number.
///
/// The reference system returned the stored plaintext password here, which is
/// a security defect, not a contract. Passwords are hashed in this
/// implementation, so the endpoint keeps its shape but only returns the name.
pub async fn recover_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecoverRequest>,
) -> Result<Json<RecoverResponse>, HandlerError> {
    let document_number = match req.document_number {
        Some(d) if !d.is_empty() => d,
        _ => return Err(reply(StatusCode::BAD_REQUEST, "Document number is required")),
    };

    let credentials = match state.users.find_by_document(&document_number).await {
        Ok(credentials) => credentials,
        Err(PortError::NotFound(_)) => {
            return Err(reply(
                StatusCode::NOT_FOUND,
                "No user found with that document number",
            ))
        }
        Err(e) => return Err(port_error(e)),
    };

    Ok(Json(RecoverResponse {
        message: "Account found; contact an administrator to reset the password".to_string(),
        name: credentials.user.name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inventory_core::domain::{DocumentType, UserCredentials, UserPatch, UserRole};
    use inventory_core::ports::PortResult;
    use std::sync::Mutex;

    /// In-memory user store with the same uniqueness contract as the real one.
    #[derive(Default)]
    struct MemoryUsers {
        rows: Mutex<Vec<UserCredentials>>,
    }

    #[async_trait]
    impl UserStore for MemoryUsers {
        async fn list(&self) -> PortResult<Vec<User>> {
            Ok(self.rows.lock().unwrap().iter().map(|c| c.user.clone()).collect())
        }

        async fn get(&self, id: Uuid) -> PortResult<User> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.user.id == id)
                .map(|c| c.user.clone())
                .ok_or_else(|| PortError::NotFound(format!("User {id} not found")))
        }

        async fn find_by_document(&self, document_number: &str) -> PortResult<UserCredentials> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.user.document_number == document_number)
                .cloned()
                .ok_or_else(|| PortError::NotFound("no such document".to_string()))
        }

        async fn insert(&self, user: NewUser, password_hash: String) -> PortResult<User> {
            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|c| c.user.document_number == user.document_number) {
                return Err(PortError::Conflict("duplicate document".to_string()));
            }
            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                name: user.name,
                document_type: user.document_type,
                document_number: user.document_number,
                role: user.role,
                created_at: now,
                updated_at: now,
            };
            rows.push(UserCredentials {
                user: user.clone(),
                password_hash,
            });
            Ok(user)
        }

        async fn update(&self, _id: Uuid, _patch: &UserPatch) -> PortResult<User> {
            unimplemented!("not exercised by these tests")
        }

        async fn delete(&self, _id: Uuid) -> PortResult<()> {
            unimplemented!("not exercised by these tests")
        }
    }

    fn request(document: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some("Ana".to_string()),
            document_type: Some("national-id".to_string()),
            document_number: Some(document.to_string()),
            role: Some("analyst".to_string()),
            password: Some("s3cret".to_string()),
        }
    }

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("s3cret").unwrap();
        assert_ne!(hash, "s3cret");
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[tokio::test]
    async fn duplicate_document_number_is_rejected() {
        let store = MemoryUsers::default();
        let first = register_user(&store, request("1001")).await.unwrap();
        assert_eq!(first.document_type, DocumentType::NationalId);
        assert_eq!(first.role, UserRole::Analyst);

        let second = register_user(&store, request("1001")).await;
        assert!(matches!(second, Err(RegisterError::Duplicate(_))));

        // The first registration is unaffected.
        let stored = store.find_by_document("1001").await.unwrap();
        assert_eq!(stored.user.id, first.id);
    }

    #[tokio::test]
    async fn missing_fields_are_invalid() {
        let store = MemoryUsers::default();
        let mut req = request("1002");
        req.password = None;
        let result = register_user(&store, req).await;
        assert!(matches!(result, Err(RegisterError::Invalid(_))));

        let mut req = request("1003");
        req.role = Some("superuser".to_string());
        let result = register_user(&store, req).await;
        assert!(matches!(result, Err(RegisterError::Invalid(_))));
    }

    #[tokio::test]
    async fn registered_password_is_stored_hashed() {
        let store = MemoryUsers::default();
        register_user(&store, request("1004")).await.unwrap();
        let stored = store.find_by_document("1004").await.unwrap();
        assert_ne!(stored.password_hash, "s3cret");
        assert!(verify_password("s3cret", &stored.password_hash));
    }
}
