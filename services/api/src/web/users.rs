//! services/api/src/web/users.rs
//!
//! Axum handlers for user administration. Password hashes never leave the
//! store layer; responses carry the `User` type, which has no credential
//! field at all.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use inventory_core::domain::{User, UserPatch};
use inventory_core::events::{DomainEvent, EventSink};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::web::auth::{self, RegisterError, RegisterRequest, RegisterResponse};
use crate::web::materials::MessageResponse;
use crate::web::rest::{error as reply, port_error, HandlerError};
use crate::web::state::AppState;

//=========================================================================================
// Request Types
//=========================================================================================

/// Partial user update. Enums arrive as their wire names; a password, when
/// present, is hashed before it reaches the store.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateRequest {
    pub name: Option<String>,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

//=========================================================================================
// Handlers
//=========================================================================================

pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<User>>, HandlerError> {
    let users = state.users.list().await.map_err(port_error)?;
    Ok(Json(users))
}

pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, HandlerError> {
    let user = state.users.get(id).await.map_err(port_error)?;
    Ok(Json(user))
}

/// POST /users - administrative registration. Same semantics as
/// /auth/register, same response shape.
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = auth::register_user(state.users.as_ref(), req)
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

pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UserUpdateRequest>,
) -> Result<Json<User>, HandlerError> {
    let document_type = match req.document_type {
        Some(raw) => Some(
            raw.parse()
                .map_err(|_| reply(StatusCode::BAD_REQUEST, "invalid documentType"))?,
        ),
        None => None,
    };
    let role = match req.role {
        Some(raw) => Some(
            raw.parse()
                .map_err(|_| reply(StatusCode::BAD_REQUEST, "invalid role"))?,
        ),
        None => None,
    };
    let password_hash = match req.password {
        Some(password) if !password.is_empty() => {
            Some(auth::hash_password(&password).map_err(|e| {
                error!("failed to hash password: {e}");
                reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            })?)
        }
        _ => None,
    };

    let patch = UserPatch {
        name: req.name,
        document_type,
        document_number: req.document_number,
        role,
        password_hash,
    };
    let user = state.users.update(id, &patch).await.map_err(port_error)?;
    Ok(Json(user))
}

pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, HandlerError> {
    state.users.delete(id).await.map_err(port_error)?;
    Ok(Json(MessageResponse {
        message: "User deleted".to_string(),
    }))
}
