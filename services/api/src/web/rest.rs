//! services/api/src/web/rest.rs
//!
//! Shared handler plumbing (error responses), the status and operation-log
//! endpoints, and the master definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use inventory_core::oplog::OperationEntry;
use inventory_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        status_handler,
        crate::web::auth::login_handler,
        crate::web::auth::register_handler,
        crate::web::materials::create_material_handler,
        crate::web::import::import_materials_handler,
    ),
    components(
        schemas(StatusResponse, ErrorBody)
    ),
    tags(
        (name = "Materials Inventory API", description = "API endpoints for the supply-chain materials inventory.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Plumbing
//=========================================================================================

/// Body returned with every non-2xx response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
}

/// The uniform failure type for REST handlers.
pub type HandlerError = (StatusCode, Json<ErrorBody>);

pub fn error(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
}

/// Translates a port error into a status code. This is the only place store
/// failures become HTTP failures.
pub fn port_error(err: PortError) -> HandlerError {
    match err {
        PortError::NotFound(message) => error(StatusCode::NOT_FOUND, message),
        PortError::Conflict(message) => error(StatusCode::BAD_REQUEST, message),
        PortError::Unexpected(message) => {
            tracing::error!("store failure: {message}");
            error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

//=========================================================================================
// Status Endpoint
//=========================================================================================

/// Liveness and store-connectivity report.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub store_connected: bool,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Report service liveness and database connectivity.
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Service is up", body = StatusResponse)
    )
)]
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        store_connected: state.db.ping().await,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

//=========================================================================================
// Operation Log Endpoint
//=========================================================================================

#[derive(Deserialize)]
pub struct OperationsQuery {
    pub limit: Option<usize>,
}

/// Most recent audit-log entries, newest first.
pub async fn operations_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OperationsQuery>,
) -> Json<Vec<OperationEntry>> {
    let limit = query.limit.unwrap_or(state.config.operation_log_capacity);
    Json(state.oplog.recent(limit))
}
