//! services/api/src/web/materials.rs
//!
//! Axum handlers for the material CRUD and statistics endpoints.

use crate::config::DeletePolicy;
use crate::web::rest::{error, port_error, HandlerError};
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use inventory_core::domain::{Material, MaterialPatch, NewMaterial};
use inventory_core::events::{DomainEvent, EventSink};
use inventory_core::ports::MaterialFilter;
use inventory_core::stats::InventoryStats;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize)]
pub struct MaterialListQuery {
    pub category: Option<String>,
    pub provider: Option<String>,
    pub search: Option<String>,
}

/// Statistics snapshot plus the moment it was computed.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsResponse {
    #[serde(flatten)]
    pub stats: InventoryStats,
    pub generated_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkInsertResponse {
    pub message: String,
    pub count: usize,
    pub items: Vec<Material>,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

//=========================================================================================
// Read Handlers
//=========================================================================================

/// Filtered list of active materials, newest first.
pub async fn list_materials_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MaterialListQuery>,
) -> Result<Json<Vec<Material>>, HandlerError> {
    let filter = MaterialFilter {
        category: query.category.filter(|s| !s.is_empty()),
        provider: query.provider.filter(|s| !s.is_empty()),
        search: query.search.filter(|s| !s.is_empty()),
    };
    let materials = state.materials.list(&filter).await.map_err(port_error)?;
    Ok(Json(materials))
}

pub async fn categories_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, HandlerError> {
    let categories = state
        .materials
        .distinct_categories()
        .await
        .map_err(port_error)?;
    Ok(Json(categories))
}

pub async fn providers_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, HandlerError> {
    let providers = state
        .materials
        .distinct_providers()
        .await
        .map_err(port_error)?;
    Ok(Json(providers))
}

/// Aggregate snapshot over the active set (counts, values, low stock,
/// per-category and per-provider breakdowns).
pub async fn statistics_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatisticsResponse>, HandlerError> {
    let snapshot = state.materials.all_active().await.map_err(port_error)?;
    let stats = inventory_core::stats::compute(&snapshot, state.config.low_stock_threshold);
    Ok(Json(StatisticsResponse {
        stats,
        generated_at: Utc::now(),
    }))
}

pub async fn get_material_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Material>, HandlerError> {
    let material = state.materials.get(id).await.map_err(port_error)?;
    Ok(Json(material))
}

//=========================================================================================
// Write Handlers
//=========================================================================================

/// Create a single material.
#[utoipa::path(
    post,
    path = "/materials",
    responses(
        (status = 201, description = "Material created"),
        (status = 400, description = "Invalid payload", body = crate::web::rest::ErrorBody),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_material_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewMaterial>,
) -> Result<impl IntoResponse, HandlerError> {
    payload
        .validate()
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let material = state.materials.insert(payload).await.map_err(port_error)?;
    state.oplog.publish(DomainEvent::MaterialAdded {
        material_id: material.id,
        name: material.name.clone(),
        actor: None,
    });
    Ok((StatusCode::CREATED, Json(material)))
}

/// Raw array insert. This path does no reconciliation; duplicate names are
/// inserted as-is.
pub async fn bulk_insert_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, HandlerError> {
    if !body.is_array() {
        return Err(error(
            StatusCode::BAD_REQUEST,
            "An array of materials is required",
        ));
    }
    let payload: Vec<NewMaterial> = serde_json::from_value(body)
        .map_err(|e| error(StatusCode::BAD_REQUEST, format!("Invalid material: {e}")))?;
    for material in &payload {
        material
            .validate()
            .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;
    }

    let created = state
        .materials
        .insert_many(payload)
        .await
        .map_err(port_error)?;
    for material in &created {
        state.oplog.publish(DomainEvent::MaterialAdded {
            material_id: material.id,
            name: material.name.clone(),
            actor: None,
        });
    }
    Ok((
        StatusCode::CREATED,
        Json(BulkInsertResponse {
            message: format!("{} materials created", created.len()),
            count: created.len(),
            items: created,
        }),
    ))
}

/// Field update, including the active flag (so a soft-deleted material can be
/// restored through this path).
pub async fn update_material_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<MaterialPatch>,
) -> Result<Json<Material>, HandlerError> {
    if let Some(name) = &patch.name {
        if name.trim().is_empty() {
            return Err(error(StatusCode::BAD_REQUEST, "name must not be blank"));
        }
    }
    if patch.price.is_some_and(|p| p < 0.0) || patch.stock.is_some_and(|s| s < 0) {
        return Err(error(
            StatusCode::BAD_REQUEST,
            "price and stock must not be negative",
        ));
    }

    let material = state
        .materials
        .update(id, &patch)
        .await
        .map_err(port_error)?;
    state.oplog.publish(DomainEvent::MaterialUpdated {
        material_id: material.id,
        name: material.name.clone(),
        actor: None,
    });
    Ok(Json(material))
}

/// Delete a material according to the configured policy: soft (flag-based,
/// the default) or hard (physical removal).
pub async fn delete_material_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, HandlerError> {
    let material = match state.config.delete_policy {
        DeletePolicy::Soft => state.materials.soft_delete(id).await.map_err(port_error)?,
        DeletePolicy::Hard => {
            let material = state.materials.get(id).await.map_err(port_error)?;
            state.materials.hard_delete(id).await.map_err(port_error)?;
            material
        }
    };
    state.oplog.publish(DomainEvent::MaterialDeleted {
        material_id: material.id,
        name: material.name.clone(),
        actor: None,
    });
    Ok(Json(MessageResponse {
        message: "Material deleted".to_string(),
    }))
}
