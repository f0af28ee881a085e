//! services/api/src/web/import.rs
//!
//! Bulk CSV import. Uploaded files are parsed into raw rows, reconciled
//! against the current material set by the core engine, and the resulting
//! plan is applied to the store in row order. Failures are scoped: a bad row
//! never aborts its file, and a bad file never aborts its siblings.

use axum::{
    extract::{Extension, Multipart, State},
    http::StatusCode,
    response::Json,
};
use inventory_core::events::{Actor, DomainEvent, EventSink};
use inventory_core::ports::MaterialStore;
use inventory_core::reconcile::{plan_batch, BatchPlan, RawRow, RowDecision, RowError, Target};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::{error as reply, HandlerError};
use crate::web::state::AppState;

//=========================================================================================
// Response Types
//=========================================================================================

/// Outcome for one uploaded file.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file: String,
    pub inserted: usize,
    pub updated: usize,
    /// Row-level failures; the rest of the file was still processed.
    #[schema(value_type = Vec<Object>)]
    pub errors: Vec<RowError>,
    /// File-level failure (unsupported format, store error). When set, the
    /// counts reflect whatever was applied before the failure.
    pub error: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub message: String,
    pub inserted: usize,
    pub updated: usize,
    pub files: Vec<FileReport>,
}

//=========================================================================================
// CSV Parsing
//=========================================================================================

/// Reads raw rows out of CSV bytes. The first line is a header and is
/// skipped; unreadable records are reported with their line number.
fn rows_from_csv(data: &[u8]) -> (Vec<RawRow>, Vec<RowError>) {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Header occupies line 1, so data starts at line 2.
        let fallback_line = idx + 2;
        match result {
            Ok(record) => {
                let line = record
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(fallback_line);
                rows.push(RawRow {
                    line,
                    fields: record.iter().map(|f| f.to_string()).collect(),
                });
            }
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(fallback_line);
                errors.push(RowError {
                    line,
                    message: format!("unreadable record: {e}"),
                });
            }
        }
    }
    (rows, errors)
}

//=========================================================================================
// Plan Application
//=========================================================================================

#[derive(Debug, Default)]
pub(crate) struct ApplyOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub aborted: bool,
    pub failure: Option<String>,
}

/// Applies a reconciliation plan to the store, strictly in decision order so
/// updates can target materials inserted earlier in the same plan.
/// Cancellation is checked between rows; partial application is reported,
/// not rolled back.
pub(crate) async fn apply_plan(
    store: &dyn MaterialStore,
    plan: &BatchPlan,
    cancel: &CancellationToken,
) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();
    let mut inserted_ids: Vec<Uuid> = Vec::new();

    for decision in &plan.decisions {
        if cancel.is_cancelled() {
            outcome.aborted = true;
            break;
        }
        let result = match decision {
            RowDecision::Insert(new) => match store.insert(new.clone()).await {
                Ok(material) => {
                    inserted_ids.push(material.id);
                    outcome.inserted += 1;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            RowDecision::Update { target, patch } => {
                let id = match target {
                    Target::Existing(id) => *id,
                    Target::Inserted(idx) => inserted_ids[*idx],
                };
                match store.update(id, patch).await {
                    Ok(_) => {
                        outcome.updated += 1;
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
        };
        if let Err(e) = result {
            outcome.failure = Some(e.to_string());
            break;
        }
    }
    outcome
}

async fn process_file(
    store: &dyn MaterialStore,
    file_name: &str,
    data: &[u8],
    cancel: &CancellationToken,
) -> FileReport {
    if !file_name.to_lowercase().ends_with(".csv") {
        return FileReport {
            file: file_name.to_string(),
            inserted: 0,
            updated: 0,
            errors: Vec::new(),
            error: Some("Unsupported format. Only CSV files are accepted.".to_string()),
        };
    }

    // Fresh snapshot per file so earlier files in the batch are visible.
    let snapshot = match store.all_active().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            return FileReport {
                file: file_name.to_string(),
                inserted: 0,
                updated: 0,
                errors: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    };

    let (rows, mut errors) = rows_from_csv(data);
    let plan = plan_batch(&rows, &snapshot);
    errors.extend(plan.errors.iter().cloned());

    let outcome = apply_plan(store, &plan, cancel).await;
    FileReport {
        file: file_name.to_string(),
        inserted: outcome.inserted,
        updated: outcome.updated,
        errors,
        error: outcome
            .failure
            .or_else(|| outcome.aborted.then(|| "import cancelled".to_string())),
    }
}

//=========================================================================================
// Handler
//=========================================================================================

/// Upload one or more CSV files and reconcile them into the material set.
///
/// Requires an authenticated session; the actor is recorded in the operation
/// log alongside the import counts.
#[utoipa::path(
    post,
    path = "/materials/import",
    request_body(content_type = "multipart/form-data", description = "CSV files to import."),
    responses(
        (status = 200, description = "Batch processed (possibly with per-file errors)", body = ImportResponse),
        (status = 400, description = "No files in the request"),
        (status = 401, description = "Missing or invalid session token")
    )
)]
pub async fn import_materials_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, HandlerError> {
    let actor = match state.users.get(user_id).await {
        Ok(user) => Some(Actor {
            id: user.id,
            name: user.name,
            role: user.role,
        }),
        Err(e) => {
            error!("could not resolve import actor: {e}");
            None
        }
    };

    let cancel = CancellationToken::new();
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reply(StatusCode::BAD_REQUEST, format!("Failed to read multipart data: {e}")))?
    {
        let file_name = field.file_name().unwrap_or("unnamed").to_string();
        let data = field.bytes().await.map_err(|e| {
            reply(
                StatusCode::BAD_REQUEST,
                format!("Failed to read file bytes: {e}"),
            )
        })?;
        files.push(process_file(state.materials.as_ref(), &file_name, &data, &cancel).await);
    }

    if files.is_empty() {
        return Err(reply(
            StatusCode::BAD_REQUEST,
            "The request must include at least one file",
        ));
    }

    let inserted: usize = files.iter().map(|f| f.inserted).sum();
    let updated: usize = files.iter().map(|f| f.updated).sum();
    let failed_rows: usize = files.iter().map(|f| f.errors.len()).sum();

    info!(
        files = files.len(),
        inserted, updated, failed_rows, "bulk import finished"
    );
    state.oplog.publish(DomainEvent::FilesProcessed {
        files: files.len(),
        inserted,
        updated,
        failed_rows,
        actor,
    });

    Ok(Json(ImportResponse {
        message: format!("Processed {inserted} new and {updated} updated materials"),
        inserted,
        updated,
        files,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use inventory_core::domain::{Material, MaterialPatch, NewMaterial};
    use inventory_core::ports::{MaterialFilter, PortError, PortResult};
    use std::sync::Mutex;

    /// In-memory material store used to exercise plan application.
    #[derive(Default)]
    struct MemoryMaterials {
        rows: Mutex<Vec<Material>>,
    }

    impl MemoryMaterials {
        fn snapshot(&self) -> Vec<Material> {
            self.rows.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MaterialStore for MemoryMaterials {
        async fn list(&self, _filter: &MaterialFilter) -> PortResult<Vec<Material>> {
            Ok(self.snapshot().into_iter().filter(|m| m.active).collect())
        }

        async fn get(&self, id: Uuid) -> PortResult<Material> {
            self.snapshot()
                .into_iter()
                .find(|m| m.id == id)
                .ok_or_else(|| PortError::NotFound(format!("Material {id} not found")))
        }

        async fn insert(&self, new: NewMaterial) -> PortResult<Material> {
            let now = Utc::now();
            let material = Material {
                id: Uuid::new_v4(),
                name: new.name,
                price: new.price,
                category: new.category,
                stock: new.stock,
                provider: new.provider,
                unit: new.unit,
                description: new.description,
                active: true,
                created_at: now,
                updated_at: now,
            };
            self.rows.lock().unwrap().push(material.clone());
            Ok(material)
        }

        async fn insert_many(&self, materials: Vec<NewMaterial>) -> PortResult<Vec<Material>> {
            let mut created = Vec::new();
            for m in materials {
                created.push(self.insert(m).await?);
            }
            Ok(created)
        }

        async fn update(&self, id: Uuid, patch: &MaterialPatch) -> PortResult<Material> {
            let mut rows = self.rows.lock().unwrap();
            let material = rows
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or_else(|| PortError::NotFound(format!("Material {id} not found")))?;
            patch.apply_to(material, Utc::now());
            Ok(material.clone())
        }

        async fn soft_delete(&self, id: Uuid) -> PortResult<Material> {
            self.update(
                id,
                &MaterialPatch {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
        }

        async fn hard_delete(&self, id: Uuid) -> PortResult<()> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|m| m.id != id);
            if rows.len() == before {
                return Err(PortError::NotFound(format!("Material {id} not found")));
            }
            Ok(())
        }

        async fn distinct_categories(&self) -> PortResult<Vec<String>> {
            let mut cats: Vec<String> = self
                .snapshot()
                .into_iter()
                .filter(|m| m.active)
                .map(|m| m.category)
                .collect();
            cats.sort();
            cats.dedup();
            Ok(cats)
        }

        async fn distinct_providers(&self) -> PortResult<Vec<String>> {
            let mut provs: Vec<String> = self
                .snapshot()
                .into_iter()
                .filter(|m| m.active)
                .map(|m| m.provider)
                .collect();
            provs.sort();
            provs.dedup();
            Ok(provs)
        }

        async fn all_active(&self) -> PortResult<Vec<Material>> {
            Ok(self.snapshot().into_iter().filter(|m| m.active).collect())
        }
    }

    const CSV: &[u8] = b"name,price,category,stock,provider\n\
Rebar,3.5,Steel,20,Acme\n\
rebar,4.0,,,\n\
Sand,1.2,,50,\n";

    #[tokio::test]
    async fn csv_rows_reconcile_and_chain_within_one_file() {
        let store = MemoryMaterials::default();
        let (rows, parse_errors) = rows_from_csv(CSV);
        assert!(parse_errors.is_empty());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].line, 2);

        let plan = plan_batch(&rows, &store.all_active().await.unwrap());
        let outcome = apply_plan(&store, &plan, &CancellationToken::new()).await;
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.updated, 1);
        assert!(outcome.failure.is_none());

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        let rebar = snapshot.iter().find(|m| m.name == "Rebar").unwrap();
        // The duplicate row updated the material inserted two rows earlier.
        assert_eq!(rebar.price, 4.0);
        assert_eq!(rebar.stock, 20);
        assert_eq!(rebar.category, "Steel");
    }

    #[tokio::test]
    async fn reimporting_the_same_file_inserts_nothing() {
        let store = MemoryMaterials::default();
        let (rows, _) = rows_from_csv(CSV);

        let plan = plan_batch(&rows, &store.all_active().await.unwrap());
        apply_plan(&store, &plan, &CancellationToken::new()).await;
        let after_first = store.snapshot().len();

        let plan = plan_batch(&rows, &store.all_active().await.unwrap());
        let outcome = apply_plan(&store, &plan, &CancellationToken::new()).await;
        assert_eq!(outcome.inserted, 0);
        assert_eq!(store.snapshot().len(), after_first);
    }

    #[tokio::test]
    async fn cancellation_stops_between_rows_without_rollback() {
        let store = MemoryMaterials::default();
        let (rows, _) = rows_from_csv(CSV);
        let plan = plan_batch(&rows, &store.all_active().await.unwrap());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = apply_plan(&store, &plan, &cancel).await;
        assert!(outcome.aborted);
        assert_eq!(outcome.inserted, 0);
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn non_csv_files_fail_alone() {
        let store = MemoryMaterials::default();
        let cancel = CancellationToken::new();

        let bad = process_file(&store, "notes.pdf", b"whatever", &cancel).await;
        assert!(bad.error.is_some());
        assert_eq!(bad.inserted, 0);

        // A sibling CSV still processes normally.
        let good = process_file(&store, "materials.csv", CSV, &cancel).await;
        assert!(good.error.is_none());
        assert_eq!(good.inserted, 2);
    }

    #[tokio::test]
    async fn blank_names_are_reported_but_do_not_abort() {
        let store = MemoryMaterials::default();
        let data: &[u8] = b"name,price\n,3.5\nSand,1.2\n";
        let report =
            process_file(&store, "materials.csv", data, &CancellationToken::new()).await;
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].line, 2);
        assert_eq!(report.inserted, 1);
        assert!(report.error.is_none());
    }
}
