//! crates/inventory_core/src/reconcile.rs
//!
//! The reconciliation engine: turns a batch of raw tabular rows into ordered
//! insert/update decisions against an existing material collection, keyed by
//! case-insensitive name match. Pure planning over a snapshot; applying the
//! decisions against a store is the caller's job.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Material, MaterialPatch, NewMaterial, DEFAULT_UNIT};

/// Category assigned to rows that leave the column blank. Never propagated
/// into an update patch.
pub const FALLBACK_CATEGORY: &str = "General";

/// Provider assigned to rows that leave the column blank. Never propagated
/// into an update patch.
pub const FALLBACK_PROVIDER: &str = "unspecified";

//=========================================================================================
// Row Parsing
//=========================================================================================

/// One raw record from a tabular source, positionally indexed.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based line number in the source file, for error reporting.
    pub line: usize,
    pub fields: Vec<String>,
}

/// A row with the positional fallback rules already applied:
/// absent/unparseable price and stock become 0, absent category and provider
/// become the fallback literals.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub name: String,
    pub price: f64,
    pub category: String,
    pub stock: i32,
    pub provider: String,
}

/// A row that could not be reconciled. Does not abort the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Parses a raw row, applying the fallback rules in one place.
///
/// Field layout: 0 = name (required), 1 = price, 2 = category, 3 = stock,
/// 4 = provider. All values are trimmed.
pub fn parse_row(row: &RawRow) -> Result<ParsedRow, RowError> {
    let field = |idx: usize| row.fields.get(idx).map(|f| f.trim()).unwrap_or("");

    let name = field(0);
    if name.is_empty() {
        return Err(RowError {
            line: row.line,
            message: "missing material name".to_string(),
        });
    }

    Ok(ParsedRow {
        name: name.to_string(),
        price: field(1).parse::<f64>().unwrap_or(0.0),
        category: non_empty_or(field(2), FALLBACK_CATEGORY),
        stock: field(3).parse::<i32>().unwrap_or(0),
        provider: non_empty_or(field(4), FALLBACK_PROVIDER),
    })
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

impl ParsedRow {
    /// The update carried when this row matches an existing material: only
    /// meaningful fields survive, so fallback and zero values never clobber
    /// stored data.
    fn update_patch(&self) -> MaterialPatch {
        let mut patch = MaterialPatch::default();
        if self.price > 0.0 {
            patch.price = Some(self.price);
        }
        if self.category != FALLBACK_CATEGORY {
            patch.category = Some(self.category.clone());
        }
        if self.stock > 0 {
            patch.stock = Some(self.stock);
        }
        if self.provider != FALLBACK_PROVIDER {
            patch.provider = Some(self.provider.clone());
        }
        patch
    }

    fn into_new_material(self) -> NewMaterial {
        NewMaterial {
            name: self.name,
            price: self.price,
            category: self.category,
            stock: self.stock,
            provider: self.provider,
            unit: DEFAULT_UNIT.to_string(),
            description: None,
        }
    }
}

//=========================================================================================
// Batch Planning
//=========================================================================================

/// What an update decision points at: a material that existed before the
/// batch, or one inserted by an earlier row of the same plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Existing(Uuid),
    /// Index into the plan's inserts, in emission order.
    Inserted(usize),
}

/// One decision, to be applied in order.
#[derive(Debug, Clone, PartialEq)]
pub enum RowDecision {
    Insert(NewMaterial),
    Update { target: Target, patch: MaterialPatch },
}

/// The ordered outcome of planning a batch.
#[derive(Debug, Default)]
pub struct BatchPlan {
    pub decisions: Vec<RowDecision>,
    pub errors: Vec<RowError>,
    /// Rows considered, including failed ones.
    pub rows_seen: usize,
}

impl BatchPlan {
    pub fn inserted(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| matches!(d, RowDecision::Insert(_)))
            .count()
    }

    pub fn updated(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| matches!(d, RowDecision::Update { .. }))
            .count()
    }
}

/// Plans a batch of rows against a snapshot of existing materials.
///
/// Rows are processed in order and matched case-insensitively by name.
/// First match wins, and the working set grows with the plan's own inserts,
/// so a later duplicate row updates the material inserted by an earlier row
/// instead of re-inserting it. Rows with no meaningful update fields emit no
/// decision; row-level failures are collected and never abort the batch.
pub fn plan_batch(rows: &[RawRow], existing: &[Material]) -> BatchPlan {
    let mut plan = BatchPlan::default();

    // First occurrence wins, matching a linear first-match scan.
    let mut by_name: HashMap<String, Target> = HashMap::new();
    for material in existing {
        by_name
            .entry(material.name.to_lowercase())
            .or_insert(Target::Existing(material.id));
    }

    let mut inserts = 0usize;
    for row in rows {
        plan.rows_seen += 1;
        let parsed = match parse_row(row) {
            Ok(parsed) => parsed,
            Err(err) => {
                plan.errors.push(err);
                continue;
            }
        };

        let key = parsed.name.to_lowercase();
        match by_name.get(&key) {
            Some(&target) => {
                let patch = parsed.update_patch();
                if !patch.is_empty() {
                    plan.decisions.push(RowDecision::Update { target, patch });
                }
            }
            None => {
                by_name.insert(key, Target::Inserted(inserts));
                inserts += 1;
                plan.decisions
                    .push(RowDecision::Insert(parsed.into_new_material()));
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(line: usize, fields: &[&str]) -> RawRow {
        RawRow {
            line,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn material(name: &str, price: f64, category: &str, stock: i32, provider: &str) -> Material {
        let now = Utc::now();
        Material {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            category: category.to_string(),
            stock,
            provider: provider.to_string(),
            unit: DEFAULT_UNIT.to_string(),
            description: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reference applier: replays a plan against an in-memory snapshot.
    fn apply(plan: &BatchPlan, mut snapshot: Vec<Material>) -> Vec<Material> {
        let now = Utc::now();
        let mut inserted_ids = Vec::new();
        for decision in &plan.decisions {
            match decision {
                RowDecision::Insert(new) => {
                    let m = material(&new.name, new.price, &new.category, new.stock, &new.provider);
                    inserted_ids.push(m.id);
                    snapshot.push(m);
                }
                RowDecision::Update { target, patch } => {
                    let id = match target {
                        Target::Existing(id) => *id,
                        Target::Inserted(idx) => inserted_ids[*idx],
                    };
                    let m = snapshot.iter_mut().find(|m| m.id == id).unwrap();
                    patch.apply_to(m, now);
                }
            }
        }
        snapshot
    }

    #[test]
    fn parse_applies_fallbacks_in_one_place() {
        let parsed = parse_row(&row(2, &["Rebar", "", "", "", ""])).unwrap();
        assert_eq!(
            parsed,
            ParsedRow {
                name: "Rebar".to_string(),
                price: 0.0,
                category: FALLBACK_CATEGORY.to_string(),
                stock: 0,
                provider: FALLBACK_PROVIDER.to_string(),
            }
        );

        let parsed = parse_row(&row(3, &[" Rebar ", "not-a-price", "Steel", "7.5", "Acme"])).unwrap();
        assert_eq!(parsed.name, "Rebar");
        assert_eq!(parsed.price, 0.0);
        assert_eq!(parsed.stock, 0);
        assert_eq!(parsed.provider, "Acme");
    }

    #[test]
    fn blank_name_is_a_row_error() {
        let err = parse_row(&row(4, &["   ", "10"])).unwrap_err();
        assert_eq!(err.line, 4);
        assert!(err.message.contains("name"));
    }

    #[test]
    fn unknown_name_plans_an_insert_with_all_fields() {
        let plan = plan_batch(&[row(2, &["Rebar", "3.5", "Steel", "20", "Acme"])], &[]);
        assert_eq!(plan.inserted(), 1);
        assert_eq!(plan.updated(), 0);
        match &plan.decisions[0] {
            RowDecision::Insert(new) => {
                assert_eq!(new.name, "Rebar");
                assert_eq!(new.price, 3.5);
                assert_eq!(new.stock, 20);
                assert_eq!(new.unit, DEFAULT_UNIT);
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn name_match_is_case_insensitive() {
        let existing = vec![material("CEMENTO GRIS", 10.0, "Cement", 5, "Argos")];
        let plan = plan_batch(
            &[row(2, &["Cemento Gris", "12.0", "", "", ""])],
            &existing,
        );

        assert_eq!(plan.inserted(), 0);
        assert_eq!(plan.updated(), 1);
        match &plan.decisions[0] {
            RowDecision::Update { target, patch } => {
                assert_eq!(*target, Target::Existing(existing[0].id));
                assert_eq!(patch.price, Some(12.0));
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn fallback_values_never_propagate_into_updates() {
        let existing = vec![material("Rebar", 3.0, "Steel", 40, "Acme")];
        // Empty category/provider and zero price/stock: nothing meaningful,
        // so no update is emitted at all.
        let plan = plan_batch(&[row(2, &["rebar", "0", "", "0", ""])], &existing);
        assert!(plan.decisions.is_empty());
        assert!(plan.errors.is_empty());

        // A mixed row only carries its meaningful fields.
        let plan = plan_batch(&[row(2, &["rebar", "4.5", "", "0", ""])], &existing);
        match &plan.decisions[0] {
            RowDecision::Update { patch, .. } => {
                assert_eq!(patch.price, Some(4.5));
                assert_eq!(patch.category, None);
                assert_eq!(patch.stock, None);
                assert_eq!(patch.provider, None);
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn later_rows_match_materials_inserted_earlier_in_the_batch() {
        let rows = vec![
            row(2, &["Gravel", "2.0", "", "10", ""]),
            row(3, &["GRAVEL", "2.5", "Aggregates", "", ""]),
        ];
        let plan = plan_batch(&rows, &[]);

        assert_eq!(plan.inserted(), 1);
        assert_eq!(plan.updated(), 1);
        match &plan.decisions[1] {
            RowDecision::Update { target, patch } => {
                assert_eq!(*target, Target::Inserted(0));
                assert_eq!(patch.price, Some(2.5));
                assert_eq!(patch.category, Some("Aggregates".to_string()));
            }
            other => panic!("expected update, got {other:?}"),
        }

        // After applying, exactly one material exists with the merged fields.
        let snapshot = apply(&plan, Vec::new());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].price, 2.5);
        assert_eq!(snapshot[0].category, "Aggregates");
        assert_eq!(snapshot[0].stock, 10);
    }

    #[test]
    fn replanning_the_same_batch_is_idempotent() {
        let rows = vec![
            row(2, &["Rebar", "3.5", "Steel", "20", "Acme"]),
            row(3, &["Sand", "1.2", "", "50", ""]),
        ];
        let first = plan_batch(&rows, &[]);
        let after_first = apply(&first, Vec::new());
        assert_eq!(after_first.len(), 2);

        let second = plan_batch(&rows, &after_first);
        assert_eq!(second.inserted(), 0);
        let after_second = apply(&second, after_first.clone());

        assert_eq!(after_second.len(), after_first.len());
        for (a, b) in after_first.iter().zip(after_second.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.name, b.name);
            assert_eq!(a.price, b.price);
            assert_eq!(a.category, b.category);
            assert_eq!(a.stock, b.stock);
            assert_eq!(a.provider, b.provider);
        }
    }

    #[test]
    fn row_errors_do_not_abort_the_batch() {
        let rows = vec![
            row(2, &["", "3.5"]),
            row(3, &["Sand", "1.2", "Aggregates", "50", "Local"]),
        ];
        let plan = plan_batch(&rows, &[]);
        assert_eq!(plan.rows_seen, 2);
        assert_eq!(plan.errors.len(), 1);
        assert_eq!(plan.errors[0].line, 2);
        assert_eq!(plan.inserted(), 1);
    }

    #[test]
    fn first_snapshot_match_wins_for_duplicate_names() {
        let first = material("Rebar", 3.0, "Steel", 40, "Acme");
        let second = material("rebar", 9.0, "Other", 1, "Else");
        let plan = plan_batch(
            &[row(2, &["REBAR", "5.0", "", "", ""])],
            &[first.clone(), second],
        );
        match &plan.decisions[0] {
            RowDecision::Update { target, .. } => {
                assert_eq!(*target, Target::Existing(first.id));
            }
            other => panic!("expected update, got {other:?}"),
        }
    }
}
