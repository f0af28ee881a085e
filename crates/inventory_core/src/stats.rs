//! crates/inventory_core/src/stats.rs
//!
//! The statistics engine: a pure aggregation over a snapshot of the active
//! material set. Deterministic for a given input; breakdowns are sorted by
//! group name.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::domain::Material;

/// Stock level at or below which a material counts as low-stock.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

/// Aggregates for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub category: String,
    pub materials: usize,
    pub total_value: f64,
    /// Distinct providers supplying this category.
    pub providers: usize,
}

/// Aggregates for one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStats {
    pub provider: String,
    pub materials: usize,
    pub total_value: f64,
    /// Distinct categories this provider supplies.
    pub categories: usize,
}

/// Point-in-time aggregate snapshot of the inventory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total_materials: usize,
    /// Sum over materials of price x stock.
    pub total_value: f64,
    pub distinct_categories: usize,
    /// Materials with stock at or below the threshold (inclusive).
    pub low_stock: usize,
    pub by_category: Vec<CategoryStats>,
    pub by_provider: Vec<ProviderStats>,
}

/// Computes the aggregate snapshot for the given materials. The caller is
/// expected to pass the active subset; an empty input yields zero counts and
/// empty breakdowns.
pub fn compute(materials: &[Material], low_stock_threshold: i32) -> InventoryStats {
    let mut total_value = 0.0;
    let mut low_stock = 0;
    let mut categories: BTreeMap<&str, (usize, f64, BTreeSet<&str>)> = BTreeMap::new();
    let mut providers: BTreeMap<&str, (usize, f64, BTreeSet<&str>)> = BTreeMap::new();

    for m in materials {
        let value = m.price * m.stock as f64;
        total_value += value;
        if m.stock <= low_stock_threshold {
            low_stock += 1;
        }

        let cat = categories.entry(&m.category).or_default();
        cat.0 += 1;
        cat.1 += value;
        cat.2.insert(&m.provider);

        let prov = providers.entry(&m.provider).or_default();
        prov.0 += 1;
        prov.1 += value;
        prov.2.insert(&m.category);
    }

    InventoryStats {
        total_materials: materials.len(),
        total_value,
        distinct_categories: categories.len(),
        low_stock,
        by_category: categories
            .into_iter()
            .map(|(name, (count, value, provs))| CategoryStats {
                category: name.to_string(),
                materials: count,
                total_value: value,
                providers: provs.len(),
            })
            .collect(),
        by_provider: providers
            .into_iter()
            .map(|(name, (count, value, cats))| ProviderStats {
                provider: name.to_string(),
                materials: count,
                total_value: value,
                categories: cats.len(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_UNIT;
    use chrono::Utc;
    use uuid::Uuid;

    fn material(price: f64, stock: i32, category: &str, provider: &str) -> Material {
        let now = Utc::now();
        Material {
            id: Uuid::new_v4(),
            name: format!("{category}-{provider}-{stock}"),
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

    #[test]
    fn total_value_sums_price_times_stock() {
        let materials = vec![
            material(10.0, 2, "Cement", "Argos"),
            material(5.0, 4, "Steel", "Acme"),
        ];
        let stats = compute(&materials, DEFAULT_LOW_STOCK_THRESHOLD);
        assert_eq!(stats.total_materials, 2);
        assert_eq!(stats.total_value, 40.0);
        assert_eq!(stats.distinct_categories, 2);
    }

    #[test]
    fn empty_collection_yields_zeroes_not_errors() {
        let stats = compute(&[], DEFAULT_LOW_STOCK_THRESHOLD);
        assert_eq!(stats.total_materials, 0);
        assert_eq!(stats.total_value, 0.0);
        assert_eq!(stats.distinct_categories, 0);
        assert_eq!(stats.low_stock, 0);
        assert!(stats.by_category.is_empty());
        assert!(stats.by_provider.is_empty());
    }

    #[test]
    fn low_stock_boundary_is_inclusive() {
        let materials = vec![
            material(1.0, 10, "Cement", "Argos"),
            material(1.0, 11, "Cement", "Argos"),
            material(1.0, 0, "Cement", "Argos"),
        ];
        let stats = compute(&materials, 10);
        assert_eq!(stats.low_stock, 2);
    }

    #[test]
    fn breakdowns_count_distinct_cross_groups() {
        let materials = vec![
            material(2.0, 5, "Cement", "Argos"),
            material(3.0, 1, "Cement", "Holcim"),
            material(4.0, 2, "Steel", "Argos"),
        ];
        let stats = compute(&materials, DEFAULT_LOW_STOCK_THRESHOLD);

        let cement = stats
            .by_category
            .iter()
            .find(|c| c.category == "Cement")
            .unwrap();
        assert_eq!(cement.materials, 2);
        assert_eq!(cement.total_value, 13.0);
        assert_eq!(cement.providers, 2);

        let argos = stats
            .by_provider
            .iter()
            .find(|p| p.provider == "Argos")
            .unwrap();
        assert_eq!(argos.materials, 2);
        assert_eq!(argos.total_value, 18.0);
        assert_eq!(argos.categories, 2);

        // Deterministic ordering: groups come out name-sorted.
        let names: Vec<_> = stats.by_category.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["Cement", "Steel"]);
    }
}
