//! Supplier-scoped views over the master file.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use contractlens_core::part::PART_NUMBER_COLUMN;

/// Columns requested for supplier listings.
pub const SUMMARY_COLUMNS: &[&str] = &[PART_NUMBER_COLUMN, "partname", "material", "currency"];

/// Lightweight part listing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartSummary {
    pub part_number: String,
    pub part_name: Option<String>,
    pub material: Option<String>,
    pub currency: Option<String>,
}

impl PartSummary {
    /// Build from a row keyed by column name. Rows without a part number are skipped.
    pub fn from_columns(row: &Map<String, Value>) -> Option<Self> {
        Some(Self {
            part_number: text(row, PART_NUMBER_COLUMN)?,
            part_name: text(row, "partname"),
            material: text(row, "material"),
            currency: text(row, "currency"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierStatistics {
    pub supplier_name: String,
    pub total_parts: usize,
    pub unique_materials: Vec<String>,
    pub currencies: Vec<String>,
    pub part_numbers: Vec<String>,
}

impl SupplierStatistics {
    /// Aggregate a supplier's parts. `None` for an empty slice.
    pub fn from_parts(supplier: &str, parts: &[PartSummary]) -> Option<Self> {
        if parts.is_empty() {
            return None;
        }
        let materials: BTreeSet<&str> = parts.iter().filter_map(|p| p.material.as_deref()).collect();
        let currencies: BTreeSet<&str> = parts.iter().filter_map(|p| p.currency.as_deref()).collect();
        Some(Self {
            supplier_name: supplier.to_string(),
            total_parts: parts.len(),
            unique_materials: materials.into_iter().map(String::from).collect(),
            currencies: currencies.into_iter().map(String::from).collect(),
            part_numbers: parts.iter().map(|p| p.part_number.clone()).collect(),
        })
    }
}

/// PostgREST `ilike` pattern for a case-insensitive substring match.
pub(crate) fn ilike_pattern(supplier: &str) -> String {
    // `*` is PostgREST's URL-safe wildcard; strip any the caller supplied.
    format!("ilike.*{}*", supplier.trim().replace('*', ""))
}

fn text(row: &Map<String, Value>, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
