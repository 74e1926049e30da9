//! Part master file over PostgREST (Supabase's REST interface).

use std::time::Duration;

use async_trait::async_trait;
use contractlens_core::PartRecord;
use contractlens_core::part::{PART_NUMBER_COLUMN, SUPPLIER_NAME_COLUMN, lookup_columns};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::supplier::{SUMMARY_COLUMNS, ilike_pattern};
use crate::{PartSource, PartSummary, StoreError};

/// Table holding one row per part.
pub const DEFAULT_TABLE: &str = "MASTER_FILE";

/// Per-request timeout for master-file queries.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// PostgREST client for the master-file table.
///
/// `base_url` is the project URL (e.g. `https://xyz.supabase.co`, no trailing
/// slash needed). The key is sent both as `apikey` and as a bearer token.
pub struct RestPartStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl RestPartStore {
    pub fn new(base_url: String, api_key: String) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            table: DEFAULT_TABLE.to_string(),
        })
    }

    /// Query a different table than [`DEFAULT_TABLE`].
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    async fn select(&self, query: &[(&str, String)]) -> Result<Vec<Map<String, Value>>, StoreError> {
        let url = self.table_url();
        debug!(url = %url, "querying master file");
        let resp = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let rows: Vec<Map<String, Value>> = serde_json::from_str(&resp.text().await?)?;
        Ok(rows)
    }
}

#[async_trait]
impl PartSource for RestPartStore {
    async fn fetch_record(&self, part_number: &str) -> Result<Option<PartRecord>, StoreError> {
        let rows = self.select(&record_query(part_number)).await?;
        match rows.first() {
            Some(row) => Ok(Some(PartRecord::from_columns(row)?)),
            None => Ok(None),
        }
    }

    async fn parts_by_supplier(&self, supplier: &str) -> Result<Vec<PartSummary>, StoreError> {
        let query = [
            ("select", SUMMARY_COLUMNS.join(",")),
            (SUPPLIER_NAME_COLUMN, ilike_pattern(supplier)),
        ];
        let rows = self.select(&query).await?;
        let parts: Vec<PartSummary> = rows.iter().filter_map(PartSummary::from_columns).collect();
        info!(supplier, count = parts.len(), "listed supplier parts");
        Ok(parts)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let query = [
            ("select", PART_NUMBER_COLUMN.to_string()),
            ("limit", "1".to_string()),
        ];
        self.select(&query).await.map(|_| ())
    }
}

/// Query string for an exact part-number match over the full lookup column set.
fn record_query(part_number: &str) -> [(&'static str, String); 2] {
    [
        ("select", lookup_columns().join(",")),
        (PART_NUMBER_COLUMN, format!("eq.{part_number}")),
    ]
}
