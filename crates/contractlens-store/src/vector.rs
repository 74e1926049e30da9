//! Contract retrieval from an Astra DB collection via the JSON Data API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use contractlens_core::ContractDocument;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::metadata::extract_metadata;
use crate::{ContractSource, StoreError};

/// Timeout for `find` queries.
pub const FIND_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for the connectivity probe.
pub const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Record fields checked, in order, for the contract text.
pub const CONTENT_FIELDS: &[&str] = &["$vectorize", "content", "text", "document", "vectorize"];

/// Record fields checked, in order, for the document id.
pub const ID_FIELDS: &[&str] = &["_id", "id", "uuid"];

/// How `find` requests are narrowed to one supplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalScope {
    /// Rank by `$vectorize` similarity to the supplier name; optionally also
    /// filter on a field holding the supplier name.
    Semantic { filter_field: Option<String> },
    /// No narrowing: the first page of the collection.
    Unscoped,
}

impl Default for RetrievalScope {
    fn default() -> Self {
        Self::Semantic { filter_field: None }
    }
}

/// Result of a connectivity probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub endpoint: String,
    pub records: usize,
}

/// Astra DB collection client.
pub struct VectorContractStore {
    client: reqwest::Client,
    collection_url: String,
    token: String,
    scope: RetrievalScope,
}

impl VectorContractStore {
    /// `api_endpoint` is the database's API endpoint, e.g.
    /// `https://<db-id>-<region>.apps.astra.datastax.com`.
    pub fn new(
        api_endpoint: &str,
        keyspace: &str,
        collection: &str,
        token: String,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            collection_url: format!(
                "{}/api/json/v1/{keyspace}/{collection}",
                api_endpoint.trim_end_matches('/')
            ),
            token,
            scope: RetrievalScope::default(),
        })
    }

    pub fn with_scope(mut self, scope: RetrievalScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    async fn find(&self, command: &Value, timeout: Duration) -> Result<Vec<Value>, StoreError> {
        debug!(url = %self.collection_url, "querying contract collection");
        let resp = self
            .client
            .post(&self.collection_url)
            .header("X-Cassandra-Token", &self.token)
            .timeout(timeout)
            .json(command)
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
        let body: Value = serde_json::from_str(&resp.text().await?)?;
        documents(body)
    }

    async fn find_documents(
        &self,
        command: &Value,
    ) -> Result<Vec<ContractDocument>, StoreError> {
        let records = self.find(command, FIND_TIMEOUT).await?;
        let retrieved_at = Utc::now().to_rfc3339();
        Ok(records
            .iter()
            .map(|r| document_from_record(r, &retrieved_at))
            .collect())
    }
}

#[async_trait]
impl ContractSource for VectorContractStore {
    async fn find_contracts(
        &self,
        supplier: &str,
        limit: usize,
    ) -> Result<Vec<ContractDocument>, StoreError> {
        let command = find_command(&self.scope, Some(supplier), limit);
        self.find_documents(&command).await
    }

    async fn all_contracts(&self, limit: usize) -> Result<Vec<ContractDocument>, StoreError> {
        let command = find_command(&RetrievalScope::Unscoped, None, limit);
        self.find_documents(&command).await
    }

    async fn ping(&self) -> Result<ProbeReport, StoreError> {
        let command = find_command(&RetrievalScope::Unscoped, None, 1);
        let records = self.find(&command, PING_TIMEOUT).await?;
        info!(endpoint = %self.collection_url, records = records.len(), "vector store reachable");
        Ok(ProbeReport {
            endpoint: self.collection_url.clone(),
            records: records.len(),
        })
    }
}

/// Data API `find` command for the given scope.
pub(crate) fn find_command(scope: &RetrievalScope, supplier: Option<&str>, limit: usize) -> Value {
    match (scope, supplier) {
        (RetrievalScope::Semantic { filter_field }, Some(supplier)) => {
            let mut filter = Map::new();
            if let Some(field) = filter_field {
                filter.insert(field.clone(), Value::String(supplier.to_string()));
            }
            json!({
                "find": {
                    "filter": filter,
                    "sort": { "$vectorize": supplier },
                    "options": { "limit": limit, "includeSimilarity": true }
                }
            })
        }
        _ => json!({
            "find": {
                "filter": {},
                "options": { "limit": limit }
            }
        }),
    }
}

/// Pull the document list out of a Data API response body.
///
/// A body carrying `errors` is a failure even with a 2xx status. A body with
/// no documents is an empty page.
pub(crate) fn documents(body: Value) -> Result<Vec<Value>, StoreError> {
    let errors = body
        .get("errors")
        .and_then(Value::as_array)
        .filter(|e| !e.is_empty());
    if let Some(errors) = errors {
        let message = errors
            .iter()
            .map(|e| {
                e.get("message")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| e.to_string())
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(StoreError::DataApi(message));
    }
    match body.get("data").and_then(|d| d.get("documents")) {
        Some(Value::Array(docs)) => Ok(docs.clone()),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Err(StoreError::DataApi(format!(
            "expected a documents array, got {other}"
        ))),
    }
}

/// Map a raw collection record onto a [`ContractDocument`].
pub(crate) fn document_from_record(record: &Value, retrieved_at: &str) -> ContractDocument {
    let id = ID_FIELDS.iter().find_map(|f| match record.get(*f)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    let content = CONTENT_FIELDS
        .iter()
        .find_map(|f| match record.get(*f)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_else(|| record.to_string());
    let similarity = record
        .get("$similarity")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let metadata = extract_metadata(id.as_deref(), &content, record, retrieved_at);

    ContractDocument {
        id,
        content,
        similarity,
        metadata,
    }
}
