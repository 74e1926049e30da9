//! Dependency health probes.

use contractlens_store::{ContractSource, PartSource};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyStatus {
    /// `connected` or `error`.
    pub status: &'static str,
    pub error: Option<String>,
}

impl DependencyStatus {
    fn connected() -> Self {
        Self {
            status: "connected",
            error: None,
        }
    }

    fn failed(error: impl ToString) -> Self {
        Self {
            status: "error",
            error: Some(error.to_string()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-store connectivity, keyed the way clients expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Databases {
    pub supabase: DependencyStatus,
    pub astra: DependencyStatus,
}

impl Databases {
    pub fn all_connected(&self) -> bool {
        self.supabase.is_connected() && self.astra.is_connected()
    }
}

/// Probe both stores concurrently. Failures are reported, never propagated.
pub async fn check_databases(parts: &dyn PartSource, contracts: &dyn ContractSource) -> Databases {
    let (master, vector) = tokio::join!(parts.ping(), contracts.ping());

    let supabase = match master {
        Ok(()) => DependencyStatus::connected(),
        Err(e) => {
            warn!(error = %e, "master file health check failed");
            DependencyStatus::failed(e)
        }
    };
    let astra = match vector {
        Ok(_) => DependencyStatus::connected(),
        Err(e) => {
            warn!(error = %e, "vector store health check failed");
            DependencyStatus::failed(e)
        }
    };
    Databases { supabase, astra }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{FakeContracts, FakeParts};

    #[tokio::test]
    async fn healthy_stores_report_connected() {
        let dbs = check_databases(&FakeParts::acme(), &FakeContracts::with_docs(1)).await;
        assert!(dbs.all_connected());
        assert_eq!(dbs.supabase.status, "connected");
    }

    #[tokio::test]
    async fn failing_store_reports_error() {
        let mut parts = FakeParts::acme();
        parts.fail = true;
        let dbs = check_databases(&parts, &FakeContracts::with_docs(1)).await;
        assert!(!dbs.all_connected());
        assert_eq!(dbs.supabase.status, "error");
        assert_eq!(dbs.supabase.error.as_deref(), Some("down"));
        assert!(dbs.astra.is_connected());
    }
}
