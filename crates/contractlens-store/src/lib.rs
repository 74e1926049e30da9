//! Storage layer: the part master file (PostgREST, DuckDB) and the contract vector store.

mod error;
pub mod metadata;
pub mod rest;
pub mod supplier;
pub mod vector;

#[cfg(feature = "duckdb")]
mod duck;

use async_trait::async_trait;
use contractlens_core::{ContractDocument, Part, PartRecord};
use tracing::{debug, info, warn};

pub use error::StoreError;
pub use rest::RestPartStore;
pub use supplier::{PartSummary, SupplierStatistics};
pub use vector::{ProbeReport, RetrievalScope, VectorContractStore};

#[cfg(feature = "duckdb")]
pub use duck::DuckPartStore;

/// Maximum number of contract documents requested per supplier.
pub const CONTRACT_PAGE_SIZE: usize = 50;

/// Read access to the part master file.
#[async_trait]
pub trait PartSource: Send + Sync {
    /// Raw record for an exact, already-normalised part number.
    async fn fetch_record(&self, part_number: &str) -> Result<Option<PartRecord>, StoreError>;

    /// Parts whose supplier name contains `supplier`, case-insensitively.
    async fn parts_by_supplier(&self, supplier: &str) -> Result<Vec<PartSummary>, StoreError>;

    /// Cheap connectivity check.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Record plus derived pricing and trend views. `Ok(None)` when no row matches.
    async fn fetch_part(&self, part_number: &str) -> Result<Option<Part>, StoreError> {
        match self.fetch_record(part_number).await? {
            Some(record) => {
                debug!(part_number, supplier = %record.supplier.name, "part found");
                Ok(Some(Part::from_record(record)))
            }
            None => {
                info!(part_number, "part not found");
                Ok(None)
            }
        }
    }

    /// Aggregate view over a supplier's parts. `Ok(None)` when the supplier has none.
    async fn supplier_statistics(
        &self,
        supplier: &str,
    ) -> Result<Option<SupplierStatistics>, StoreError> {
        let parts = self.parts_by_supplier(supplier).await?;
        Ok(SupplierStatistics::from_parts(supplier, &parts))
    }
}

/// Read access to the contract vector collection.
#[async_trait]
pub trait ContractSource: Send + Sync {
    /// Up to `limit` contract chunks relevant to `supplier`.
    async fn find_contracts(
        &self,
        supplier: &str,
        limit: usize,
    ) -> Result<Vec<ContractDocument>, StoreError>;

    /// Unscoped page of the collection.
    async fn all_contracts(&self, limit: usize) -> Result<Vec<ContractDocument>, StoreError>;

    /// Connectivity check against the collection.
    async fn ping(&self) -> Result<ProbeReport, StoreError>;

    /// Contracts for `supplier`, degrading any failure to an empty list.
    async fn fetch_contracts(&self, supplier: &str) -> Vec<ContractDocument> {
        match self.find_contracts(supplier, CONTRACT_PAGE_SIZE).await {
            Ok(docs) => {
                info!(supplier, count = docs.len(), "retrieved contract documents");
                docs
            }
            Err(e) => {
                warn!(supplier, error = %e, "contract retrieval failed, continuing with none");
                Vec::new()
            }
        }
    }
}
