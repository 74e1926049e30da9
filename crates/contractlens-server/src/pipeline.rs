//! The analysis pipeline: validate, look up the part, retrieve contracts, analyse, assemble.

use std::sync::Arc;

use chrono::Utc;
use contractlens_ai::{AnalysisEngine, DegradedReason};
use contractlens_core::{AnalysisResult, PartNumber, part_number};
use contractlens_store::{ContractSource, PartSource, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid part number format: {0}")]
    InvalidFormat(String),

    #[error("Part number {0} not found in MASTER_FILE table")]
    PartNotFound(String),

    #[error("Supplier information missing for part number {0}")]
    SupplierNotFound(String),

    #[error("No contracts found for supplier: {0}")]
    ContractsNotFound(String),

    #[error(transparent)]
    Upstream(#[from] StoreError),
}

impl PipelineError {
    /// Stable tag for clients and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "INVALID_FORMAT",
            Self::PartNotFound(_) => "PART_NOT_FOUND",
            Self::SupplierNotFound(_) => "SUPPLIER_NOT_FOUND",
            Self::ContractsNotFound(_) => "CONTRACTS_NOT_FOUND",
            Self::Upstream(_) => "UPSTREAM_FAILURE",
        }
    }
}

/// A finished analysis, flagged when the model output was replaced by a placeholder.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: AnalysisResult,
    pub degraded: Option<DegradedReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub part_number: String,
    pub supplier_name: String,
    pub last_updated: String,
    pub analysis_status: &'static str,
}

/// Orchestrates one analysis per call. Cheap to share behind an `Arc`.
pub struct Pipeline {
    parts: Arc<dyn PartSource>,
    contracts: Arc<dyn ContractSource>,
    engine: AnalysisEngine,
}

impl Pipeline {
    pub fn new(
        parts: Arc<dyn PartSource>,
        contracts: Arc<dyn ContractSource>,
        engine: AnalysisEngine,
    ) -> Self {
        Self {
            parts,
            contracts,
            engine,
        }
    }

    pub fn parts(&self) -> &Arc<dyn PartSource> {
        &self.parts
    }

    pub fn contracts(&self) -> &Arc<dyn ContractSource> {
        &self.contracts
    }

    pub fn engine(&self) -> &AnalysisEngine {
        &self.engine
    }

    /// Run the full analysis for a raw part number.
    ///
    /// Stages run in order and the first failure ends the run.
    pub async fn analyze_contract(&self, raw: &str) -> Result<Analysis, PipelineError> {
        let part_number = parse(raw)?;
        let pn = part_number.as_str();

        info!(part_number = pn, "retrieving part information");
        let part = self
            .parts
            .fetch_part(pn)
            .await?
            .ok_or_else(|| PipelineError::PartNotFound(pn.to_string()))?;

        let supplier = part.supplier().name.trim().to_string();
        if supplier.is_empty() {
            return Err(PipelineError::SupplierNotFound(pn.to_string()));
        }
        info!(part_number = pn, supplier = %supplier, "found supplier");

        let contracts = self.contracts.fetch_contracts(&supplier).await;
        if contracts.is_empty() {
            return Err(PipelineError::ContractsNotFound(supplier));
        }
        info!(part_number = pn, count = contracts.len(), "found contracts for analysis");

        let outcome = self.engine.analyze(&part, &contracts).await;
        let (model, degraded) = outcome.into_parts();
        if let Some(reason) = &degraded {
            warn!(part_number = pn, reason = %reason, "analysis degraded");
        }

        let result = AnalysisResult::assemble(&part, contracts.len(), &model);
        info!(part_number = pn, "analysis completed");
        Ok(Analysis { result, degraded })
    }

    /// Lightweight availability record for a part, without running an analysis.
    pub async fn analysis_metadata(
        &self,
        raw: &str,
    ) -> Result<Option<AnalysisMetadata>, PipelineError> {
        let part_number = parse(raw)?;
        let part = self.parts.fetch_part(part_number.as_str()).await?;
        Ok(part.map(|p| AnalysisMetadata {
            part_number: part_number.to_string(),
            supplier_name: p.record.supplier.name,
            last_updated: Utc::now().to_rfc3339(),
            analysis_status: "available",
        }))
    }
}

fn parse(raw: &str) -> Result<PartNumber, PipelineError> {
    let normalized =
        part_number::normalize(raw).ok_or_else(|| PipelineError::InvalidFormat(raw.to_string()))?;
    PartNumber::parse(&normalized).map_err(|e| PipelineError::InvalidFormat(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use contractlens_ai::{GenerationError, GenerationRequest, TextGenerator};
    use contractlens_core::analysis::SECTION_KEYS;
    use contractlens_core::{ContractDocument, ContractMetadata, PartRecord};
    use contractlens_store::{PartSummary, ProbeReport};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Master file holding a fixed set of rows.
    pub(crate) struct FakeParts {
        pub rows: Vec<Value>,
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    impl FakeParts {
        pub fn with_rows(rows: Vec<Value>) -> Self {
            Self {
                rows,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn acme() -> Self {
            Self::with_rows(vec![json!({
                "PartNumber": "PA-10183",
                "partname": "Hydraulic valve",
                "material": "Steel",
                "currency": "EUR",
                "suppliername": "Acme Corp",
                "suppliernumber": "S-1",
                "suppliercontactname": "Jane Roe",
                "suppliercontactemail": "jane@acme.example",
                "suppliermanufacturinglocation": "Lyon, FR",
                "pricejun2024": 120,
            })])
        }
    }

    #[async_trait]
    impl PartSource for FakeParts {
        async fn fetch_record(&self, part_number: &str) -> Result<Option<PartRecord>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Server {
                    status: 500,
                    body: "relation does not exist".into(),
                });
            }
            let row = self
                .rows
                .iter()
                .find(|r| r["PartNumber"] == part_number)
                .and_then(Value::as_object);
            Ok(match row {
                Some(r) => Some(PartRecord::from_columns(r)?),
                None => None,
            })
        }

        async fn parts_by_supplier(&self, _supplier: &str) -> Result<Vec<PartSummary>, StoreError> {
            Ok(Vec::new())
        }

        async fn ping(&self) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Other("down".into()));
            }
            Ok(())
        }
    }

    pub(crate) struct FakeContracts {
        pub docs: usize,
        pub calls: AtomicUsize,
    }

    impl FakeContracts {
        pub fn with_docs(docs: usize) -> Self {
            Self {
                docs,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContractSource for FakeContracts {
        async fn find_contracts(
            &self,
            supplier: &str,
            _limit: usize,
        ) -> Result<Vec<ContractDocument>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((0..self.docs)
                .map(|i| ContractDocument {
                    id: Some(format!("doc-{i}")),
                    content: format!("Supply agreement {i} with {supplier}. Payment net 30."),
                    similarity: 0.9,
                    metadata: ContractMetadata::default(),
                })
                .collect())
        }

        async fn all_contracts(&self, _limit: usize) -> Result<Vec<ContractDocument>, StoreError> {
            Ok(Vec::new())
        }

        async fn ping(&self) -> Result<ProbeReport, StoreError> {
            Ok(ProbeReport {
                endpoint: "memory://contracts".into(),
                records: self.docs.min(1),
            })
        }
    }

    pub(crate) struct FakeGenerator {
        pub reply: Option<String>,
        pub calls: AtomicUsize,
    }

    impl FakeGenerator {
        pub fn replying(reply: Value) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn raw(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                reply: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .ok_or_else(|| GenerationError::Outage("503 Service Unavailable".into()))
        }

        fn model(&self) -> &str {
            "fake"
        }
    }

    pub(crate) fn model_reply() -> Value {
        json!({
            "dateRangeOfContracts": "2021-2024",
            "keyClausesIdentification": {"paymentTerms": "Net 30", "confidentiality": "Mutual NDA"},
            "riskAssessmentAndMitigation": {"identifiedRisks": ["Single source"], "recommendationsToMitigateRisks": ["Dual source"]},
            "contractBenchmarkingAndPrecedentBasedInsights": {"industryBenchmarkComparison": "In line"},
            "negotiationLeveragePoints": {"keyLeveragePoints": ["Volume growth"]},
            "complianceCheck": {"regulatoryComplianceStatus": "Compliant"},
            "summaryAndStrategicRecommendations": {"keyInsights": ["Stable pricing"]}
        })
    }

    struct Harness {
        parts: Arc<FakeParts>,
        contracts: Arc<FakeContracts>,
        generator: Arc<FakeGenerator>,
        pipeline: Pipeline,
    }

    fn harness(parts: FakeParts, contracts: FakeContracts, generator: FakeGenerator) -> Harness {
        let parts = Arc::new(parts);
        let contracts = Arc::new(contracts);
        let generator = Arc::new(generator);
        let pipeline = Pipeline::new(
            parts.clone(),
            contracts.clone(),
            AnalysisEngine::new(generator.clone()),
        );
        Harness {
            parts,
            contracts,
            generator,
            pipeline,
        }
    }

    #[tokio::test]
    async fn full_analysis_copies_sections() {
        let h = harness(
            FakeParts::acme(),
            FakeContracts::with_docs(3),
            FakeGenerator::replying(model_reply()),
        );
        let analysis = h.pipeline.analyze_contract(" pa-10183 ").await.unwrap();
        assert!(analysis.degraded.is_none());

        let result = analysis.result;
        assert_eq!(result.supplier_overview.supplier_name, "Acme Corp");
        assert_eq!(result.supplier_overview.number_of_contracts_found, 3);
        assert_eq!(result.supplier_overview.date_range_of_contracts, json!("2021-2024"));
        assert_eq!(result.part_information.part_number, "PA-10183");
        assert_eq!(result.part_information.material2, None);

        let reply = model_reply();
        for key in SECTION_KEYS {
            assert_eq!(result.section(key), Some(&reply[key]), "section {key}");
        }
    }

    #[tokio::test]
    async fn invalid_format_touches_nothing() {
        let h = harness(
            FakeParts::acme(),
            FakeContracts::with_docs(3),
            FakeGenerator::replying(model_reply()),
        );
        for raw in ["", "   ", "BAD-1", "PA-1018A"] {
            let err = h.pipeline.analyze_contract(raw).await.unwrap_err();
            assert_eq!(err.code(), "INVALID_FORMAT", "{raw:?}");
        }
        assert_eq!(h.parts.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_part_stops_before_retrieval() {
        let h = harness(
            FakeParts::acme(),
            FakeContracts::with_docs(3),
            FakeGenerator::replying(model_reply()),
        );
        let err = h.pipeline.analyze_contract("PA-99999").await.unwrap_err();
        assert!(matches!(err, PipelineError::PartNotFound(ref pn) if pn == "PA-99999"));
        assert_eq!(h.contracts.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_supplier_is_supplier_not_found() {
        let parts = FakeParts::with_rows(vec![json!({"PartNumber": "PA-00001", "suppliername": "  "})]);
        let h = harness(parts, FakeContracts::with_docs(3), FakeGenerator::replying(model_reply()));
        let err = h.pipeline.analyze_contract("PA-00001").await.unwrap_err();
        assert_eq!(err.code(), "SUPPLIER_NOT_FOUND");
        assert_eq!(h.contracts.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_contracts_stops_before_analysis() {
        let h = harness(
            FakeParts::acme(),
            FakeContracts::with_docs(0),
            FakeGenerator::replying(model_reply()),
        );
        let err = h.pipeline.analyze_contract("PA-10183").await.unwrap_err();
        assert!(matches!(err, PipelineError::ContractsNotFound(ref s) if s == "Acme Corp"));
        assert_eq!(err.to_string(), "No contracts found for supplier: Acme Corp");
        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_failure_is_upstream() {
        let mut parts = FakeParts::acme();
        parts.fail = true;
        let h = harness(parts, FakeContracts::with_docs(3), FakeGenerator::replying(model_reply()));
        let err = h.pipeline.analyze_contract("PA-10183").await.unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_FAILURE");
        assert!(err.to_string().contains("relation does not exist"));
    }

    #[tokio::test]
    async fn generation_failure_still_succeeds() {
        let h = harness(FakeParts::acme(), FakeContracts::with_docs(2), FakeGenerator::failing());
        let analysis = h.pipeline.analyze_contract("PA-10183").await.unwrap();
        assert!(matches!(analysis.degraded, Some(DegradedReason::GenerationFailed(_))));
        assert_eq!(
            analysis.result.supplier_overview.date_range_of_contracts,
            json!("Unable to determine from available data")
        );
        assert_eq!(
            analysis.result.compliance_check,
            json!({"regulatoryComplianceStatus": "Analysis temporarily unavailable"})
        );
    }

    #[tokio::test]
    async fn non_json_reply_still_succeeds() {
        let h = harness(FakeParts::acme(), FakeContracts::with_docs(1), FakeGenerator::raw("Looks fine to me."));
        let analysis = h.pipeline.analyze_contract("PA-10183").await.unwrap();
        assert_eq!(analysis.degraded, Some(DegradedReason::Unparseable));
        assert_eq!(
            analysis.result.key_clauses_identification["paymentTerms"],
            "Analysis completed"
        );
    }

    #[tokio::test]
    async fn metadata_for_known_part() {
        let h = harness(FakeParts::acme(), FakeContracts::with_docs(0), FakeGenerator::failing());
        let meta = h.pipeline.analysis_metadata("pa-10183").await.unwrap().unwrap();
        assert_eq!(meta.part_number, "PA-10183");
        assert_eq!(meta.supplier_name, "Acme Corp");
        assert_eq!(meta.analysis_status, "available");

        assert!(h.pipeline.analysis_metadata("PA-55555").await.unwrap().is_none());
    }
}
