//! Analysis schema: what the model is asked to return and what clients receive.
//!
//! The model output is kept as loose JSON and copied through section by
//! section. The typed section structs describe the documented schema and are
//! used to build placeholder analyses with a guaranteed shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::part::Part;

/// Model-reported date range key, surfaced in the supplier overview.
pub const DATE_RANGE_KEY: &str = "dateRangeOfContracts";

/// Text used when the model did not report a date range.
pub const DATE_RANGE_UNSPECIFIED: &str = "Not specified";

pub const KEY_CLAUSES: &str = "keyClausesIdentification";
pub const RISK_ASSESSMENT: &str = "riskAssessmentAndMitigation";
pub const BENCHMARKING: &str = "contractBenchmarkingAndPrecedentBasedInsights";
pub const NEGOTIATION_LEVERAGE: &str = "negotiationLeveragePoints";
pub const COMPLIANCE_CHECK: &str = "complianceCheck";
pub const STRATEGIC_SUMMARY: &str = "summaryAndStrategicRecommendations";

/// The six analysis sections, in response order.
pub const SECTION_KEYS: [&str; 6] = [
    KEY_CLAUSES,
    RISK_ASSESSMENT,
    BENCHMARKING,
    NEGOTIATION_LEVERAGE,
    COMPLIANCE_CHECK,
    STRATEGIC_SUMMARY,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyClauses {
    pub confidentiality: String,
    pub termination_conditions: String,
    pub payment_terms: String,
    pub liabilities_and_indemnities: String,
    #[serde(rename = "penaltiesAndSLAs")]
    pub penalties_and_slas: String,
    pub dispute_resolution: String,
}

impl KeyClauses {
    /// Every clause explained with the same text.
    pub fn uniform(text: &str) -> Self {
        Self {
            confidentiality: text.into(),
            termination_conditions: text.into(),
            payment_terms: text.into(),
            liabilities_and_indemnities: text.into(),
            penalties_and_slas: text.into(),
            dispute_resolution: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub identified_risks: Vec<String>,
    pub recommendations_to_mitigate_risks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Benchmarking {
    pub industry_benchmark_comparison: String,
    pub insights_from_previous_negotiations: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationLeverage {
    pub key_leverage_points: Vec<String>,
    pub recommended_negotiation_tactics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceCheck {
    pub regulatory_compliance_status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicSummary {
    pub key_insights: Vec<String>,
    pub recommended_actions: Vec<String>,
    pub next_steps: Vec<String>,
}

/// The full object the model is instructed to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelAnalysis {
    pub date_range_of_contracts: String,
    pub key_clauses_identification: KeyClauses,
    pub risk_assessment_and_mitigation: RiskAssessment,
    pub contract_benchmarking_and_precedent_based_insights: Benchmarking,
    pub negotiation_leverage_points: NegotiationLeverage,
    pub compliance_check: ComplianceCheck,
    pub summary_and_strategic_recommendations: StrategicSummary,
}

impl ModelAnalysis {
    /// As a JSON object map, the form raw model output takes.
    pub fn into_map(self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // A struct of strings and string lists always serialises to an object.
            _ => Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierContact {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierOverview {
    pub supplier_name: String,
    pub supplier_number: Option<String>,
    pub supplier_contact: SupplierContact,
    pub manufacturing_location: Option<String>,
    pub number_of_contracts_found: usize,
    pub date_range_of_contracts: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartInformation {
    pub part_number: String,
    pub part_name: Option<String>,
    pub material: Option<String>,
    pub material2: Option<String>,
    pub currency: Option<String>,
}

/// Final payload returned to clients. Every key is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub supplier_overview: SupplierOverview,
    pub part_information: PartInformation,
    pub key_clauses_identification: Value,
    pub risk_assessment_and_mitigation: Value,
    pub contract_benchmarking_and_precedent_based_insights: Value,
    pub negotiation_leverage_points: Value,
    pub compliance_check: Value,
    pub summary_and_strategic_recommendations: Value,
}

impl AnalysisResult {
    /// Shape the final payload from the part, the contract count and raw model output.
    ///
    /// Sections are copied verbatim. A section that is missing or null becomes `{}`.
    pub fn assemble(part: &Part, contracts_found: usize, model: &Map<String, Value>) -> Self {
        let record = &part.record;
        let supplier = &record.supplier;

        let date_range = match model.get(DATE_RANGE_KEY) {
            None | Some(Value::Null) => Value::String(DATE_RANGE_UNSPECIFIED.into()),
            Some(Value::String(s)) if s.trim().is_empty() => {
                Value::String(DATE_RANGE_UNSPECIFIED.into())
            }
            Some(v) => v.clone(),
        };

        let section = |key: &str| match model.get(key) {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(v) => v.clone(),
        };

        Self {
            supplier_overview: SupplierOverview {
                supplier_name: supplier.name.clone(),
                supplier_number: supplier.number.clone(),
                supplier_contact: SupplierContact {
                    name: supplier.contact_name.clone(),
                    email: supplier.contact_email.clone(),
                },
                manufacturing_location: supplier.manufacturing_location.clone(),
                number_of_contracts_found: contracts_found,
                date_range_of_contracts: date_range,
            },
            part_information: PartInformation {
                part_number: record.part_number.clone(),
                part_name: record.part_name.clone(),
                material: record.material.clone(),
                material2: record.material2.clone(),
                currency: record.currency.clone(),
            },
            key_clauses_identification: section(KEY_CLAUSES),
            risk_assessment_and_mitigation: section(RISK_ASSESSMENT),
            contract_benchmarking_and_precedent_based_insights: section(BENCHMARKING),
            negotiation_leverage_points: section(NEGOTIATION_LEVERAGE),
            compliance_check: section(COMPLIANCE_CHECK),
            summary_and_strategic_recommendations: section(STRATEGIC_SUMMARY),
        }
    }

    /// Section value by its response key.
    pub fn section(&self, key: &str) -> Option<&Value> {
        match key {
            KEY_CLAUSES => Some(&self.key_clauses_identification),
            RISK_ASSESSMENT => Some(&self.risk_assessment_and_mitigation),
            BENCHMARKING => Some(&self.contract_benchmarking_and_precedent_based_insights),
            NEGOTIATION_LEVERAGE => Some(&self.negotiation_leverage_points),
            COMPLIANCE_CHECK => Some(&self.compliance_check),
            STRATEGIC_SUMMARY => Some(&self.summary_and_strategic_recommendations),
            _ => None,
        }
    }
}
