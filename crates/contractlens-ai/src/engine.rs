//! Contract analysis: prompt, single generation call, strict parse, fallbacks.

use std::fmt;
use std::sync::Arc;

use contractlens_core::analysis::{
    Benchmarking, ComplianceCheck, KeyClauses, NegotiationLeverage, RiskAssessment,
    StrategicSummary,
};
use contractlens_core::{ContractDocument, ModelAnalysis, Part};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::generator::{GenerationRequest, TextGenerator};
use crate::prompt::{SYSTEM_PROMPT, build_prompt};

pub const TEMPERATURE: f32 = 0.3;
pub const MAX_TOKENS: u32 = 4000;

/// Why an analysis is a placeholder rather than model output.
#[derive(Debug, Clone, PartialEq)]
pub enum DegradedReason {
    /// The model replied, but not with a JSON object.
    Unparseable,
    /// The generation call itself failed.
    GenerationFailed(String),
}

impl fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unparseable => f.write_str("model output was not a JSON object"),
            Self::GenerationFailed(msg) => write!(f, "generation failed: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// Parsed model output, passed through as-is.
    Complete(Map<String, Value>),
    /// Placeholder with the full documented shape.
    Degraded {
        analysis: Map<String, Value>,
        reason: DegradedReason,
    },
}

impl AnalysisOutcome {
    pub fn analysis(&self) -> &Map<String, Value> {
        match self {
            Self::Complete(a) | Self::Degraded { analysis: a, .. } => a,
        }
    }

    pub fn into_parts(self) -> (Map<String, Value>, Option<DegradedReason>) {
        match self {
            Self::Complete(a) => (a, None),
            Self::Degraded { analysis, reason } => (analysis, Some(reason)),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Runs one analysis per call against a shared generator.
#[derive(Clone)]
pub struct AnalysisEngine {
    generator: Arc<dyn TextGenerator>,
}

impl AnalysisEngine {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &Arc<dyn TextGenerator> {
        &self.generator
    }

    /// Analyse `contracts` for `part`. Never fails: problems yield a degraded outcome.
    pub async fn analyze(&self, part: &Part, contracts: &[ContractDocument]) -> AnalysisOutcome {
        let part_number = &part.record.part_number;
        info!(
            part_number = %part_number,
            contracts = contracts.len(),
            model = self.generator.model(),
            "starting contract analysis"
        );

        let request = GenerationRequest {
            system_prompt: Some(SYSTEM_PROMPT.to_string()),
            user_prompt: build_prompt(part, contracts),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            json_object: true,
        };

        let text = match self.generator.generate(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(part_number = %part_number, error = %e, "generation failed, using fallback");
                return AnalysisOutcome::Degraded {
                    analysis: unavailable_analysis().into_map(),
                    reason: DegradedReason::GenerationFailed(e.to_string()),
                };
            }
        };

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => {
                info!(part_number = %part_number, "analysis completed");
                AnalysisOutcome::Complete(map)
            }
            Ok(_) | Err(_) => {
                let preview: String = text.chars().take(200).collect();
                warn!(part_number = %part_number, raw = %preview, "model output is not a JSON object");
                AnalysisOutcome::Degraded {
                    analysis: placeholder_analysis().into_map(),
                    reason: DegradedReason::Unparseable,
                }
            }
        }
    }
}

/// Placeholder used when the model reply cannot be parsed.
pub fn placeholder_analysis() -> ModelAnalysis {
    const TEXT: &str = "Analysis completed";
    let list = || vec![TEXT.to_string()];
    ModelAnalysis {
        date_range_of_contracts: TEXT.into(),
        key_clauses_identification: KeyClauses::uniform(TEXT),
        risk_assessment_and_mitigation: RiskAssessment {
            identified_risks: list(),
            recommendations_to_mitigate_risks: list(),
        },
        contract_benchmarking_and_precedent_based_insights: Benchmarking {
            industry_benchmark_comparison: TEXT.into(),
            insights_from_previous_negotiations: TEXT.into(),
        },
        negotiation_leverage_points: NegotiationLeverage {
            key_leverage_points: list(),
            recommended_negotiation_tactics: list(),
        },
        compliance_check: ComplianceCheck {
            regulatory_compliance_status: TEXT.into(),
        },
        summary_and_strategic_recommendations: StrategicSummary {
            key_insights: list(),
            recommended_actions: list(),
            next_steps: list(),
        },
    }
}

/// Placeholder used when the generation call fails.
pub fn unavailable_analysis() -> ModelAnalysis {
    const TEXT: &str = "Analysis temporarily unavailable";
    const SERVICE_DOWN: &str = "AI analysis service temporarily unavailable";
    ModelAnalysis {
        date_range_of_contracts: "Unable to determine from available data".into(),
        key_clauses_identification: KeyClauses::uniform(TEXT),
        risk_assessment_and_mitigation: RiskAssessment {
            identified_risks: vec![SERVICE_DOWN.into()],
            recommendations_to_mitigate_risks: vec![
                "Please retry the analysis or contact support".into(),
            ],
        },
        contract_benchmarking_and_precedent_based_insights: Benchmarking {
            industry_benchmark_comparison: TEXT.into(),
            insights_from_previous_negotiations: TEXT.into(),
        },
        negotiation_leverage_points: NegotiationLeverage {
            key_leverage_points: vec![TEXT.into()],
            recommended_negotiation_tactics: vec![TEXT.into()],
        },
        compliance_check: ComplianceCheck {
            regulatory_compliance_status: TEXT.into(),
        },
        summary_and_strategic_recommendations: StrategicSummary {
            key_insights: vec![SERVICE_DOWN.into()],
            recommended_actions: vec!["Retry the analysis".into()],
            next_steps: vec!["Contact support if the issue persists".into()],
        },
    }
}
