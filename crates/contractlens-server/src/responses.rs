//! Response bodies for the JSON API.

use contractlens_core::AnalysisResult;
use contractlens_core::part_number::{PART_NUMBER_LEN, PREFIX};
use serde::Serialize;

use crate::health::Databases;

pub const SERVICE_NAME: &str = "contractlens";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub part_number: String,
    pub timestamp: String,
    pub analysis: AnalysisResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub part_number: String,
    pub status: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupportedFormat {
    pub pattern: &'static str,
    pub description: &'static str,
    pub examples: [&'static str; 3],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    pub prefix: &'static str,
    pub suffix: &'static str,
    pub total_length: usize,
    pub regex: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatsResponse {
    pub supported_formats: Vec<SupportedFormat>,
    pub validation_rules: ValidationRules,
}

impl FormatsResponse {
    pub fn part_numbers() -> Self {
        Self {
            supported_formats: vec![SupportedFormat {
                pattern: "PA-XXXXX",
                description: "Company part numbers where XXXXX is a 5-digit number",
                examples: ["PA-10183", "PA-20045", "PA-99999"],
            }],
            validation_rules: ValidationRules {
                prefix: PREFIX,
                suffix: "5-digit number",
                total_length: PART_NUMBER_LEN,
                regex: r"/^PA-\d{5}$/",
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    pub health: &'static str,
    pub contract_analysis: &'static str,
    pub formats: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Banner {
    pub message: String,
    pub version: &'static str,
    pub status: &'static str,
    pub endpoints: Endpoints,
}

impl Banner {
    pub fn current() -> Self {
        Self {
            message: format!("{SERVICE_NAME} contract analysis API"),
            version: VERSION,
            status: "running",
            endpoints: Endpoints {
                health: "/api/health",
                contract_analysis: "/api/contracts/analyze",
                formats: "/api/contracts/formats",
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
    pub version: &'static str,
    pub databases: Databases,
    /// Seconds since start-up.
    pub uptime: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub uptime: f64,
    pub platform: &'static str,
    pub arch: &'static str,
    pub pid: u32,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
    pub version: &'static str,
    pub environment: &'static str,
    pub databases: Databases,
    pub system: SystemInfo,
}
