//! Pattern-matched hints pulled from contract text: dates, contract numbers, amounts.
//!
//! The heuristics are deliberately loose. Results are advisory and never
//! drive filtering or ranking.

use std::sync::LazyLock;

use contractlens_core::ContractMetadata;
use regex::Regex;
use serde_json::Value;

const MAX_DATES: usize = 3;
const MAX_CONTRACT_NUMBERS: usize = 3;
const MAX_AMOUNTS: usize = 5;

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}|\d{4}[/\-]\d{1,2}[/\-]\d{1,2}")
        .unwrap_or_else(|e| panic!("invalid date pattern: {e}"))
});

static CONTRACT_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:contract|agreement|ref|no\.?)[\s:]*[A-Z0-9\-_]+")
        .unwrap_or_else(|e| panic!("invalid contract number pattern: {e}"))
});

static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:€|EUR|USD|\$)\s*[\d,]+\.?\d*")
        .unwrap_or_else(|e| panic!("invalid amount pattern: {e}"))
});

/// Extract metadata for one retrieved record.
///
/// `record` is the raw document as returned by the vector store; only
/// `metadata.file_path` is read from it.
pub fn extract_metadata(
    id: Option<&str>,
    content: &str,
    record: &Value,
    retrieved_at: &str,
) -> ContractMetadata {
    ContractMetadata {
        id: id.map(String::from),
        timestamp: retrieved_at.to_string(),
        content_length: content.chars().count(),
        dates: first_matches(&DATE, content, MAX_DATES),
        contract_numbers: first_matches(&CONTRACT_NUMBER, content, MAX_CONTRACT_NUMBERS),
        amounts: first_matches(&AMOUNT, content, MAX_AMOUNTS),
        file_path: record
            .pointer("/metadata/file_path")
            .and_then(Value::as_str)
            .map(String::from),
    }
}

fn first_matches(re: &Regex, text: &str, limit: usize) -> Vec<String> {
    re.find_iter(text)
        .take(limit)
        .map(|m| m.as_str().to_string())
        .collect()
}
