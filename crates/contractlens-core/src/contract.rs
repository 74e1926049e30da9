//! Contract text chunks retrieved from the vector store.

use serde::{Deserialize, Serialize};

/// Best-effort details pattern-matched out of a contract chunk.
///
/// Advisory only: nothing filters or ranks on these fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMetadata {
    pub id: Option<String>,
    /// ISO 8601 timestamp of when the chunk was retrieved.
    pub timestamp: String,
    pub content_length: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contract_numbers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amounts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// One retrieved unit of contract text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDocument {
    pub id: Option<String>,
    pub content: String,
    /// Service-provided similarity; 0 when the service omits it.
    pub similarity: f64,
    pub metadata: ContractMetadata,
}

impl ContractDocument {
    /// Content cut to at most `max_chars` characters, with `...` appended when cut.
    pub fn excerpt(&self, max_chars: usize) -> String {
        match self.content.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => format!("{}...", &self.content[..byte_idx]),
            None => self.content.clone(),
        }
    }
}
