//! Part number validation and normalisation.
//!
//! Company part numbers have the fixed shape `PA-NNNNN`: the literal prefix
//! `PA-` followed by exactly five ASCII digits, eight characters in total.
//!
//! Normalisation (trim + uppercase) and validation are separate steps.
//! [`normalize`] never rejects a shape; [`validate`] never rewrites its input.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Literal prefix every part number starts with.
pub const PREFIX: &str = "PA-";

/// Number of digits after the prefix.
pub const SUFFIX_DIGITS: usize = 5;

/// Total length of a well-formed part number.
pub const PART_NUMBER_LEN: usize = PREFIX.len() + SUFFIX_DIGITS;

/// Human-readable format hint used in error responses.
pub const EXPECTED_FORMAT: &str = "PA-XXXXX (where XXXXX is a 5-digit number)";

/// Largest value representable in the five-digit suffix.
pub const MAX_NUMERIC: u32 = 99_999;

/// Why a candidate part number was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartNumberError {
    #[error("Part number must be a non-empty string")]
    Empty,
    #[error("Part number must start with \"PA-\" prefix")]
    MissingPrefix,
    #[error("Part number must be exactly 8 characters long (got {0})")]
    WrongLength(usize),
    #[error("Part number suffix must be exactly 5 digits")]
    NonDigitSuffix,
    #[error("Numeric value must be an integer between 0 and 99999 (got {0})")]
    OutOfRange(u32),
}

/// Outcome of [`validate`]: a verdict plus a reason suitable for end users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub is_valid: bool,
    pub message: String,
}

/// A part number that has passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartNumber(String);

impl PartNumber {
    /// Normalise then validate raw input.
    pub fn parse(raw: &str) -> Result<Self, PartNumberError> {
        let normalized = normalize(raw).ok_or(PartNumberError::Empty)?;
        check(&normalized)?;
        Ok(Self(normalized))
    }

    /// Build `PA-NNNNN` from its numeric suffix, zero-padded.
    pub fn from_numeric(value: u32) -> Result<Self, PartNumberError> {
        if value > MAX_NUMERIC {
            return Err(PartNumberError::OutOfRange(value));
        }
        Ok(Self(format!("{PREFIX}{value:05}")))
    }

    /// The five-digit suffix as an integer (`PA-00042` → 42).
    pub fn numeric(&self) -> u32 {
        // Shape was checked on construction.
        self.0[PREFIX.len()..].parse().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PartNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PartNumber {
    type Error = PartNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PartNumber> for String {
    fn from(value: PartNumber) -> Self {
        value.0
    }
}

/// Trim surrounding whitespace and uppercase.
///
/// Returns `None` for empty (or all-whitespace) input. Does not check the
/// `PA-NNNNN` shape; pair with [`validate`].
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_uppercase())
}

/// Check `candidate` against the `PA-NNNNN` shape without rewriting it.
pub fn check(candidate: &str) -> Result<(), PartNumberError> {
    if candidate.is_empty() {
        return Err(PartNumberError::Empty);
    }
    if !candidate.starts_with(PREFIX) {
        return Err(PartNumberError::MissingPrefix);
    }
    // Length in characters, matching what a user sees.
    let len = candidate.chars().count();
    if len != PART_NUMBER_LEN {
        return Err(PartNumberError::WrongLength(len));
    }
    let suffix = &candidate[PREFIX.len()..];
    if suffix.len() != SUFFIX_DIGITS || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PartNumberError::NonDigitSuffix);
    }
    Ok(())
}

/// Validate `candidate`, reporting which rule was violated.
pub fn validate(candidate: &str) -> Validation {
    match check(candidate) {
        Ok(()) => Validation {
            is_valid: true,
            message: "Part number format is valid".to_string(),
        },
        Err(e) => Validation {
            is_valid: false,
            message: e.to_string(),
        },
    }
}

/// Numeric suffix of a valid part number, `None` otherwise.
pub fn numeric_suffix(candidate: &str) -> Option<u32> {
    check(candidate).ok()?;
    candidate[PREFIX.len()..].parse().ok()
}

/// True when `candidate` matches `^PA-\d{5}$` exactly.
pub fn matches_pattern(candidate: &str) -> bool {
    check(candidate).is_ok()
}
