//! Human-readable request reference numbers (`PREFIX-YEAR-NNNN`).
//!
//! The sequence part is allocated by the store from a per-year counter; this
//! module only formats, validates and parses the resulting strings.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::CoreError;

/// Default prefix when `REQUEST_NUMBER_PREFIX` is not configured.
pub const DEFAULT_PREFIX: &str = "REQ";

/// Minimum width of the zero-padded sequence part.
const SEQUENCE_WIDTH: usize = 4;

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Z]+)-(\d{4})-(\d{4,})$").expect("reference number regex is valid")
    })
}

/// A parsed reference number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceNumber {
    pub prefix: String,
    pub year: i32,
    pub sequence: i64,
}

impl ReferenceNumber {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::Validation(format!("Invalid reference number '{value}'"));
        let caps = reference_regex().captures(value).ok_or_else(invalid)?;
        Ok(Self {
            prefix: caps[1].to_string(),
            year: caps[2].parse().map_err(|_| invalid())?,
            sequence: caps[3].parse().map_err(|_| invalid())?,
        })
    }
}

/// Validate a configured prefix: one or more ASCII uppercase letters.
pub fn validate_prefix(prefix: &str) -> Result<(), CoreError> {
    if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Reference prefix '{prefix}' must be uppercase ASCII letters"
        )))
    }
}

/// Format a reference number, e.g. `format_reference("REQ", 2026, 7)` →
/// `"REQ-2026-0007"`.
pub fn format_reference(prefix: &str, year: i32, sequence: i64) -> String {
    format!("{prefix}-{year:04}-{sequence:0width$}", width = SEQUENCE_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_zero_padding() {
        assert_eq!(format_reference("REQ", 2026, 1), "REQ-2026-0001");
        assert_eq!(format_reference("INQ", 2026, 1234), "INQ-2026-1234");
    }

    #[test]
    fn sequence_past_four_digits_keeps_growing() {
        let s = format_reference("REQ", 2026, 10_000);
        assert_eq!(s, "REQ-2026-10000");
        assert_eq!(ReferenceNumber::parse(&s).unwrap().sequence, 10_000);
    }

    #[test]
    fn parse_extracts_parts() {
        let parsed = ReferenceNumber::parse("REQ-2026-0042").unwrap();
        assert_eq!(parsed.prefix, "REQ");
        assert_eq!(parsed.year, 2026);
        assert_eq!(parsed.sequence, 42);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(ReferenceNumber::parse("req-2026-0001").is_err());
        assert!(ReferenceNumber::parse("REQ-26-0001").is_err());
        assert!(ReferenceNumber::parse("REQ-2026-1").is_err());
        assert!(ReferenceNumber::parse("").is_err());
    }

    #[test]
    fn prefix_validation() {
        assert!(validate_prefix("REQ").is_ok());
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("Req").is_err());
        assert!(validate_prefix("R1").is_err());
    }
}
