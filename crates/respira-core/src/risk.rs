//! Risk levels and the normalized acoustic-analysis result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// RiskLevel
// ─────────────────────────────────────────────────────────────────────────────

/// Respiratory risk level reported by the acoustic-analysis service.
///
/// The service reports levels as free-form strings (`"LOW RISK"`,
/// `"MODERATE RISK"`, `"HIGH RISK"`). Parsing matches the leading word
/// case-insensitively; anything unrecognized maps to [`RiskLevel::Unknown`]
/// rather than failing the analysis. The `"ERROR"` sentinel is not a level
/// and is rejected by the gateway before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Normal breathing patterns.
    Low,
    /// Elevated indicators worth monitoring.
    Moderate,
    /// Strong indicators; medical follow-up advised.
    High,
    /// The service reported a level this client does not recognize.
    Unknown,
}

impl RiskLevel {
    /// Parse a server-reported risk string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        if lowered.starts_with("low") {
            Self::Low
        } else if lowered.starts_with("moderate") {
            Self::Moderate
        } else if lowered.starts_with("high") {
            Self::High
        } else {
            Self::Unknown
        }
    }

    /// Canonical display form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AcousticResult
// ─────────────────────────────────────────────────────────────────────────────

/// Normalized result of one acoustic analysis.
///
/// The raw service payload reports `confidence` and `processing_time_ms`
/// as floats; both are normalized here to the integer contracts callers
/// rely on (0–100 and non-negative respectively).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcousticResult {
    /// Classified risk level.
    pub risk_level: RiskLevel,
    /// Confidence percentage, 0–100.
    pub confidence: u8,
    /// Care guidance supplied by the service, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    /// Named numeric features extracted from the sample (jitter, shimmer, …).
    #[serde(default)]
    pub biomarkers: BTreeMap<String, f64>,
    /// Server-reported processing time in milliseconds.
    pub processing_time_ms: u64,
    /// Version of the model that produced the result, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl AcousticResult {
    /// Normalize a raw confidence percentage to the 0–100 integer contract.
    ///
    /// Non-finite values collapse to 0.
    #[must_use]
    pub fn clamp_confidence(raw: f64) -> u8 {
        if raw.is_finite() {
            raw.round().clamp(0.0, 100.0) as u8
        } else {
            0
        }
    }

    /// Normalize a server-reported duration to a non-negative integer.
    #[must_use]
    pub fn clamp_duration_ms(raw: f64) -> u64 {
        if raw.is_finite() {
            raw.round().max(0.0) as u64
        } else {
            0
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── RiskLevel parsing ───────────────────────────────────────────────

    #[test]
    fn parses_service_level_strings() {
        assert_eq!(RiskLevel::parse("LOW RISK"), RiskLevel::Low);
        assert_eq!(RiskLevel::parse("MODERATE RISK"), RiskLevel::Moderate);
        assert_eq!(RiskLevel::parse("HIGH RISK"), RiskLevel::High);
    }

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!(RiskLevel::parse("Low"), RiskLevel::Low);
        assert_eq!(RiskLevel::parse("moderate"), RiskLevel::Moderate);
        assert_eq!(RiskLevel::parse("  high risk "), RiskLevel::High);
    }

    #[test]
    fn unrecognized_levels_map_to_unknown() {
        assert_eq!(RiskLevel::parse("SEVERE"), RiskLevel::Unknown);
        assert_eq!(RiskLevel::parse(""), RiskLevel::Unknown);
    }

    #[test]
    fn display_uses_canonical_form() {
        assert_eq!(RiskLevel::Low.to_string(), "Low");
        assert_eq!(RiskLevel::Unknown.to_string(), "Unknown");
    }

    // ── Confidence normalization ────────────────────────────────────────

    #[test]
    fn confidence_rounds_to_nearest() {
        assert_eq!(AcousticResult::clamp_confidence(87.3), 87);
        assert_eq!(AcousticResult::clamp_confidence(87.5), 88);
    }

    #[test]
    fn confidence_clamps_to_bounds() {
        assert_eq!(AcousticResult::clamp_confidence(-3.0), 0);
        assert_eq!(AcousticResult::clamp_confidence(104.2), 100);
    }

    #[test]
    fn confidence_non_finite_collapses_to_zero() {
        assert_eq!(AcousticResult::clamp_confidence(f64::NAN), 0);
        assert_eq!(AcousticResult::clamp_confidence(f64::INFINITY), 0);
    }

    #[test]
    fn duration_never_negative() {
        assert_eq!(AcousticResult::clamp_duration_ms(231.87), 232);
        assert_eq!(AcousticResult::clamp_duration_ms(-5.0), 0);
    }

    // ── Serialization ───────────────────────────────────────────────────

    #[test]
    fn result_serializes_camel_case() {
        let result = AcousticResult {
            risk_level: RiskLevel::Moderate,
            confidence: 72,
            recommendation: Some("Mask advised. Monitor symptoms closely.".into()),
            biomarkers: BTreeMap::from([("jitter".to_string(), 0.031)]),
            processing_time_ms: 412,
            model_version: Some("v1.2.1".into()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["riskLevel"], "Moderate");
        assert_eq!(json["processingTimeMs"], 412);
        assert_eq!(json["biomarkers"]["jitter"], 0.031);
        assert_eq!(json["modelVersion"], "v1.2.1");
    }

    #[test]
    fn optional_fields_omitted_when_absent() {
        let result = AcousticResult {
            risk_level: RiskLevel::Low,
            confidence: 95,
            recommendation: None,
            biomarkers: BTreeMap::new(),
            processing_time_ms: 100,
            model_version: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("recommendation").is_none());
        assert!(json.get("modelVersion").is_none());
    }
}
