//! Standardized-index conversion and severity banding.
//!
//! Converts a raw PM2.5 concentration (µg/m³) into the unitless 0-500
//! index by piecewise-linear interpolation over the US EPA breakpoint
//! table, then buckets the index into five severity bands. Both halves
//! are pure functions with no dependencies.

use serde::{Deserialize, Serialize};

use respira_core::errors::{WorkflowError, WorkflowResult};

// ─────────────────────────────────────────────────────────────────────────────
// Breakpoint table
// ─────────────────────────────────────────────────────────────────────────────

/// One segment of the concentration-to-index conversion table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    /// Concentration at the segment's lower anchor (µg/m³).
    pub conc_low: f64,
    /// Concentration at the segment's upper anchor (µg/m³), inclusive.
    pub conc_high: f64,
    /// Index value at the lower anchor.
    pub index_low: u16,
    /// Index value at the upper anchor.
    pub index_high: u16,
}

/// US EPA PM2.5 breakpoints (24-hour averages).
///
/// Anchors are discrete: each segment starts 0.1 µg/m³ above the previous
/// upper bound, as published. A concentration falling in one of the 0.1-wide
/// gaps (12.05, say) is resolved by the next segment.
pub const BREAKPOINTS: [Breakpoint; 6] = [
    Breakpoint { conc_low: 0.0, conc_high: 12.0, index_low: 0, index_high: 50 },
    Breakpoint { conc_low: 12.1, conc_high: 35.4, index_low: 51, index_high: 100 },
    Breakpoint { conc_low: 35.5, conc_high: 55.4, index_low: 101, index_high: 150 },
    Breakpoint { conc_low: 55.5, conc_high: 150.4, index_low: 151, index_high: 200 },
    Breakpoint { conc_low: 150.5, conc_high: 250.4, index_low: 201, index_high: 300 },
    Breakpoint { conc_low: 250.5, conc_high: 500.4, index_low: 301, index_high: 500 },
];

/// Index reported for concentrations above the last breakpoint.
pub const INDEX_CEILING: u16 = 500;

// ─────────────────────────────────────────────────────────────────────────────
// Conversion
// ─────────────────────────────────────────────────────────────────────────────

/// Convert a PM2.5 concentration (µg/m³) into the standardized index.
///
/// Interpolates linearly within the matched breakpoint segment and rounds
/// to the nearest integer. Concentrations above the table clamp to
/// [`INDEX_CEILING`]; they are never extrapolated. A negative or non-finite
/// concentration is a contract violation.
pub fn calculate_index(concentration: f64) -> WorkflowResult<u16> {
    if !concentration.is_finite() || concentration < 0.0 {
        return Err(WorkflowError::validation(format!(
            "concentration must be a non-negative number of µg/m³, got {concentration}"
        )));
    }

    for bp in &BREAKPOINTS {
        if concentration <= bp.conc_high {
            let slope =
                f64::from(bp.index_high - bp.index_low) / (bp.conc_high - bp.conc_low);
            let index = f64::from(bp.index_low) + slope * (concentration - bp.conc_low);
            return Ok(index.round() as u16);
        }
    }

    Ok(INDEX_CEILING)
}

// ─────────────────────────────────────────────────────────────────────────────
// Severity banding
// ─────────────────────────────────────────────────────────────────────────────

/// Severity band derived from the standardized index.
///
/// Bands are ordered and non-overlapping, inclusive on their upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeverityBand {
    /// Index 0-50.
    Good,
    /// Index 51-100.
    Moderate,
    /// Index 101-150.
    #[serde(rename = "Unhealthy for Sensitive")]
    UnhealthyForSensitive,
    /// Index 151-200.
    Unhealthy,
    /// Index above 200.
    Hazardous,
}

impl SeverityBand {
    /// Band for a standardized index value.
    #[must_use]
    pub fn from_index(index: u16) -> Self {
        match index {
            0..=50 => Self::Good,
            51..=100 => Self::Moderate,
            101..=150 => Self::UnhealthyForSensitive,
            151..=200 => Self::Unhealthy,
            _ => Self::Hazardous,
        }
    }

    /// Human-readable label, as rendered to users and report payloads.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthyForSensitive => "Unhealthy for Sensitive",
            Self::Unhealthy => "Unhealthy",
            Self::Hazardous => "Hazardous",
        }
    }
}

impl std::fmt::Display for SeverityBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
