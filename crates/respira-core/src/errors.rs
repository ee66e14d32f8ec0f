//! Error taxonomy for the analysis workflow.
//!
//! One variant per failure class the workflow can surface:
//!
//! - [`WorkflowError::Validation`] — bad input before any network call
//! - [`WorkflowError::Analysis`] — acoustic service rejected or returned
//!   invalid data (the user must resubmit)
//! - [`WorkflowError::Fetch`] / [`WorkflowError::RateLimited`] /
//!   [`WorkflowError::NoData`] — environmental service failures
//! - [`WorkflowError::Precondition`] — report requested without both inputs
//! - [`WorkflowError::Network`] — transport failure at any stage
//!
//! [`StageError`] is the clonable snapshot a session stores and emits;
//! [`ErrorKind`] classifies both for retry decisions and logging.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

// ─────────────────────────────────────────────────────────────────────────────
// WorkflowError
// ─────────────────────────────────────────────────────────────────────────────

/// Failure surfaced by any stage of the analysis workflow.
///
/// Messages are human-readable and shown to the user as-is; callers use
/// [`WorkflowError::kind`] and [`WorkflowError::is_retryable`] to decide
/// between "retry possible" and "must resubmit".
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Input rejected before any network call was made.
    #[error("{message}")]
    Validation {
        /// Why the input was rejected.
        message: String,
    },

    /// The acoustic-analysis service rejected the sample or returned an
    /// unusable payload. Not retryable — the user must resubmit.
    #[error("{message}")]
    Analysis {
        /// Server-supplied detail, or a generic fallback.
        message: String,
    },

    /// The environmental service returned a non-success status other than 429.
    #[error("{message}")]
    Fetch {
        /// HTTP status reported by the service.
        status: u16,
        /// Human-readable message.
        message: String,
    },

    /// The environmental service throttled the request (HTTP 429).
    #[error("{message}")]
    RateLimited {
        /// Server-suggested wait before retrying, when provided.
        retry_after_ms: Option<u64>,
        /// Human-readable message.
        message: String,
    },

    /// The environmental service had no measurements for the location.
    #[error("{message}")]
    NoData {
        /// Human-readable message.
        message: String,
    },

    /// A report was requested before both of its inputs were ready.
    #[error("{message}")]
    Precondition {
        /// Which prerequisite was missing.
        message: String,
    },

    /// Transport-level failure at any stage, or a non-success status
    /// outside the classified cases.
    #[error("{message}")]
    Network {
        /// HTTP status, when the failure happened after a response arrived.
        status: Option<u16>,
        /// Human-readable message.
        message: String,
    },
}

impl WorkflowError {
    /// Build a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Build an analysis error.
    #[must_use]
    pub fn analysis(message: impl Into<String>) -> Self {
        Self::Analysis {
            message: message.into(),
        }
    }

    /// Build a precondition error.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Analysis { .. } => ErrorKind::Analysis,
            Self::Fetch { .. } => ErrorKind::Fetch,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::NoData { .. } => ErrorKind::NoData,
            Self::Precondition { .. } => ErrorKind::Precondition,
            Self::Network { .. } => ErrorKind::Network,
        }
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message }
            | Self::Analysis { message }
            | Self::Fetch { message, .. }
            | Self::RateLimited { message, .. }
            | Self::NoData { message }
            | Self::Precondition { message }
            | Self::Network { message, .. } => message,
        }
    }

    /// Whether a retry can succeed without resubmitting the audio sample.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Server-suggested retry delay, if any.
    #[must_use]
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for WorkflowError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ErrorKind
// ─────────────────────────────────────────────────────────────────────────────

/// Classification of a [`WorkflowError`], one kind per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Bad input, caught before any network call.
    Validation,
    /// Acoustic service rejected the sample or returned invalid data.
    Analysis,
    /// Environmental service returned a non-success status.
    Fetch,
    /// Environmental service throttled the request.
    RateLimited,
    /// Environmental service had no measurements.
    NoData,
    /// Report requested without both prerequisite inputs.
    Precondition,
    /// Transport failure at any stage.
    Network,
}

impl ErrorKind {
    /// Stable string form for log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Analysis => "analysis",
            Self::Fetch => "fetch",
            Self::RateLimited => "rate_limited",
            Self::NoData => "no_data",
            Self::Precondition => "precondition",
            Self::Network => "network",
        }
    }

    /// Whether errors of this kind can be retried without a new submission.
    ///
    /// Analysis and validation failures require the user to resubmit;
    /// precondition failures require supplying the missing input first.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Fetch | Self::RateLimited | Self::NoData | Self::Network
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StageError
// ─────────────────────────────────────────────────────────────────────────────

/// Clonable snapshot of a workflow failure.
///
/// Stored on the session and carried by session events, so consumers can
/// render the failure without holding the original error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageError {
    /// Classification of the failure.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Server-suggested retry delay, when the service provided one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl StageError {
    /// Whether a retry can succeed without resubmitting the audio sample.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<&WorkflowError> for StageError {
    fn from(err: &WorkflowError) -> Self {
        Self {
            kind: err.kind(),
            message: err.message().to_string(),
            retry_after_ms: err.retry_after_ms(),
        }
    }
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Classification ──────────────────────────────────────────────────

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            WorkflowError::validation("bad file").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            WorkflowError::analysis("server said no").kind(),
            ErrorKind::Analysis
        );
        assert_eq!(
            WorkflowError::Fetch {
                status: 502,
                message: "upstream".into()
            }
            .kind(),
            ErrorKind::Fetch
        );
        assert_eq!(
            WorkflowError::RateLimited {
                retry_after_ms: None,
                message: "slow down".into()
            }
            .kind(),
            ErrorKind::RateLimited
        );
        assert_eq!(
            WorkflowError::NoData {
                message: "empty".into()
            }
            .kind(),
            ErrorKind::NoData
        );
        assert_eq!(
            WorkflowError::precondition("missing reading").kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            WorkflowError::Network {
                status: None,
                message: "timeout".into()
            }
            .kind(),
            ErrorKind::Network
        );
    }

    #[test]
    fn display_is_the_plain_message() {
        let err = WorkflowError::RateLimited {
            retry_after_ms: Some(2000),
            message: "Rate limit exceeded. Please wait a moment.".into(),
        };
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded. Please wait a moment."
        );
    }

    // ── Retryability ────────────────────────────────────────────────────

    #[test]
    fn environmental_and_network_errors_are_retryable() {
        assert!(ErrorKind::Fetch.is_retryable());
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(ErrorKind::NoData.is_retryable());
        assert!(ErrorKind::Network.is_retryable());
    }

    #[test]
    fn submission_errors_are_not_retryable() {
        assert!(!ErrorKind::Validation.is_retryable());
        assert!(!ErrorKind::Analysis.is_retryable());
        assert!(!ErrorKind::Precondition.is_retryable());
    }

    #[test]
    fn retry_after_only_on_rate_limited() {
        let limited = WorkflowError::RateLimited {
            retry_after_ms: Some(1500),
            message: "wait".into(),
        };
        assert_eq!(limited.retry_after_ms(), Some(1500));

        let fetch = WorkflowError::Fetch {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(fetch.retry_after_ms(), None);
    }

    // ── StageError snapshots ────────────────────────────────────────────

    #[test]
    fn stage_error_snapshot_preserves_fields() {
        let err = WorkflowError::RateLimited {
            retry_after_ms: Some(3000),
            message: "Rate limit exceeded. Please wait a moment.".into(),
        };
        let snap = StageError::from(&err);
        assert_eq!(snap.kind, ErrorKind::RateLimited);
        assert_eq!(snap.message, "Rate limit exceeded. Please wait a moment.");
        assert_eq!(snap.retry_after_ms, Some(3000));
        assert!(snap.is_retryable());
    }

    #[test]
    fn stage_error_serializes_camel_case() {
        let snap = StageError {
            kind: ErrorKind::RateLimited,
            message: "wait".into(),
            retry_after_ms: Some(100),
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["kind"], "rateLimited");
        assert_eq!(json["retryAfterMs"], 100);
    }

    #[test]
    fn stage_error_omits_absent_retry_hint() {
        let snap = StageError {
            kind: ErrorKind::Analysis,
            message: "failed".into(),
            retry_after_ms: None,
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert!(json.get("retryAfterMs").is_none());
    }
}
