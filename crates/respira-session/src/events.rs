//! Session lifecycle events.
//!
//! One tagged enum covers everything a consumer needs to render progress
//! without polling: stage transitions, report-chain transitions, and
//! surfaced stage failures. Type strings and field names are part of the
//! serialized contract.

use chrono::Utc;
use respira_core::errors::StageError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{ReportStage, SessionStage};

// ─────────────────────────────────────────────────────────────────────────────
// BaseEvent
// ─────────────────────────────────────────────────────────────────────────────

/// Common fields carried by every session event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseEvent {
    /// Session this event belongs to.
    pub session_id: Uuid,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

impl BaseEvent {
    /// Base fields stamped with the current UTC time.
    #[must_use]
    pub fn now(session_id: Uuid) -> Self {
        Self {
            session_id,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionEvent
// ─────────────────────────────────────────────────────────────────────────────

/// A session lifecycle event.
///
/// Broadcast on the session's event stream; consumers discriminate on the
/// serialized `type` tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// The session moved to a new stage.
    #[serde(rename = "stage_changed")]
    StageChanged {
        /// Common fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Stage the session is now in.
        stage: SessionStage,
    },

    /// The report chain moved to a new stage.
    #[serde(rename = "report_stage_changed")]
    ReportStageChanged {
        /// Common fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Report stage the session is now in.
        stage: ReportStage,
    },

    /// A stage failure was surfaced.
    #[serde(rename = "error_raised")]
    ErrorRaised {
        /// Common fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Snapshot of the failure.
        error: StageError,
    },
}

impl SessionEvent {
    /// Build a stage-change event stamped now.
    #[must_use]
    pub fn stage_changed(session_id: Uuid, stage: SessionStage) -> Self {
        Self::StageChanged {
            base: BaseEvent::now(session_id),
            stage,
        }
    }

    /// Build a report-stage-change event stamped now.
    #[must_use]
    pub fn report_stage_changed(session_id: Uuid, stage: ReportStage) -> Self {
        Self::ReportStageChanged {
            base: BaseEvent::now(session_id),
            stage,
        }
    }

    /// Build an error event stamped now.
    #[must_use]
    pub fn error_raised(session_id: Uuid, error: StageError) -> Self {
        Self::ErrorRaised {
            base: BaseEvent::now(session_id),
            error,
        }
    }

    /// Common fields.
    #[must_use]
    pub fn base(&self) -> &BaseEvent {
        match self {
            Self::StageChanged { base, .. }
            | Self::ReportStageChanged { base, .. }
            | Self::ErrorRaised { base, .. } => base,
        }
    }

    /// Session this event belongs to.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.base().session_id
    }

    /// Type string used as the serialized discriminant.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StageChanged { .. } => "stage_changed",
            Self::ReportStageChanged { .. } => "report_stage_changed",
            Self::ErrorRaised { .. } => "error_raised",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
