//! The analysis session state machine.
//!
//! One session covers one submission: validate the sample, run acoustic
//! analysis, then fetch the environmental reading and synthesize the
//! narrative report. Every transition is published on the session's
//! event stream, and stages advance on real completion events only.
//!
//! A failed environmental fetch or synthesis leaves the acoustic result
//! in place; [`AnalysisSession::retry_report`] picks the chain back up
//! without resubmitting audio. [`AnalysisSession::reset`] bumps an
//! internal epoch so responses from before the reset are discarded when
//! they eventually land.

use parking_lot::Mutex;
use respira_airquality::locations::{DEFAULT_LOCATION, LocationId};
use respira_airquality::service::{EnvironmentalDataService, EnvironmentalReading};
use respira_core::audio::AudioSample;
use respira_core::errors::{StageError, WorkflowError, WorkflowResult};
use respira_core::risk::AcousticResult;
use respira_gateway::acoustic::AcousticClient;
use respira_gateway::report::ReportSynthesizer;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::emitter::EventEmitter;
use crate::events::SessionEvent;

// ─────────────────────────────────────────────────────────────────────────────
// Stages
// ─────────────────────────────────────────────────────────────────────────────

/// Where a submission currently is.
///
/// `Ready` and `Failed` are terminal for the submission; only
/// [`AnalysisSession::reset`] leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStage {
    /// No submission in flight; accepting a new sample.
    Idle,
    /// Sample validated, request being dispatched.
    Submitting,
    /// Acoustic analysis request in flight.
    AwaitingResult,
    /// Acoustic result stored; report chain may run.
    Ready,
    /// Acoustic analysis failed; the sample must be resubmitted.
    Failed,
}

impl SessionStage {
    /// Stable string form for log fields, matching the serialized name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::AwaitingResult => "awaitingResult",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SessionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the report chain currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportStage {
    /// No report attempt yet for this submission.
    NotRequested,
    /// Synthesis request in flight.
    Generating,
    /// Narrative stored.
    Ready,
    /// Synthesis failed; retryable without resubmitting audio.
    Failed,
}

impl ReportStage {
    /// Stable string form for log fields, matching the serialized name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotRequested => "notRequested",
            Self::Generating => "generating",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ReportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// Point-in-time copy of a session's state.
///
/// Everything a consumer needs to render the session without holding the
/// session itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Session id.
    pub id: Uuid,
    /// Current stage.
    pub stage: SessionStage,
    /// Monitoring location the environmental fetch targets.
    pub location: LocationId,
    /// Acoustic verdict, set once analysis succeeds.
    pub acoustic_result: Option<AcousticResult>,
    /// Normalized environmental reading, set once the fetch succeeds.
    pub environmental_reading: Option<EnvironmentalReading>,
    /// Synthesized narrative, set once the report chain completes.
    pub report: Option<String>,
    /// Current report-chain stage.
    pub report_stage: ReportStage,
    /// Most recent surfaced failure, if any.
    pub error: Option<StageError>,
}

// ─────────────────────────────────────────────────────────────────────────────
// AnalysisSession
// ─────────────────────────────────────────────────────────────────────────────

struct Inner {
    /// Bumped by `reset`; responses carrying an older epoch are discarded.
    epoch: u64,
    stage: SessionStage,
    location: LocationId,
    acoustic_result: Option<AcousticResult>,
    environmental_reading: Option<EnvironmentalReading>,
    report: Option<String>,
    report_stage: ReportStage,
    error: Option<StageError>,
}

/// One user-initiated analysis run.
///
/// Owns the three service clients and drives them in order:
/// analyze, fetch, synthesize. All methods take `&self`; internal state
/// sits behind a [`parking_lot::Mutex`] that is never held across an
/// await point.
pub struct AnalysisSession {
    id: Uuid,
    inner: Mutex<Inner>,
    events: EventEmitter,
    acoustic: AcousticClient,
    environment: EnvironmentalDataService,
    synthesizer: ReportSynthesizer,
}

impl AnalysisSession {
    /// New idle session targeting the default monitoring location.
    #[must_use]
    pub fn new(
        acoustic: AcousticClient,
        environment: EnvironmentalDataService,
        synthesizer: ReportSynthesizer,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            inner: Mutex::new(Inner {
                epoch: 0,
                stage: SessionStage::Idle,
                location: DEFAULT_LOCATION,
                acoustic_result: None,
                environmental_reading: None,
                report: None,
                report_stage: ReportStage::NotRequested,
                error: None,
            }),
            events: EventEmitter::new(),
            acoustic,
            environment,
            synthesizer,
        }
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> SessionStage {
        self.inner.lock().stage
    }

    /// Point-in-time copy of the full session state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            id: self.id,
            stage: inner.stage,
            location: inner.location,
            acoustic_result: inner.acoustic_result.clone(),
            environmental_reading: inner.environmental_reading.clone(),
            report: inner.report.clone(),
            report_stage: inner.report_stage,
            error: inner.error.clone(),
        }
    }

    /// Open a receiver for this session's events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Select the monitoring location for subsequent environmental
    /// fetches. Takes effect on the next fetch; survives `reset`.
    pub fn set_location(&self, location: LocationId) {
        self.inner.lock().location = location;
    }

    /// Submit an audio sample and drive the workflow to completion.
    ///
    /// Validation failures reject the sample synchronously and leave the
    /// session `Idle`. An analysis failure moves it to `Failed`. After a
    /// successful analysis the environmental fetch and report synthesis
    /// run automatically; their failures are surfaced as the returned
    /// error but keep the acoustic result `Ready` so `retry_report` can
    /// finish the job.
    ///
    /// If the session is reset while a request is in flight, the late
    /// response is discarded and the returned snapshot reflects the
    /// reset state.
    #[instrument(skip_all, fields(session = %self.id, file = %sample.file_name()))]
    pub async fn submit(&self, sample: &AudioSample) -> WorkflowResult<SessionSnapshot> {
        sample.validate()?;

        let epoch = {
            let mut inner = self.inner.lock();
            if inner.stage != SessionStage::Idle {
                return Err(WorkflowError::validation(
                    "An analysis is already in progress. Reset the session first.",
                ));
            }
            inner.stage = SessionStage::Submitting;
            inner.error = None;
            inner.epoch
        };
        self.emit_stage(SessionStage::Submitting);
        debug!(bytes = sample.len(), "submission accepted");

        {
            let mut inner = self.inner.lock();
            inner.stage = SessionStage::AwaitingResult;
        }
        self.emit_stage(SessionStage::AwaitingResult);

        match self.acoustic.analyze(sample).await {
            Ok(result) => {
                let stale = {
                    let mut inner = self.inner.lock();
                    if inner.epoch == epoch {
                        inner.acoustic_result = Some(result);
                        inner.stage = SessionStage::Ready;
                        false
                    } else {
                        true
                    }
                };
                if stale {
                    debug!("analysis response discarded after reset");
                    return Ok(self.snapshot());
                }
                self.emit_stage(SessionStage::Ready);
            }
            Err(err) => {
                let surfaced = StageError::from(&err);
                let stale = {
                    let mut inner = self.inner.lock();
                    if inner.epoch == epoch {
                        inner.stage = SessionStage::Failed;
                        inner.error = Some(surfaced.clone());
                        false
                    } else {
                        true
                    }
                };
                if stale {
                    debug!("analysis response discarded after reset");
                    return Ok(self.snapshot());
                }
                warn!(kind = %err.kind(), "analysis stage failed");
                self.emit_stage(SessionStage::Failed);
                self.emit_error(surfaced);
                return Err(err);
            }
        }

        self.run_report_chain(epoch).await?;
        Ok(self.snapshot())
    }

    /// Re-run the report chain for the stored acoustic result.
    ///
    /// Fails fast with a precondition error when no analysis result is
    /// stored. Re-fetches the environmental reading only if one is not
    /// already held; a stored reading is reused as-is.
    #[instrument(skip_all, fields(session = %self.id))]
    pub async fn retry_report(&self) -> WorkflowResult<SessionSnapshot> {
        let epoch = {
            let mut inner = self.inner.lock();
            if inner.acoustic_result.is_none() {
                return Err(WorkflowError::precondition(
                    "No analysis result to report on. Submit a sample first.",
                ));
            }
            inner.error = None;
            inner.epoch
        };

        self.run_report_chain(epoch).await?;
        Ok(self.snapshot())
    }

    /// Return to `Idle`, discarding the acoustic result, reading, report,
    /// and error. Valid from any stage; in-flight responses for the old
    /// submission are discarded when they land.
    pub fn reset(&self) {
        {
            let mut inner = self.inner.lock();
            inner.epoch += 1;
            inner.stage = SessionStage::Idle;
            inner.acoustic_result = None;
            inner.environmental_reading = None;
            inner.report = None;
            inner.report_stage = ReportStage::NotRequested;
            inner.error = None;
        }
        debug!(session = %self.id, "session reset");
        self.emit_stage(SessionStage::Idle);
    }

    /// Fetch the reading (if absent) and synthesize the report.
    ///
    /// A fetch failure is stored and returned without touching
    /// `report_stage`; only when both inputs are present does the chain
    /// enter `Generating`.
    async fn run_report_chain(&self, epoch: u64) -> WorkflowResult<()> {
        let (location, have_reading) = {
            let inner = self.inner.lock();
            (inner.location, inner.environmental_reading.is_some())
        };

        if !have_reading {
            debug!(location = %location, "fetching environmental reading");
            match self.environment.fetch(location).await {
                Ok(reading) => {
                    let stale = {
                        let mut inner = self.inner.lock();
                        if inner.epoch == epoch {
                            inner.environmental_reading = Some(reading);
                            false
                        } else {
                            true
                        }
                    };
                    if stale {
                        debug!("environmental reading discarded after reset");
                        return Ok(());
                    }
                }
                Err(err) => {
                    let surfaced = StageError::from(&err);
                    let stale = {
                        let mut inner = self.inner.lock();
                        if inner.epoch == epoch {
                            inner.error = Some(surfaced.clone());
                            false
                        } else {
                            true
                        }
                    };
                    if stale {
                        return Ok(());
                    }
                    warn!(kind = %err.kind(), "environmental fetch failed; analysis result retained");
                    self.emit_error(surfaced);
                    return Err(err);
                }
            }
        }

        let (acoustic, reading) = {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch {
                return Ok(());
            }
            let Some(acoustic) = inner.acoustic_result.clone() else {
                return Err(WorkflowError::precondition(
                    "No analysis result to report on. Submit a sample first.",
                ));
            };
            let Some(reading) = inner.environmental_reading.clone() else {
                return Err(WorkflowError::precondition(
                    "No environmental reading available for the report.",
                ));
            };
            inner.report = None;
            inner.report_stage = ReportStage::Generating;
            (acoustic, reading)
        };
        self.emit_report_stage(ReportStage::Generating);

        match self.synthesizer.generate(&acoustic, &reading).await {
            Ok(report) => {
                let stale = {
                    let mut inner = self.inner.lock();
                    if inner.epoch == epoch {
                        inner.report = Some(report);
                        inner.report_stage = ReportStage::Ready;
                        false
                    } else {
                        true
                    }
                };
                if stale {
                    debug!("report discarded after reset");
                    return Ok(());
                }
                self.emit_report_stage(ReportStage::Ready);
                Ok(())
            }
            Err(err) => {
                let surfaced = StageError::from(&err);
                let stale = {
                    let mut inner = self.inner.lock();
                    if inner.epoch == epoch {
                        inner.report_stage = ReportStage::Failed;
                        inner.error = Some(surfaced.clone());
                        false
                    } else {
                        true
                    }
                };
                if stale {
                    return Ok(());
                }
                warn!(kind = %err.kind(), "report synthesis failed");
                self.emit_report_stage(ReportStage::Failed);
                self.emit_error(surfaced);
                Err(err)
            }
        }
    }

    fn emit_stage(&self, stage: SessionStage) {
        let _ = self
            .events
            .emit(SessionEvent::stage_changed(self.id, stage));
    }

    fn emit_report_stage(&self, stage: ReportStage) {
        let _ = self
            .events
            .emit(SessionEvent::report_stage_changed(self.id, stage));
    }

    fn emit_error(&self, error: StageError) {
        let _ = self.events.emit(SessionEvent::error_raised(self.id, error));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
