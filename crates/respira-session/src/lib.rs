//! # respira-session
//!
//! The analysis session: one user-initiated run of the respiratory
//! workflow, from audio submission to a synthesized narrative report.
//!
//! - **Session**: [`session::AnalysisSession`] owns the state machine
//!   (`Idle → Submitting → AwaitingResult → Ready | Failed`) and drives
//!   the three network stages in order
//! - **Events**: [`events::SessionEvent`] describes stage transitions and
//!   surfaced errors; [`emitter::EventEmitter`] broadcasts them without
//!   blocking the workflow
//!
//! Stages advance on real completion events only. A failed environmental
//! fetch leaves the acoustic result intact; only report synthesis is
//! blocked, and [`session::AnalysisSession::retry_report`] picks the
//! chain back up without resubmitting audio.
//!
//! ## Crate Position
//!
//! The orchestration layer. Sits above `respira-core`,
//! `respira-airquality`, and `respira-gateway`; the `respira` binary
//! wires a session from settings and runs it.

#![deny(unsafe_code)]

pub mod emitter;
pub mod events;
pub mod session;
