//! # respira-core
//!
//! Foundation types and utilities for the Respira analysis workflow.
//!
//! This crate provides the shared vocabulary the other respira crates
//! depend on:
//!
//! - **Risk types**: [`risk::RiskLevel`] and [`risk::AcousticResult`] — the
//!   normalized output of the acoustic-analysis service
//! - **Audio input**: [`audio::AudioSample`] with submission validation
//! - **Errors**: [`errors::WorkflowError`] taxonomy via `thiserror`, plus
//!   [`errors::StageError`] snapshots for session state
//! - **Logging**: [`logging::init_subscriber`] for tracing setup
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other respira crates.

#![deny(unsafe_code)]

pub mod audio;
pub mod errors;
pub mod logging;
pub mod risk;
