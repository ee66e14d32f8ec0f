//! # respira-gateway
//!
//! Typed HTTP clients for the two analysis-gateway endpoints the workflow
//! drives:
//!
//! - **Acoustic analysis**: [`acoustic::AcousticClient`] uploads an audio
//!   sample and normalizes the service's verdict
//! - **Report synthesis**: [`report::ReportSynthesizer`] combines the
//!   verdict with an environmental reading into one narrative
//!
//! Both share [`config::GatewayConfig`] (base URL, optional bearer token,
//! per-request timeout).
//!
//! ## Crate Position
//!
//! Sits above `respira-core` and `respira-airquality`. Used by
//! `respira-session` to run the workflow's network stages.

#![deny(unsafe_code)]

pub mod acoustic;
pub mod config;
pub mod report;
