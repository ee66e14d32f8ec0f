//! # respira-airquality
//!
//! Environmental data for the Respira workflow: fetching raw measurements
//! from the gateway, picking the most recent one, converting it into the
//! standardized 0-500 index, and caching the result per monitoring
//! location.
//!
//! - **Index**: [`index::calculate_index`] interpolates over the EPA
//!   breakpoint table; [`index::SeverityBand`] buckets the result
//! - **Locations**: [`locations`] holds the registry of known monitoring
//!   locations and the default selection
//! - **Cache**: [`cache::MeasurementCache`] is a location-keyed store with
//!   a five-minute validity window
//! - **Service**: [`service::EnvironmentalDataService`] ties the pieces
//!   together, cache-first
//!
//! ## Crate Position
//!
//! Sits above `respira-core`. Used by `respira-session` to resolve the
//! environmental half of a composite report.

#![deny(unsafe_code)]

pub mod cache;
pub mod index;
pub mod locations;
pub mod service;
