//! Environmental data service: gateway fetch, recency selection, and
//! normalization into display-ready readings, cache-first.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use respira_core::errors::{WorkflowError, WorkflowResult};

use crate::cache::{DEFAULT_TTL_SECS, Measurement, MeasurementCache};
use crate::index::{SeverityBand, calculate_index};
use crate::locations::{CITY, COUNTRY, LocationId, location_name};

/// Unit every monitoring location reports concentrations in.
pub const MEASUREMENT_UNIT: &str = "µg/m³";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for [`EnvironmentalDataService`].
#[derive(Debug, Clone)]
pub struct AirQualityConfig {
    /// Base URL of the gateway exposing `/air-quality`.
    pub base_url: String,
    /// Bearer token attached to requests when set.
    pub bearer_token: Option<String>,
    /// Cache validity window in seconds.
    pub cache_ttl_secs: u64,
}

impl Default for AirQualityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            bearer_token: None,
            cache_ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl AirQualityConfig {
    /// Config pointing at `base_url`, defaults elsewhere.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Set the cache validity window in seconds.
    #[must_use]
    pub fn with_cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = secs;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reading
// ─────────────────────────────────────────────────────────────────────────────

/// A normalized environmental reading, ready for display and for the
/// report-synthesis payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalReading {
    /// Monitoring location the reading came from.
    pub location_id: LocationId,
    /// Display name of the location.
    pub location_name: String,
    /// City of the deployment.
    pub city: String,
    /// Country of the deployment.
    pub country: String,
    /// Concentration rounded to one decimal (µg/m³).
    pub value: f64,
    /// Unit the concentration is expressed in.
    pub unit: String,
    /// Standardized 0-500 index derived from `value`.
    pub standardized_index: u16,
    /// Severity band derived from the index.
    pub severity_band: SeverityBand,
    /// When the underlying measurement was captured.
    pub measured_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MeasurementsResponse {
    #[serde(default)]
    results: Vec<WireMeasurement>,
}

#[derive(Debug, Deserialize)]
struct WireMeasurement {
    value: f64,
    datetime: Option<WireTimestamp>,
}

#[derive(Debug, Deserialize)]
struct WireTimestamp {
    utc: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

/// Fetches, validates, and normalizes environmental readings, consulting
/// an owned [`MeasurementCache`] before any network call.
///
/// Concurrent fetches for the same location are not deduplicated; the
/// last writer wins the cache slot.
#[derive(Debug)]
pub struct EnvironmentalDataService {
    config: AirQualityConfig,
    cache: MeasurementCache,
    client: reqwest::Client,
}

impl EnvironmentalDataService {
    /// Service with a fresh HTTP client.
    #[must_use]
    pub fn new(config: AirQualityConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Service reusing an existing HTTP client.
    #[must_use]
    pub fn with_client(config: AirQualityConfig, client: reqwest::Client) -> Self {
        let cache = MeasurementCache::with_ttl_secs(config.cache_ttl_secs);
        Self { config, cache, client }
    }

    /// The cache backing this service instance.
    #[must_use]
    pub fn cache(&self) -> &MeasurementCache {
        &self.cache
    }

    /// Latest reading for a location, cache-first.
    ///
    /// On a cache miss this issues one network request, picks the most
    /// recent measurement by timestamp (ties keep response order), stores
    /// it, and returns the normalized reading. Fetch failures never
    /// populate the cache.
    #[instrument(skip_all, fields(location = %location))]
    pub async fn fetch(&self, location: LocationId) -> WorkflowResult<EnvironmentalReading> {
        if let Some(hit) = self.cache.get(location) {
            debug!("measurement cache hit");
            return normalize(location, hit);
        }

        let measurement = self.fetch_remote(location).await?;
        let reading = normalize(location, measurement)?;
        self.cache.put(location, measurement);
        Ok(reading)
    }

    async fn fetch_remote(&self, location: LocationId) -> WorkflowResult<Measurement> {
        let url = format!("{}/air-quality", self.config.base_url);
        debug!(%url, "requesting air quality measurements");

        let mut request = self
            .client
            .get(&url)
            .query(&[("location_id", location.as_u32())]);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            warn!(retry_after_ms = ?retry_after, "air quality request rate limited");
            return Err(WorkflowError::RateLimited {
                retry_after_ms: retry_after,
                message: "Rate limit exceeded. Please wait a moment.".to_string(),
            });
        }
        if !status.is_success() {
            error!(status = status.as_u16(), "air quality request failed");
            return Err(WorkflowError::Fetch {
                status: status.as_u16(),
                message: "Failed to fetch air quality data".to_string(),
            });
        }

        let payload: MeasurementsResponse = response.json().await?;
        let Some(measurement) = select_most_recent(&payload.results, Utc::now()) else {
            warn!("air quality response contained no measurements");
            return Err(WorkflowError::NoData {
                message: "No air quality data available".to_string(),
            });
        };
        Ok(measurement)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Selection and normalization
// ─────────────────────────────────────────────────────────────────────────────

/// Pick the most recent measurement by capture timestamp.
///
/// Measurements without a parseable timestamp sort as oldest; if one of
/// them still wins (sole entry), its capture time resolves to `now`. Ties
/// keep the first entry in response order.
fn select_most_recent(results: &[WireMeasurement], now: DateTime<Utc>) -> Option<Measurement> {
    let mut best: Option<(DateTime<Utc>, Measurement)> = None;
    for wire in results {
        let parsed = wire
            .datetime
            .as_ref()
            .and_then(|d| d.utc.as_deref())
            .and_then(parse_timestamp);
        let sort_key = parsed.unwrap_or(DateTime::UNIX_EPOCH);
        let candidate = Measurement { value: wire.value, captured_at: parsed.unwrap_or(now) };
        match &best {
            Some((key, _)) if sort_key <= *key => {}
            _ => best = Some((sort_key, candidate)),
        }
    }
    best.map(|(_, measurement)| measurement)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn normalize(location: LocationId, measurement: Measurement) -> WorkflowResult<EnvironmentalReading> {
    let value = round_to_tenth(measurement.value);
    let standardized_index = calculate_index(value)?;
    let severity_band = SeverityBand::from_index(standardized_index);
    Ok(EnvironmentalReading {
        location_id: location,
        location_name: location_name(location).to_string(),
        city: CITY.to_string(),
        country: COUNTRY.to_string(),
        value,
        unit: MEASUREMENT_UNIT.to_string(),
        standardized_index,
        severity_band,
        measured_at: measurement.captured_at,
    })
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Parse a `Retry-After` header value into milliseconds.
///
/// Accepts delta-seconds (`"30"`) or an HTTP-date; a date already in the
/// past parses to zero. Returns `None` when the value is unintelligible.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<u64> {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(seconds * 1000);
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        let delay_ms = date.signed_duration_since(Utc::now()).num_milliseconds();
        return Some(delay_ms.max(0) as u64);
    }
    None
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::TimeDelta;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::locations::DEFAULT_LOCATION;

    use super::*;

    fn service_for(server: &MockServer) -> EnvironmentalDataService {
        EnvironmentalDataService::new(AirQualityConfig::new(server.uri()))
    }

    fn results_body(entries: serde_json::Value) -> serde_json::Value {
        serde_json::json!({ "results": entries })
    }

    // ── selection and normalization ──

    #[tokio::test]
    async fn fetch_selects_the_most_recent_measurement() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/air-quality"))
            .and(query_param("location_id", "5574"))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body(
                serde_json::json!([
                    {"value": 10.0, "datetime": {"utc": "2026-01-01T00:00:00Z"}},
                    {"value": 20.0, "datetime": {"utc": "2026-01-02T00:00:00Z"}},
                ]),
            )))
            .mount(&server)
            .await;

        let service = service_for(&server);
        let reading = service.fetch(DEFAULT_LOCATION).await.unwrap();

        assert_eq!(reading.value, 20.0);
        assert_eq!(
            reading.measured_at,
            "2026-01-02T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(reading.standardized_index, 68);
        assert_eq!(reading.severity_band, SeverityBand::Moderate);
        assert_eq!(reading.location_name, "City Railway Station");
        assert_eq!(reading.city, "Bengaluru");
        assert_eq!(reading.unit, "µg/m³");
    }

    #[tokio::test]
    async fn tied_timestamps_keep_response_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/air-quality"))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body(
                serde_json::json!([
                    {"value": 10.0, "datetime": {"utc": "2026-01-01T00:00:00Z"}},
                    {"value": 20.0, "datetime": {"utc": "2026-01-01T00:00:00Z"}},
                ]),
            )))
            .mount(&server)
            .await;

        let service = service_for(&server);
        let reading = service.fetch(DEFAULT_LOCATION).await.unwrap();

        assert_eq!(reading.value, 10.0);
    }

    #[tokio::test]
    async fn missing_timestamps_sort_oldest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/air-quality"))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body(
                serde_json::json!([
                    {"value": 99.0},
                    {"value": 20.0, "datetime": {"utc": "2026-01-02T00:00:00Z"}},
                ]),
            )))
            .mount(&server)
            .await;

        let service = service_for(&server);
        let reading = service.fetch(DEFAULT_LOCATION).await.unwrap();

        assert_eq!(reading.value, 20.0);
    }

    #[tokio::test]
    async fn values_round_to_one_decimal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/air-quality"))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body(
                serde_json::json!([
                    {"value": 23.456, "datetime": {"utc": "2026-01-01T00:00:00Z"}},
                ]),
            )))
            .mount(&server)
            .await;

        let service = service_for(&server);
        let reading = service.fetch(DEFAULT_LOCATION).await.unwrap();

        assert_eq!(reading.value, 23.5);
        assert_eq!(reading.standardized_index, 75);
    }

    // ── error mapping ──

    #[tokio::test]
    async fn rate_limiting_surfaces_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/air-quality"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
            .mount(&server)
            .await;

        let service = service_for(&server);
        let err = service.fetch(DEFAULT_LOCATION).await.unwrap_err();

        assert_matches!(
            err,
            WorkflowError::RateLimited { retry_after_ms: Some(30_000), .. }
        );
        assert_eq!(err.message(), "Rate limit exceeded. Please wait a moment.");
    }

    #[tokio::test]
    async fn server_failure_maps_to_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/air-quality"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let service = service_for(&server);
        let err = service.fetch(DEFAULT_LOCATION).await.unwrap_err();

        assert_matches!(err, WorkflowError::Fetch { status: 500, .. });
        assert_eq!(err.message(), "Failed to fetch air quality data");
    }

    #[tokio::test]
    async fn empty_results_map_to_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/air-quality"))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body(serde_json::json!([]))))
            .mount(&server)
            .await;

        let service = service_for(&server);
        let err = service.fetch(DEFAULT_LOCATION).await.unwrap_err();

        assert_matches!(err, WorkflowError::NoData { .. });
        assert_eq!(err.message(), "No air quality data available");
    }

    #[tokio::test]
    async fn negative_values_are_a_contract_violation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/air-quality"))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body(
                serde_json::json!([
                    {"value": -5.0, "datetime": {"utc": "2026-01-01T00:00:00Z"}},
                ]),
            )))
            .mount(&server)
            .await;

        let service = service_for(&server);
        let err = service.fetch(DEFAULT_LOCATION).await.unwrap_err();

        assert_matches!(err, WorkflowError::Validation { .. });
        assert!(service.cache().is_empty());
    }

    // ── caching ──

    #[tokio::test]
    async fn cache_suppresses_repeat_fetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/air-quality"))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body(
                serde_json::json!([
                    {"value": 20.0, "datetime": {"utc": "2026-01-01T00:00:00Z"}},
                ]),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let service = service_for(&server);
        let first = service.fetch(DEFAULT_LOCATION).await.unwrap();
        let second = service.fetch(DEFAULT_LOCATION).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn bearer_token_is_attached_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/air-quality"))
            .and(header("authorization", "Bearer token-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body(
                serde_json::json!([
                    {"value": 20.0, "datetime": {"utc": "2026-01-01T00:00:00Z"}},
                ]),
            )))
            .mount(&server)
            .await;

        let config = AirQualityConfig::new(server.uri()).with_bearer_token("token-123");
        let service = EnvironmentalDataService::new(config);

        assert!(service.fetch(DEFAULT_LOCATION).await.is_ok());
    }

    // ── retry-after parsing ──

    #[test]
    fn parse_retry_after_accepts_delta_seconds() {
        assert_eq!(parse_retry_after("30"), Some(30_000));
        assert_eq!(parse_retry_after(" 5 "), Some(5000));
    }

    #[test]
    fn parse_retry_after_accepts_http_dates() {
        let future = (Utc::now() + TimeDelta::seconds(60)).to_rfc2822();
        let ms = parse_retry_after(&future).unwrap();
        assert!(ms <= 60_000);

        let past = (Utc::now() - TimeDelta::seconds(60)).to_rfc2822();
        assert_eq!(parse_retry_after(&past), Some(0));
    }

    #[test]
    fn parse_retry_after_rejects_garbage() {
        assert_eq!(parse_retry_after("soon"), None);
    }

    // ── reading serialization ──

    #[test]
    fn reading_serializes_with_camel_case_keys() {
        let measurement = Measurement {
            value: 8.0,
            captured_at: "2026-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap(),
        };
        let reading = normalize(DEFAULT_LOCATION, measurement).unwrap();
        let json = serde_json::to_value(&reading).unwrap();

        assert_eq!(json["locationId"], 5574);
        assert_eq!(json["locationName"], "City Railway Station");
        assert_eq!(json["standardizedIndex"], 33);
        assert_eq!(json["severityBand"], "Good");
        assert!(json["measuredAt"].is_string());
    }
}
