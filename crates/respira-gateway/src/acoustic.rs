//! Client for the acoustic-analysis endpoint.
//!
//! Submits an audio sample as a multipart upload and normalizes the
//! service's reply into an [`AcousticResult`]. The service signals failure
//! three ways, and all of them are failures here: a non-success HTTP
//! status, a risk level equal to the `"ERROR"` sentinel, and a body with
//! no risk level at all.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, error, instrument};

use respira_core::audio::AudioSample;
use respira_core::errors::{WorkflowError, WorkflowResult};
use respira_core::risk::{AcousticResult, RiskLevel};

use crate::config::GatewayConfig;

/// Risk-level value the analysis service uses to flag a handled failure.
pub const ERROR_SENTINEL: &str = "ERROR";

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct AnalyzeResponse {
    risk_level: Option<String>,
    confidence: Option<f64>,
    recommendation: Option<String>,
    #[serde(default)]
    features: BTreeMap<String, f64>,
    processing_time_ms: Option<f64>,
    model_version: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    detail: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Client for `POST {base}/analyze`.
#[derive(Debug)]
pub struct AcousticClient {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl AcousticClient {
    /// Client with a fresh HTTP connection pool.
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Client reusing an existing HTTP connection pool.
    #[must_use]
    pub fn with_client(config: GatewayConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Submit a sample for analysis and normalize the reply.
    ///
    /// Does not re-validate the sample; [`AudioSample::validate`] is the
    /// caller's gate before any network traffic.
    #[instrument(skip_all, fields(file = %sample.file_name(), bytes = sample.len()))]
    pub async fn analyze(&self, sample: &AudioSample) -> WorkflowResult<AcousticResult> {
        let url = format!("{}/analyze", self.config.base_url);
        debug!(%url, "submitting audio sample for analysis");

        let part = reqwest::multipart::Part::bytes(sample.bytes().to_vec())
            .file_name(sample.file_name().to_string())
            .mime_str(sample.effective_mime_type())
            .map_err(|e| WorkflowError::validation(format!("unusable media type: {e}")))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut request = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(self.config.timeout);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ErrorResponse>()
                .await
                .unwrap_or_default()
                .detail;
            error!(status = status.as_u16(), "acoustic analysis request failed");
            return Err(WorkflowError::analysis(
                detail.unwrap_or_else(|| "Analysis service error".to_string()),
            ));
        }

        // A literal `null` body still lacks a risk level; treat it the
        // same as an empty object.
        let payload = response
            .json::<Option<AnalyzeResponse>>()
            .await?
            .unwrap_or_default();
        normalize(payload)
    }
}

fn normalize(payload: AnalyzeResponse) -> WorkflowResult<AcousticResult> {
    match payload.risk_level.as_deref() {
        Some(ERROR_SENTINEL) => {
            error!("acoustic analysis flagged a server-side failure");
            Err(WorkflowError::analysis(
                payload
                    .error
                    .unwrap_or_else(|| "Analysis failed on the server".to_string()),
            ))
        }
        Some(raw) => Ok(AcousticResult {
            risk_level: RiskLevel::parse(raw),
            confidence: AcousticResult::clamp_confidence(payload.confidence.unwrap_or(0.0)),
            recommendation: payload.recommendation,
            biomarkers: payload.features,
            processing_time_ms: AcousticResult::clamp_duration_ms(
                payload.processing_time_ms.unwrap_or(0.0),
            ),
            model_version: payload.model_version,
        }),
        None => {
            error!("acoustic analysis response carried no risk level");
            Err(WorkflowError::analysis("Invalid response from server"))
        }
    }
}
