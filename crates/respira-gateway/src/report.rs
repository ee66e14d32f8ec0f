//! Client for the report-synthesis endpoint.
//!
//! Combines the acoustic result and an environmental reading into one
//! narrative request. Independently retryable: a failed synthesis leaves
//! both inputs untouched, so a retry needs no re-fetching.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use respira_airquality::service::EnvironmentalReading;
use respira_core::errors::{WorkflowError, WorkflowResult};
use respira_core::risk::AcousticResult;

use crate::config::GatewayConfig;

/// Explanation sent when the analysis service supplied no recommendation.
pub const DEFAULT_EXPLANATION: &str =
    "Analysis complete. The AI has assessed your respiratory patterns.";

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnalysisPayload<'a> {
    risk_level: &'a str,
    confidence: u8,
    explanation: &'a str,
}

#[derive(Debug, Serialize)]
struct ReportRequest<'a> {
    analysis_result: AnalysisPayload<'a>,
    air_quality: &'a EnvironmentalReading,
}

#[derive(Debug, Deserialize)]
struct ReportResponse {
    report: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Client for `POST {base}/generate-report`.
#[derive(Debug)]
pub struct ReportSynthesizer {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl ReportSynthesizer {
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

    /// Request one narrative synthesis of the two inputs.
    ///
    /// Safe to call again with identical inputs; the narrative may
    /// legitimately vary between calls.
    #[instrument(skip_all, fields(risk = %result.risk_level, location = %reading.location_id))]
    pub async fn generate(
        &self,
        result: &AcousticResult,
        reading: &EnvironmentalReading,
    ) -> WorkflowResult<String> {
        let url = format!("{}/generate-report", self.config.base_url);
        debug!(%url, "requesting report synthesis");

        let body = ReportRequest {
            analysis_result: AnalysisPayload {
                risk_level: result.risk_level.as_str(),
                confidence: result.confidence,
                explanation: result
                    .recommendation
                    .as_deref()
                    .unwrap_or(DEFAULT_EXPLANATION),
            },
            air_quality: reading,
        };

        let mut request = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.config.timeout);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            error!(status = status.as_u16(), "report synthesis request failed");
            return Err(WorkflowError::Network {
                status: Some(status.as_u16()),
                message: "Failed to generate report".to_string(),
            });
        }

        let payload: ReportResponse = response.json().await?;
        Ok(payload.report)
    }
}
