//! Settings type definitions.
//!
//! Field names serialize as camelCase to match the on-disk JSON format.
//! Every struct takes `#[serde(default)]` so a partial settings file only
//! overrides the keys it names.

use serde::{Deserialize, Serialize};

/// Root settings for the respira workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RespiraSettings {
    /// Gateway endpoint configuration.
    pub gateway: GatewaySettings,
    /// Environmental data configuration.
    pub air_quality: AirQualitySettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Where and how to reach the analysis gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewaySettings {
    /// Base URL of the gateway exposing the analyze / air-quality /
    /// generate-report endpoints.
    pub base_url: String,
    /// Bearer token attached to requests when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            bearer_token: None,
            timeout_ms: 30_000,
        }
    }
}

/// Environmental data defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AirQualitySettings {
    /// Location queried when the caller does not pick one.
    pub default_location: u32,
    /// How long a fetched reading stays valid.
    pub cache_ttl_secs: u64,
}

impl Default for AirQualitySettings {
    fn default() -> Self {
        Self {
            // City Railway Station, the original default
            default_location: 5574,
            cache_ttl_secs: 300,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
