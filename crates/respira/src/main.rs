//! # respira
//!
//! Command-line driver for the respiratory analysis workflow: submits a
//! breath recording, fetches the environmental reading for the selected
//! monitoring location, and prints the synthesized narrative report.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use respira_airquality::locations::{self, LocationId};
use respira_airquality::service::{
    AirQualityConfig, EnvironmentalDataService, EnvironmentalReading,
};
use respira_core::audio::AudioSample;
use respira_core::logging;
use respira_core::risk::AcousticResult;
use respira_gateway::acoustic::AcousticClient;
use respira_gateway::config::GatewayConfig;
use respira_gateway::report::ReportSynthesizer;
use respira_session::session::AnalysisSession;
use respira_settings::RespiraSettings;

/// Respiratory risk analysis from breath audio.
#[derive(Parser, Debug)]
#[command(name = "respira", about = "Respiratory risk analysis from breath audio")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze an audio sample end-to-end and print the report.
    Analyze {
        /// Path to a `.wav` or `.mp3` recording.
        file: PathBuf,

        /// Monitoring location id (overrides settings).
        #[arg(long)]
        location: Option<u32>,
    },

    /// Fetch and print one environmental reading.
    Air {
        /// Monitoring location id (overrides settings).
        #[arg(long)]
        location: Option<u32>,
    },

    /// List the known monitoring locations.
    Locations,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = respira_settings::load_settings().context("failed to load settings")?;
    logging::init_subscriber(&settings.logging.level);
    tracing::debug!(gateway = %settings.gateway.base_url, "settings loaded");

    match cli.command {
        Command::Analyze { file, location } => run_analyze(&settings, &file, location).await,
        Command::Air { location } => run_air(&settings, location).await,
        Command::Locations => {
            print_locations();
            Ok(())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

async fn run_analyze(
    settings: &RespiraSettings,
    file: &Path,
    location: Option<u32>,
) -> Result<()> {
    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .context("audio path has no usable file name")?;
    let bytes = std::fs::read(file)
        .with_context(|| format!("failed to read audio file: {}", file.display()))?;
    let sample = AudioSample::new(file_name, bytes);

    let gateway = gateway_config(settings);
    let session = AnalysisSession::new(
        AcousticClient::new(gateway.clone()),
        EnvironmentalDataService::new(air_config(settings)),
        ReportSynthesizer::new(gateway),
    );
    session.set_location(resolve_location(settings, location));
    tracing::info!(file = %file.display(), bytes = sample.len(), "starting analysis run");

    let outcome = session.submit(&sample).await;

    // Print whatever the session obtained; the acoustic verdict survives
    // an environmental or report failure.
    let snapshot = session.snapshot();
    if let Some(acoustic) = &snapshot.acoustic_result {
        print_assessment(acoustic);
    }
    if let Some(reading) = &snapshot.environmental_reading {
        println!();
        print_reading(reading);
    }
    if let Some(report) = &snapshot.report {
        println!();
        println!("Report");
        println!("  {report}");
    }

    let _ = outcome.context("analysis did not complete")?;
    Ok(())
}

async fn run_air(settings: &RespiraSettings, location: Option<u32>) -> Result<()> {
    let service = EnvironmentalDataService::new(air_config(settings));
    let location = resolve_location(settings, location);
    let reading = service
        .fetch(location)
        .await
        .context("failed to fetch the environmental reading")?;
    print_reading(&reading);
    Ok(())
}

fn print_locations() {
    println!(
        "Known monitoring locations ({}, {}):",
        locations::CITY,
        locations::COUNTRY
    );
    for location in locations::LOCATIONS {
        let marker = if location.id == locations::DEFAULT_LOCATION {
            " (default)"
        } else {
            ""
        };
        println!("  {:>5}  {}{}", location.id, location.name, marker);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wiring
// ─────────────────────────────────────────────────────────────────────────────

fn gateway_config(settings: &RespiraSettings) -> GatewayConfig {
    let mut config = GatewayConfig::new(&settings.gateway.base_url)
        .with_timeout(Duration::from_millis(settings.gateway.timeout_ms));
    if let Some(ref token) = settings.gateway.bearer_token {
        config = config.with_bearer_token(token);
    }
    config
}

fn air_config(settings: &RespiraSettings) -> AirQualityConfig {
    let mut config = AirQualityConfig::new(&settings.gateway.base_url)
        .with_cache_ttl_secs(settings.air_quality.cache_ttl_secs);
    if let Some(ref token) = settings.gateway.bearer_token {
        config = config.with_bearer_token(token);
    }
    config
}

fn resolve_location(settings: &RespiraSettings, flag: Option<u32>) -> LocationId {
    LocationId::from(flag.unwrap_or(settings.air_quality.default_location))
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_assessment(result: &AcousticResult) {
    println!("Assessment");
    println!("  Risk level:  {}", result.risk_level);
    println!("  Confidence:  {}%", result.confidence);
    if let Some(ref recommendation) = result.recommendation {
        println!("  Guidance:    {recommendation}");
    }
    if let Some(ref version) = result.model_version {
        println!("  Model:       {version}");
    }
}

fn print_reading(reading: &EnvironmentalReading) {
    println!(
        "Air quality — {} ({}, {})",
        reading.location_name, reading.city, reading.country
    );
    println!("  PM2.5:       {} {}", reading.value, reading.unit);
    println!(
        "  Index:       {} ({})",
        reading.standardized_index, reading.severity_band
    );
    println!("  Measured:    {}", reading.measured_at);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_analyze_with_location() {
        let cli = Cli::parse_from(["respira", "analyze", "breath.wav", "--location", "6984"]);
        let Command::Analyze { file, location } = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(file, PathBuf::from("breath.wav"));
        assert_eq!(location, Some(6984));
    }

    #[test]
    fn cli_analyze_location_defaults_to_none() {
        let cli = Cli::parse_from(["respira", "analyze", "breath.wav"]);
        let Command::Analyze { location, .. } = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(location, None);
    }

    #[test]
    fn cli_parses_air() {
        let cli = Cli::parse_from(["respira", "air", "--location", "5548"]);
        let Command::Air { location } = cli.command else {
            panic!("expected air");
        };
        assert_eq!(location, Some(5548));
    }

    #[test]
    fn cli_parses_locations() {
        let cli = Cli::parse_from(["respira", "locations"]);
        assert!(matches!(cli.command, Command::Locations));
    }

    #[test]
    fn resolve_location_prefers_the_flag() {
        let settings = RespiraSettings::default();
        assert_eq!(
            resolve_location(&settings, Some(6983)),
            LocationId::from(6983)
        );
        assert_eq!(resolve_location(&settings, None), LocationId::from(5574));
    }

    #[test]
    fn gateway_config_carries_settings() {
        let mut settings = RespiraSettings::default();
        settings.gateway.base_url = "https://gw.example".into();
        settings.gateway.bearer_token = Some("tok-1".into());
        settings.gateway.timeout_ms = 5_000;

        let config = gateway_config(&settings);
        assert_eq!(config.base_url, "https://gw.example");
        assert_eq!(config.bearer_token.as_deref(), Some("tok-1"));
        assert_eq!(config.timeout, Duration::from_millis(5_000));
    }

    #[test]
    fn air_config_carries_settings() {
        let mut settings = RespiraSettings::default();
        settings.air_quality.cache_ttl_secs = 60;

        let config = air_config(&settings);
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.cache_ttl_secs, 60);
    }
}
