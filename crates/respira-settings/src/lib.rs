//! # respira-settings
//!
//! Configuration with layered sources for the respira workflow.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`RespiraSettings::default()`]
//! 2. **User file** — `~/.respira/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `RESPIRA_*` overrides (highest priority)
//!
//! The CLI loads settings once at startup and passes values down; nothing
//! reloads at runtime, so there is no global singleton here.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::{AirQualitySettings, GatewaySettings, LoggingSettings, RespiraSettings};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
