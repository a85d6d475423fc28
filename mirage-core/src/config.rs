//! # Config Loader — Loads and validates TOML configuration
//!
//! Reads `mirage.toml` (or a custom path) into typed config structs. Every
//! section has defaults matching the reference constants, so a missing file
//! or section degrades gracefully.

use crate::error::{MirageError, MirageResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Top-level mirage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MirageConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

/// Knobs for the capture session. Capacities and timing are tunable; the
/// probability buckets (threat rate, archetype thresholds, port split) are
/// fixed in the synthesizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Bounded event log capacity.
    pub log_capacity: usize,
    /// Bounded time-series capacity (chart history points).
    pub series_capacity: usize,
    /// Synthesis delay range, half-open: [min_delay_ms, max_delay_ms).
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Period of the counter flush loop.
    pub flush_interval_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            log_capacity: 100,
            series_capacity: 20,
            min_delay_ms: 50,
            max_delay_ms: 550,
            flush_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Gemini API key. Empty means "fall back to GEMINI_API_KEY env var";
    /// if that is also unset, analysis returns the missing-credential text.
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash".into(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
        }
    }
}

impl AiConfig {
    /// Resolve the effective API key: config value first, then environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty())
    }
}

impl MirageConfig {
    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> MirageResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MirageError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| {
            MirageError::Config(format!("cannot parse {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Write the configuration as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> MirageResult<()> {
        let rendered = toml::to_string_pretty(self)
            .map_err(|e| MirageError::Config(format!("cannot render config: {}", e)))?;
        std::fs::write(path.as_ref(), rendered)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_constants() {
        let config = MirageConfig::default();
        assert_eq!(config.capture.log_capacity, 100);
        assert_eq!(config.capture.series_capacity, 20);
        assert_eq!(config.capture.min_delay_ms, 50);
        assert_eq!(config.capture.max_delay_ms, 550);
        assert_eq!(config.capture.flush_interval_ms, 1000);
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.ai.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = MirageConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: MirageConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.capture.log_capacity, config.capture.log_capacity);
        assert_eq!(parsed.ai.endpoint, config.ai.endpoint);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: MirageConfig = toml::from_str("[capture]\nlog_capacity = 42\n").unwrap();
        assert_eq!(parsed.capture.log_capacity, 42);
        // Unspecified fields in a present section still default.
        assert_eq!(parsed.capture.series_capacity, 20);
        assert_eq!(parsed.general.log_level, "info");
    }
}
