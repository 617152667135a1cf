//! ---
//! confsig_section: "01-core-functionality"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Shared primitives and utilities for the signaling client."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_max_attempts() -> u32 {
    10
}

fn default_ticket_refresh_margin() -> Duration {
    Duration::from_secs(60)
}

/// Upper bound for `reconnection.ticket_refresh_margin`.
pub const MAX_TICKET_REFRESH_MARGIN: Duration = Duration::from_secs(24 * 60 * 60);

fn default_ticket_refresh_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_level() -> String {
    "warn,confsig_channel=info,confsig_msg=info,confsig_logging=info,confsigctl=info".to_owned()
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_enable_h265() -> bool {
    true
}

/// Primary configuration object for a signaling client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalingConfig {
    #[serde(default)]
    pub reconnection: ReconnectionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub codecs: CodecConfig,
}

/// Metadata describing where a [`SignalingConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedSignalingConfig {
    pub config: SignalingConfig,
    pub source: PathBuf,
}

impl SignalingConfig {
    pub const ENV_CONFIG_PATH: &str = "CONFSIG_CONFIG";

    /// Load configuration from disk, respecting the `CONFSIG_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedSignalingConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedSignalingConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedSignalingConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<SignalingConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.reconnection.validate()
    }
}

impl std::str::FromStr for SignalingConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: SignalingConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Reconnection attempt policy and ticket renewal timing.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectionConfig {
    /// Transport reconnection attempts tolerated before the session is declared lost.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// How long before a ticket's expiry the renewal is issued.
    #[serde(default = "default_ticket_refresh_margin")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub ticket_refresh_margin: Duration,
    /// Renewal delay used when the ticket carries no expiry.
    #[serde(default = "default_ticket_refresh_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub ticket_refresh_interval: Duration,
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            ticket_refresh_margin: default_ticket_refresh_margin(),
            ticket_refresh_interval: default_ticket_refresh_interval(),
        }
    }
}

impl ReconnectionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(anyhow!("reconnection.max_attempts must be at least 1"));
        }
        if self.ticket_refresh_margin > MAX_TICKET_REFRESH_MARGIN {
            return Err(anyhow!(
                "reconnection.ticket_refresh_margin must not exceed {} seconds",
                MAX_TICKET_REFRESH_MARGIN.as_secs()
            ));
        }
        if self.ticket_refresh_interval.is_zero() {
            return Err(anyhow!(
                "reconnection.ticket_refresh_interval must be greater than zero"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    /// Filter directive used when neither `CONFSIG_LOG` nor `RUST_LOG` is set.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            level: default_log_level(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    #[serde(default = "default_enable_h265")]
    pub enable_h265: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            enable_h265: default_enable_h265(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: SignalingConfig = "".parse().expect("empty config parses");
        assert_eq!(config.reconnection.max_attempts, 10);
        assert_eq!(
            config.reconnection.ticket_refresh_margin,
            Duration::from_secs(60)
        );
        assert!(config.codecs.enable_h265);
        assert!(config.logging.level.contains("confsig_channel=info"));
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = "[reconnection]\nmax_attempts = 0\n"
            .parse::<SignalingConfig>()
            .expect_err("zero attempts must be rejected");
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn oversized_refresh_margin_rejected() {
        let err = "[reconnection]\nticket_refresh_margin = 1000000000000000\n"
            .parse::<SignalingConfig>()
            .expect_err("margin beyond a day must be rejected");
        assert!(err.to_string().contains("ticket_refresh_margin"));

        let day: SignalingConfig = "[reconnection]\nticket_refresh_margin = 86400\n"
            .parse()
            .expect("a day of margin is accepted");
        assert_eq!(
            day.reconnection.ticket_refresh_margin,
            MAX_TICKET_REFRESH_MARGIN
        );
    }
}
