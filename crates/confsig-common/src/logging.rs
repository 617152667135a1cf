//! ---
//! confsig_section: "01-core-functionality"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Shared primitives and utilities for the signaling client."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "CONFSIG_LOG";

static GUARDS: OnceCell<(WorkerGuard, WorkerGuard)> = OnceCell::new();

/// Available log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Origin of the filter directive in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSource {
    /// `CONFSIG_LOG`.
    Override,
    /// `RUST_LOG`.
    RustLog,
    /// `logging.level` from the configuration file.
    Config,
}

/// Pick the first directive that parses, in order: `CONFSIG_LOG`, `RUST_LOG`,
/// then the configured level. A configured level that does not parse falls
/// back to `info`.
pub fn resolve_filter(
    override_directive: Option<&str>,
    rust_log: Option<&str>,
    configured: &str,
) -> (EnvFilter, FilterSource) {
    let candidates = [
        (override_directive, FilterSource::Override),
        (rust_log, FilterSource::RustLog),
    ];
    for (directive, source) in candidates {
        let Some(directive) = directive else { continue };
        match EnvFilter::try_new(directive) {
            Ok(filter) => return (filter, source),
            Err(err) => eprintln!("ignoring invalid log directive {directive:?}: {err}"),
        }
    }
    let filter = EnvFilter::try_new(configured).unwrap_or_else(|_| EnvFilter::new("info"));
    (filter, FilterSource::Config)
}

/// Install the process-wide subscriber for a signaling client.
///
/// Human-facing output goes to stderr so that commands printing JSON on
/// stdout stay machine readable. Every event is also appended as JSON to a
/// daily rolling file in [`LoggingConfig::directory`].
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)?;
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);
    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, format!("{prefix}.log")));
    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = GUARDS.set((file_guard, console_guard));

    let override_directive = std::env::var(LOG_ENV).ok();
    let rust_log = std::env::var("RUST_LOG").ok();
    let (filter, source) = resolve_filter(
        override_directive.as_deref(),
        rust_log.as_deref(),
        &config.level,
    );

    let console_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .json()
            .with_writer(console_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_writer(console_writer)
            .boxed(),
    };
    let file_layer = fmt::layer()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer)
        .boxed();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .ok();

    info!(
        service = %service_name,
        log_dir = %config.directory.display(),
        filter_source = ?source,
        "tracing initialised"
    );
    Ok(())
}
