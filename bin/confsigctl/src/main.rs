//! ---
//! confsig_section: "05-operator-interfaces"
//! confsig_subsection: "binary"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Operator CLI for the conference signaling client."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use confsig_codec::negotiable_formats;
use confsig_common::SignalingConfig;
use confsig_logging as logging;

mod loopback;

const DEFAULT_CONFIG_CANDIDATES: &[&str] = &["confsig.toml", "/etc/confsig/confsig.toml"];

#[derive(Debug, Parser)]
#[command(author, version, about = "Conference signaling operator utility", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the negotiable video formats as JSON.
    Codecs(CodecsCommand),
    /// Load and validate a configuration file.
    #[command(name = "config-check")]
    ConfigCheck(ConfigCheckCommand),
    /// Run a scripted session against the in-memory transport.
    Loopback(loopback::LoopbackCommand),
}

#[derive(Debug, Args)]
struct CodecsCommand {
    /// Leave H.265 out of the table.
    #[arg(long = "disable-h265", action = clap::ArgAction::SetTrue)]
    disable_h265: bool,
}

#[derive(Debug, Args)]
struct ConfigCheckCommand {
    /// Configuration file to validate (defaults to the standard search path).
    #[arg(long = "config", value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Codecs(cmd) => {
            logging::init();
            let formats = negotiable_formats(!cmd.disable_h265);
            println!("{}", serde_json::to_string_pretty(&formats)?);
        }
        Commands::ConfigCheck(cmd) => {
            logging::init();
            let loaded = SignalingConfig::load_with_source(&config_candidates(cmd.config))?;
            let reconnection = &loaded.config.reconnection;
            println!("Configuration {} is valid", loaded.source.display());
            println!(
                "Reconnection: max_attempts={} refresh_margin={}s refresh_interval={}s",
                reconnection.max_attempts,
                reconnection.ticket_refresh_margin.as_secs(),
                reconnection.ticket_refresh_interval.as_secs()
            );
            println!("H.265 negotiation: {}", loaded.config.codecs.enable_h265);
        }
        Commands::Loopback(cmd) => loopback::run(cmd)?,
    }
    Ok(())
}

fn config_candidates(explicit: Option<PathBuf>) -> Vec<PathBuf> {
    match explicit {
        Some(path) => vec![path],
        None => DEFAULT_CONFIG_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .collect(),
    }
}
