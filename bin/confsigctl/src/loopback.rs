//! ---
//! confsig_section: "05-operator-interfaces"
//! confsig_subsection: "binary"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Operator CLI for the conference signaling client."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
//! Scripted session over the in-memory transport: connect, send, lose the
//! connection, resume with the reconnection ticket and acknowledge everything.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use confsig_channel::SignalingChannel;
use confsig_common::{init_tracing, ReconnectionConfig, SignalingConfig};
use confsig_logging as logging;
use confsig_msg::{events, ChannelMetrics, InMemoryTransport};
use serde_json::json;
use tracing::info;

const LOOPBACK_ROOM: &str = "loopback-room";
const LOOPBACK_TICKET: &str = "loopback-ticket";

#[derive(Debug, Args)]
pub struct LoopbackCommand {
    /// Configuration supplying the reconnection policy.
    #[arg(long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Token presented on login.
    #[arg(long = "token", default_value = "loopback-token")]
    token: String,

    /// Messages sent before the connection drops.
    #[arg(long = "messages", default_value_t = 3)]
    messages: usize,

    /// Write rolling log files to this directory.
    #[arg(long = "log-dir", value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

pub fn run(command: LoopbackCommand) -> Result<()> {
    let config = match &command.config {
        Some(path) => SignalingConfig::load(&[path])?,
        None => SignalingConfig::default(),
    };
    match &command.log_dir {
        Some(dir) => {
            let mut logging_config = config.logging.clone();
            logging_config.directory = dir.clone();
            init_tracing("confsigctl", &logging_config)?;
        }
        None => logging::init(),
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    let metrics = runtime.block_on(run_session(
        config.reconnection.clone(),
        &command.token,
        command.messages,
    ))?;

    let report = json!({
        "room": LOOPBACK_ROOM,
        "emitted": metrics.emitted,
        "acknowledged": metrics.acknowledged,
        "failed": metrics.failed,
        "drained": metrics.drained,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_session(
    reconnection: ReconnectionConfig,
    token: &str,
    messages: usize,
) -> Result<ChannelMetrics> {
    let transport = InMemoryTransport::new();
    transport.accept_with(json!({
        "id": LOOPBACK_ROOM,
        "reconnectionTicket": LOOPBACK_TICKET,
    }));
    let channel = SignalingChannel::new(Arc::new(transport.clone()), reconnection);
    channel.connect(token).await?;

    let pending: Vec<_> = (0..messages)
        .map(|n| channel.send_custom_message(&format!("loopback message {n}"), ""))
        .collect();

    transport.simulate_disconnect();
    transport.simulate_reconnecting();
    transport.simulate_reconnected();
    let relogin = transport
        .frames_for(events::RELOGIN)
        .pop()
        .context("session resumption did not send relogin")?;
    transport.ack_ok(relogin.seq);
    info!(state = %channel.state(), "loopback session resumed");

    for frame in transport
        .frames()
        .into_iter()
        .filter(|frame| frame.seq > relogin.seq)
    {
        transport.ack_ok(frame.seq);
    }
    for outcome in pending {
        outcome.await?;
    }

    channel.disconnect();
    Ok(channel.metrics())
}
