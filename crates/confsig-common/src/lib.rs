//! ---
//! confsig_section: "01-core-functionality"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Shared primitives and utilities for the signaling client."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
//! Core shared primitives for the conference signaling workspace.
//! This crate exposes configuration loading and tracing initialisation
//! consumed by the channel crates and the operator CLI.

pub mod config;
pub mod logging;

pub use config::{
    CodecConfig, LoadedSignalingConfig, LoggingConfig, ReconnectionConfig, SignalingConfig,
};
pub use logging::{init_tracing, resolve_filter, FilterSource, LogFormat};
