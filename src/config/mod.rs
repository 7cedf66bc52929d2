//! Configuration for roadmap.
//!
//! ## config.kdl - preferences and screen settings
//!
//! Located at:
//! - System: `~/.config/roadmap/config.kdl`
//! - Data dir: `<data-dir>/config.kdl`
//!
//! Contains:
//! - `output-format` - "json" or "human"
//! - `backlog-status` - status that separates backlog from roadmap
//! - `default-owner` - owner assigned when a form leaves it blank
//! - `username`, `password`, `session-secret` - the shared login
//! - `stream` nodes - stream display metadata
//! - `status-column` nodes - columns of the list and board views
//!
//! ## Precedence
//!
//! CLI flag > env var > data-dir config > system config > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, PASSWORD_ENV, Resolved, ResolvedConfig, SESSION_SECRET_ENV, USERNAME_ENV,
    ValueSource, resolve_config, resolve_layers,
};
#[cfg(unix)]
pub use schema::CONFIG_FILE_MODE;
pub use schema::{OutputFormat, RoadmapConfig, StatusColumn, StreamMeta};
