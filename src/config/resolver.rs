//! Unified precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (credentials and session secret only)
//! 3. Data-dir config.kdl (`<data-dir>/config.kdl`)
//! 4. System config.kdl (`~/.config/roadmap/config.kdl`)
//! 5. Built-in defaults

use serde::Serialize;
use std::path::Path;

use crate::{Error, Result};
use crate::config::schema::{
    self, DEFAULT_BACKLOG_STATUS, DEFAULT_OWNER, DEFAULT_PASSWORD, DEFAULT_SESSION_SECRET,
    DEFAULT_USERNAME, OutputFormat, RoadmapConfig, StatusColumn, StreamMeta,
};

/// Environment variable overriding the login username.
pub const USERNAME_ENV: &str = "ROADMAP_USERNAME";
/// Environment variable overriding the login password.
pub const PASSWORD_ENV: &str = "ROADMAP_PASSWORD";
/// Environment variable overriding the session signing secret.
pub const SESSION_SECRET_ENV: &str = "ROADMAP_SESSION_SECRET";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from the data-dir config.kdl
    DataDir,
    /// Value from the system config.kdl
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::DataDir => write!(f, "data-dir"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub output_format: Resolved<OutputFormat>,
    pub backlog_status: Resolved<String>,
    pub default_owner: Resolved<String>,
    pub username: Resolved<String>,
    #[serde(skip)]
    pub password: Resolved<String>,
    #[serde(skip)]
    pub session_secret: Resolved<String>,
    pub streams: Resolved<Vec<StreamMeta>>,
    pub status_columns: Resolved<Vec<StatusColumn>>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let defaults = RoadmapConfig::default();
        Self {
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            backlog_status: Resolved::new(DEFAULT_BACKLOG_STATUS.to_string(), ValueSource::Default),
            default_owner: Resolved::new(DEFAULT_OWNER.to_string(), ValueSource::Default),
            username: Resolved::new(DEFAULT_USERNAME.to_string(), ValueSource::Default),
            password: Resolved::new(DEFAULT_PASSWORD.to_string(), ValueSource::Default),
            session_secret: Resolved::new(DEFAULT_SESSION_SECRET.to_string(), ValueSource::Default),
            streams: Resolved::new(defaults.streams(), ValueSource::Default),
            status_columns: Resolved::new(defaults.status_columns(), ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format.value
    }

    /// The effective values as a plain config, every field set.
    pub fn to_config(&self) -> RoadmapConfig {
        RoadmapConfig {
            output_format: Some(self.output_format.value.clone()),
            backlog_status: Some(self.backlog_status.value.clone()),
            default_owner: Some(self.default_owner.value.clone()),
            username: Some(self.username.value.clone()),
            password: Some(self.password.value.clone()),
            session_secret: Some(self.session_secret.value.clone()),
            streams: self.streams.value.clone(),
            status_columns: self.status_columns.value.clone(),
        }
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

/// Pick the first set value among the layers, tagging its source.
fn pick<T: Clone>(
    layers: &[(Option<&T>, ValueSource)],
    default: Resolved<T>,
) -> Resolved<T> {
    layers
        .iter()
        .find_map(|(value, source)| value.map(|v| Resolved::new(v.clone(), source.clone())))
        .unwrap_or(default)
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// list layers count as set only when non-empty
#[allow(clippy::ptr_arg)]
fn set_list<T>(v: &Vec<T>) -> Option<&Vec<T>> {
    if v.is_empty() { None } else { Some(v) }
}

/// Resolve configuration with full precedence chain.
pub fn resolve_config(data_dir: &Path, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system = match schema::system_config_path() {
        Some(path) => schema::read_config(&path)?,
        None => RoadmapConfig::default(),
    };
    let data = schema::read_config(&schema::data_config_path(data_dir))?;
    let resolved = resolve_layers(&data, &system, overrides);
    resolved.to_config().validate().map_err(Error::InvalidInput)?;
    Ok(resolved)
}

/// Resolve already-loaded layers. Environment variables are read here.
pub fn resolve_layers(
    data: &RoadmapConfig,
    system: &RoadmapConfig,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let env_username = env_value(USERNAME_ENV);
    let env_password = env_value(PASSWORD_ENV);
    let env_secret = env_value(SESSION_SECRET_ENV);

    ResolvedConfig {
        output_format: pick(
            &[
                (overrides.output_format.as_ref(), ValueSource::CliFlag),
                (data.output_format.as_ref(), ValueSource::DataDir),
                (system.output_format.as_ref(), ValueSource::System),
            ],
            defaults.output_format,
        ),
        backlog_status: pick(
            &[
                (data.backlog_status.as_ref(), ValueSource::DataDir),
                (system.backlog_status.as_ref(), ValueSource::System),
            ],
            defaults.backlog_status,
        ),
        default_owner: pick(
            &[
                (data.default_owner.as_ref(), ValueSource::DataDir),
                (system.default_owner.as_ref(), ValueSource::System),
            ],
            defaults.default_owner,
        ),
        username: pick(
            &[
                (env_username.as_ref(), ValueSource::EnvVar(USERNAME_ENV.to_string())),
                (data.username.as_ref(), ValueSource::DataDir),
                (system.username.as_ref(), ValueSource::System),
            ],
            defaults.username,
        ),
        password: pick(
            &[
                (env_password.as_ref(), ValueSource::EnvVar(PASSWORD_ENV.to_string())),
                (data.password.as_ref(), ValueSource::DataDir),
                (system.password.as_ref(), ValueSource::System),
            ],
            defaults.password,
        ),
        session_secret: pick(
            &[
                (env_secret.as_ref(), ValueSource::EnvVar(SESSION_SECRET_ENV.to_string())),
                (data.session_secret.as_ref(), ValueSource::DataDir),
                (system.session_secret.as_ref(), ValueSource::System),
            ],
            defaults.session_secret,
        ),
        streams: pick(
            &[
                (set_list(&data.streams), ValueSource::DataDir),
                (set_list(&system.streams), ValueSource::System),
            ],
            defaults.streams,
        ),
        status_columns: pick(
            &[
                (set_list(&data.status_columns), ValueSource::DataDir),
                (set_list(&system.status_columns), ValueSource::System),
            ],
            defaults.status_columns,
        ),
    }
}
