//! KDL schema for config.kdl.
//!
//! This module provides:
//! - Rust structs representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation
//! - Default values (the stock streams and status columns)

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Status that separates the backlog screen from the roadmap.
pub const DEFAULT_BACKLOG_STATUS: &str = "Backlog";

/// Owner assigned when a form leaves the owner blank.
pub const DEFAULT_OWNER: &str = "Product Team";

/// Shared login when none is configured.
pub const DEFAULT_USERNAME: &str = "payProduct";
pub const DEFAULT_PASSWORD: &str = "payProduct!@#";

/// Signing secret when none is configured.
pub const DEFAULT_SESSION_SECRET: &str = "roadmap-session-secret";

/// Environment variable overriding the system config directory.
pub const CONFIG_DIR_ENV: &str = "ROADMAP_CONFIG_DIR";

/// Required permissions for config.kdl (Unix: 0644, readable by all).
#[cfg(unix)]
pub const CONFIG_FILE_MODE: u32 = 0o644;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display metadata for one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMeta {
    pub name: String,
    pub color: String,
    pub icon: String,
}

impl StreamMeta {
    pub fn new(name: &str, color: &str, icon: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            icon: icon.to_string(),
        }
    }
}

/// One column of the list and board views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusColumn {
    pub name: String,
    pub color: String,
}

impl StatusColumn {
    pub fn new(name: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
        }
    }
}

/// Streams shown when config.kdl names none.
pub fn default_streams() -> Vec<StreamMeta> {
    vec![
        StreamMeta::new("Payments", "#3B82F6", "dollar-sign"),
        StreamMeta::new("Rewards", "#A855F7", "trending-up"),
        StreamMeta::new("Growth", "#10B981", "users"),
        StreamMeta::new("US", "#EF4444", "globe"),
        StreamMeta::new("Mobile", "#F97316", "smartphone"),
    ]
}

/// Status columns shown when config.kdl names none.
pub fn default_status_columns() -> Vec<StatusColumn> {
    vec![
        StatusColumn::new("Not started", "#6B7280"),
        StatusColumn::new("In progress", "#3B82F6"),
        StatusColumn::new("At risk", "#F59E0B"),
        StatusColumn::new("Done", "#10B981"),
        StatusColumn::new("Cancelled", "#EF4444"),
    ]
}

/// Preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// output-format "human"
/// backlog-status "Backlog"
/// default-owner "Product Team"
/// username "payProduct"
/// password "payProduct!@#"
/// session-secret "change-me"
/// stream "Payments" color="#3B82F6" icon="dollar-sign"
/// status-column "Done" color="#10B981"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapConfig {
    pub output_format: Option<OutputFormat>,
    pub backlog_status: Option<String>,
    pub default_owner: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub session_secret: Option<String>,
    /// Empty means the stock streams
    pub streams: Vec<StreamMeta>,
    /// Empty means the stock columns
    pub status_columns: Vec<StatusColumn>,
}

impl RoadmapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the values a single file can check on its own.
    pub fn validate_values(&self) -> std::result::Result<(), String> {
        if self.backlog_status.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err("backlog-status must not be empty".to_string());
        }
        for stream in &self.streams {
            if !is_hex_color(&stream.color) {
                return Err(format!(
                    "stream \"{}\" has invalid color {}",
                    stream.name, stream.color
                ));
            }
        }
        for column in &self.status_columns {
            if !is_hex_color(&column.color) {
                return Err(format!(
                    "status-column \"{}\" has invalid color {}",
                    column.name, column.color
                ));
            }
        }
        Ok(())
    }

    /// Validate the config as the effective one.
    ///
    /// An unset backlog status counts as the default, and no status column may
    /// carry it.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.validate_values()?;
        let backlog = self.backlog_status();
        if let Some(column) = self.status_columns.iter().find(|c| c.name == backlog) {
            return Err(format!(
                "status-column \"{}\" is the backlog status",
                column.name
            ));
        }
        Ok(())
    }

    pub fn backlog_status(&self) -> &str {
        self.backlog_status.as_deref().unwrap_or(DEFAULT_BACKLOG_STATUS)
    }

    pub fn default_owner(&self) -> &str {
        self.default_owner.as_deref().unwrap_or(DEFAULT_OWNER)
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format.clone().unwrap_or_default()
    }

    /// Configured streams, or the stock ones.
    pub fn streams(&self) -> Vec<StreamMeta> {
        if self.streams.is_empty() {
            default_streams()
        } else {
            self.streams.clone()
        }
    }

    /// Configured status columns, or the stock ones.
    pub fn status_columns(&self) -> Vec<StatusColumn> {
        if self.status_columns.is_empty() {
            default_status_columns()
        } else {
            self.status_columns.clone()
        }
    }

    pub fn stream_names(&self) -> Vec<String> {
        self.streams().into_iter().map(|s| s.name).collect()
    }

    /// Parse config from a KDL document. Unknown nodes are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        config.output_format =
            first_string(doc, "output-format").and_then(|s| OutputFormat::parse(&s));
        config.backlog_status = first_string(doc, "backlog-status");
        config.default_owner = first_string(doc, "default-owner");
        config.username = first_string(doc, "username");
        config.password = first_string(doc, "password");
        config.session_secret = first_string(doc, "session-secret");

        for node in doc.nodes() {
            match node.name().value() {
                "stream" => {
                    if let Some(name) = first_arg(node) {
                        config.streams.push(StreamMeta {
                            name,
                            color: property(node, "color").unwrap_or_else(|| "#6B7280".to_string()),
                            icon: property(node, "icon").unwrap_or_else(|| "circle".to_string()),
                        });
                    }
                }
                "status-column" => {
                    if let Some(name) = first_arg(node) {
                        config.status_columns.push(StatusColumn {
                            name,
                            color: property(node, "color").unwrap_or_else(|| "#6B7280".to_string()),
                        });
                    }
                }
                _ => {}
            }
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        let scalars = [
            ("output-format", self.output_format.as_ref().map(|f| f.as_str().to_string())),
            ("backlog-status", self.backlog_status.clone()),
            ("default-owner", self.default_owner.clone()),
            ("username", self.username.clone()),
            ("password", self.password.clone()),
            ("session-secret", self.session_secret.clone()),
        ];
        for (key, value) in scalars {
            if let Some(value) = value {
                let mut node = KdlNode::new(key);
                node.push(KdlEntry::new(KdlValue::String(value)));
                doc.nodes_mut().push(node);
            }
        }

        for stream in &self.streams {
            let mut node = KdlNode::new("stream");
            node.push(KdlEntry::new(KdlValue::String(stream.name.clone())));
            node.push(KdlEntry::new_prop("color", KdlValue::String(stream.color.clone())));
            node.push(KdlEntry::new_prop("icon", KdlValue::String(stream.icon.clone())));
            doc.nodes_mut().push(node);
        }

        for column in &self.status_columns {
            let mut node = KdlNode::new("status-column");
            node.push(KdlEntry::new(KdlValue::String(column.name.clone())));
            node.push(KdlEntry::new_prop("color", KdlValue::String(column.color.clone())));
            doc.nodes_mut().push(node);
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are set.
    pub fn merge(&mut self, other: &RoadmapConfig) {
        if other.output_format.is_some() {
            self.output_format = other.output_format.clone();
        }
        if other.backlog_status.is_some() {
            self.backlog_status = other.backlog_status.clone();
        }
        if other.default_owner.is_some() {
            self.default_owner = other.default_owner.clone();
        }
        if other.username.is_some() {
            self.username = other.username.clone();
        }
        if other.password.is_some() {
            self.password = other.password.clone();
        }
        if other.session_secret.is_some() {
            self.session_secret = other.session_secret.clone();
        }
        if !other.streams.is_empty() {
            self.streams = other.streams.clone();
        }
        if !other.status_columns.is_empty() {
            self.status_columns = other.status_columns.clone();
        }
    }
}

fn first_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(str::to_string)
}

fn first_string(doc: &KdlDocument, key: &str) -> Option<String> {
    doc.get(key).and_then(first_arg)
}

fn property(node: &KdlNode, key: &str) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(key))
        .and_then(|e| e.value().as_string())
        .map(str::to_string)
}

pub(crate) fn is_hex_color(s: &str) -> bool {
    let Some(hex) = s.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// Path of config.kdl inside a data directory.
pub fn data_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.kdl")
}

/// Path of the system config.kdl (`~/.config/roadmap/config.kdl`).
///
/// `ROADMAP_CONFIG_DIR` replaces the `~/.config/roadmap` part.
pub fn system_config_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir).join("config.kdl"));
    }
    dirs::config_dir().map(|d| d.join("roadmap").join("config.kdl"))
}

/// Read a config file. A missing file is an empty config.
pub fn read_config(path: &Path) -> Result<RoadmapConfig> {
    if !path.exists() {
        return Ok(RoadmapConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let doc: KdlDocument = content.parse()?;
    let config = RoadmapConfig::from_kdl(&doc);
    config
        .validate_values()
        .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))?;
    Ok(config)
}

/// Write a config file, creating parent directories.
pub fn write_config(path: &Path, config: &RoadmapConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, config.to_kdl().to_string())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(CONFIG_FILE_MODE))?;
    }

    Ok(())
}
