//! Data models for roadmap entities.
//!
//! This module defines the persisted records:
//! - `Status`, `Stream`, `Owner`, `User`, `Initiative`, `Release` - reference data
//! - `Project` - the planned work item, with `ProjectWithRelations` for joined reads
//! - `NewProject` / `ProjectUpdate` - write payloads
//!
//! and re-exports the derived shapes from [`bucket`] and [`feature`].

pub mod bucket;
pub mod feature;

pub use bucket::{Bucket, classify};
pub use feature::{
    Feature, FeatureOwner, FeatureRef, FeatureStatus, format_date, parse_date, to_feature,
};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of persisted entity, used to address the repository generically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Status,
    Stream,
    Owner,
    User,
    Initiative,
    Release,
    Project,
}

impl EntityKind {
    /// Parse an entity kind, accepting singular and plural spellings.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "status" | "statuses" => Some(Self::Status),
            "stream" | "streams" => Some(Self::Stream),
            "owner" | "owners" => Some(Self::Owner),
            "user" | "users" => Some(Self::User),
            "initiative" | "initiatives" => Some(Self::Initiative),
            "release" | "releases" => Some(Self::Release),
            "project" | "projects" => Some(Self::Project),
            _ => None,
        }
    }

    /// Table backing this kind.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Status => "statuses",
            Self::Stream => "streams",
            Self::Owner => "owners",
            Self::User => "users",
            Self::Initiative => "initiatives",
            Self::Release => "releases",
            Self::Project => "projects",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Stream => "stream",
            Self::Owner => "owner",
            Self::User => "user",
            Self::Initiative => "initiative",
            Self::Release => "release",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Common accessors for reference rows looked up by name.
pub trait Named {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

macro_rules! impl_named {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Named for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn name(&self) -> &str {
                    &self.name
                }
            }
        )*
    };
}

impl_named!(Status, Stream, Owner, User, Initiative, Release);

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Workflow status of a project (e.g. "In progress", "Backlog").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    pub name: String,
    /// Display color as a hex string
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Status {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            color: color.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Product stream a project belongs to. Views key on it as "group" and "product".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub id: String,
    pub name: String,
    pub color: String,
    /// Icon identifier used by renderers
    pub icon: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stream {
    pub fn new(name: impl Into<String>, color: impl Into<String>, icon: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            color: color.into(),
            icon: icon.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Person accountable for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Owner {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            role: None,
            email: None,
            phone: None,
            avatar_url: None,
            slack_handle: None,
            bio: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Application user. The "Product Team" user is the fallback project owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            email: None,
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// View a user as an owner row, for projects whose owner_id points at a user.
    pub fn as_owner(&self) -> Owner {
        Owner {
            id: self.id.clone(),
            name: self.name.clone(),
            role: None,
            email: self.email.clone(),
            phone: None,
            avatar_url: self.image.clone(),
            slack_handle: None,
            bio: None,
            active: true,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Planning initiative (first bucket, second bucket, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initiative {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Initiative {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Release train, ordered by (year, quarter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: String,
    pub name: String,
    /// Quarter label such as "Q1"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Release {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            quarter: None,
            year: None,
            release_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A planned project as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Calendar start date (no time of day)
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status_id: String,
    pub stream_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initiative_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_id: Option<String>,
    /// Completion percentage
    #[serde(default)]
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A project with its reference rows eagerly joined.
///
/// `status` and `stream` are required relations; the others may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectWithRelations {
    #[serde(flatten)]
    pub project: Project,
    pub status: Status,
    pub stream: Stream,
    pub owner: Option<Owner>,
    pub initiative: Option<Initiative>,
    pub release: Option<Release>,
}

/// Insert payload for a project. Server-assigned fields are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status_id: String,
    pub stream_id: String,
    pub owner_id: Option<String>,
    pub initiative_id: Option<String>,
    pub release_id: Option<String>,
    #[serde(default)]
    pub progress: u8,
}

/// Partial update payload for a project.
///
/// `None` leaves a column unchanged. For nullable columns, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiative_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl ProjectUpdate {
    /// True when the payload would not change any column.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.status_id.is_none()
            && self.stream_id.is_none()
            && self.owner_id.is_none()
            && self.initiative_id.is_none()
            && self.release_id.is_none()
            && self.progress.is_none()
    }

    /// Apply this payload onto a persisted project.
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(ref name) = self.name {
            project.name = name.clone();
        }
        if let Some(ref description) = self.description {
            project.description = description.clone();
        }
        if let Some(start) = self.start_date {
            project.start_date = start;
        }
        if let Some(end) = self.end_date {
            project.end_date = end;
        }
        if let Some(ref status_id) = self.status_id {
            project.status_id = status_id.clone();
        }
        if let Some(ref stream_id) = self.stream_id {
            project.stream_id = stream_id.clone();
        }
        if let Some(ref owner_id) = self.owner_id {
            project.owner_id = owner_id.clone();
        }
        if let Some(ref initiative_id) = self.initiative_id {
            project.initiative_id = initiative_id.clone();
        }
        if let Some(ref release_id) = self.release_id {
            project.release_id = release_id.clone();
        }
        if let Some(progress) = self.progress {
            project.progress = progress;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_parse() {
        assert_eq!(EntityKind::parse("statuses"), Some(EntityKind::Status));
        assert_eq!(EntityKind::parse("Stream"), Some(EntityKind::Stream));
        assert_eq!(EntityKind::parse("release"), Some(EntityKind::Release));
        assert_eq!(EntityKind::parse("widgets"), None);
    }

    #[test]
    fn test_entity_kind_table() {
        assert_eq!(EntityKind::Status.table(), "statuses");
        assert_eq!(EntityKind::Project.table(), "projects");
    }

    #[test]
    fn test_user_as_owner_carries_image() {
        let mut user = User::new("Product Team");
        user.image = Some("https://example.test/team.png".to_string());
        let owner = user.as_owner();
        assert_eq!(owner.id, user.id);
        assert_eq!(owner.avatar_url.as_deref(), Some("https://example.test/team.png"));
        assert!(owner.role.is_none());
    }

    #[test]
    fn test_project_update_apply_clears_owner() {
        let now = Utc::now();
        let mut project = Project {
            id: "p1".to_string(),
            name: "Old".to_string(),
            description: Some("desc".to_string()),
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            status_id: "s1".to_string(),
            stream_id: "st1".to_string(),
            owner_id: Some("o1".to_string()),
            initiative_id: None,
            release_id: None,
            progress: 10,
            created_at: now,
            updated_at: now,
        };

        let update = ProjectUpdate {
            name: Some("New".to_string()),
            owner_id: Some(None),
            ..Default::default()
        };
        update.apply_to(&mut project);

        assert_eq!(project.name, "New");
        assert_eq!(project.owner_id, None);
        assert_eq!(project.description.as_deref(), Some("desc"));
        assert_eq!(project.progress, 10);
    }

    #[test]
    fn test_project_update_is_empty() {
        assert!(ProjectUpdate::default().is_empty());
        let update = ProjectUpdate {
            progress: Some(50),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
