//! The Feature view-model.
//!
//! Every view (Gantt, list, Kanban, table) consumes the same shape, derived from a
//! [`ProjectWithRelations`]. Relations that are absent on the record become
//! empty sentinel objects, so consumers never branch on a missing sub-object,
//! only on empty ids or names.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{ProjectUpdate, ProjectWithRelations};
use crate::{Error, Result};

/// Date format used for persisted calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Status as shown on a feature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureStatus {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// Owner as shown on a feature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureOwner {
    pub id: String,
    pub name: String,
    pub avatar_url: String,
    pub role: Option<String>,
}

impl FeatureOwner {
    /// The placeholder used when a project has no owner.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    /// Two-letter fallback for avatar rendering.
    pub fn initials(&self) -> String {
        self.name.chars().take(2).collect()
    }
}

/// Id/name pair for stream, initiative and release relations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureRef {
    pub id: String,
    pub name: String,
}

impl FeatureRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// The placeholder used when the relation is absent.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

/// A project as consumed by the views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: String,
    pub name: String,
    pub description: String,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub status: FeatureStatus,
    pub owner: FeatureOwner,
    /// Stream, keyed as "group" by the Gantt view
    pub group: FeatureRef,
    /// Same stream, keyed as "product" by filters and forms
    pub product: FeatureRef,
    pub initiative: FeatureRef,
    pub release: FeatureRef,
}

impl Feature {
    /// Calendar day the feature starts on.
    pub fn start_date(&self) -> NaiveDate {
        self.start_at.date()
    }

    /// Calendar day the feature ends on.
    pub fn end_date(&self) -> NaiveDate {
        self.end_at.date()
    }

    /// Build the persisted update payload for this feature.
    ///
    /// Dates are truncated to their calendar day; any time of day attached by a
    /// drag in the timeline is dropped.
    pub fn to_update(&self) -> ProjectUpdate {
        ProjectUpdate {
            name: Some(self.name.clone()),
            description: Some(non_empty(&self.description)),
            start_date: Some(self.start_date()),
            end_date: Some(self.end_date()),
            status_id: Some(self.status.id.clone()),
            stream_id: Some(self.product.id.clone()),
            owner_id: Some(non_empty(&self.owner.id)),
            initiative_id: Some(non_empty(&self.initiative.id)),
            release_id: Some(non_empty(&self.release.id)),
            progress: None,
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Transform a persisted project into a feature. Total: never fails.
pub fn to_feature(record: &ProjectWithRelations) -> Feature {
    let project = &record.project;
    let stream = FeatureRef::new(&record.stream.id, &record.stream.name);

    Feature {
        id: project.id.clone(),
        name: project.name.clone(),
        description: project.description.clone().unwrap_or_default(),
        start_at: midnight(project.start_date),
        end_at: midnight(project.end_date),
        status: FeatureStatus {
            id: record.status.id.clone(),
            name: record.status.name.clone(),
            color: record.status.color.clone(),
        },
        owner: record
            .owner
            .as_ref()
            .map(|owner| FeatureOwner {
                id: owner.id.clone(),
                name: owner.name.clone(),
                avatar_url: owner.avatar_url.clone().unwrap_or_default(),
                role: owner.role.clone(),
            })
            .unwrap_or_else(FeatureOwner::none),
        group: stream.clone(),
        product: stream,
        initiative: record
            .initiative
            .as_ref()
            .map(|i| FeatureRef::new(&i.id, &i.name))
            .unwrap_or_else(FeatureRef::none),
        release: record
            .release
            .as_ref()
            .map(|r| FeatureRef::new(&r.id, &r.name))
            .unwrap_or_else(FeatureRef::none),
    }
}

/// Start of the given calendar day.
pub fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Format a calendar date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a calendar date.
///
/// Accepts `YYYY-MM-DD`, or an ISO 8601 date-time whose date component is kept.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Ok(date);
    }
    if let Ok(dt) = s.parse::<chrono::DateTime<chrono::FixedOffset>>() {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = s.parse::<NaiveDateTime>() {
        return Ok(dt.date());
    }
    Err(Error::InvalidDate(s.to_string()))
}
