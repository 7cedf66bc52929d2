//! View grouping contracts.
//!
//! Each renderer consumes the same visible features but arranges them
//! differently:
//! - Gantt: one group per stream, groups sorted by name
//! - List and Kanban: one lane per configured status column
//! - Table: flat rows, sortable by column
//!
//! Drag moves made in these views only touch the [`FeatureStore`]; they are a
//! preview and are never written back.

use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::config::StatusColumn;
use crate::models::{Feature, FeatureStatus};
use crate::reference::ReferenceData;
use crate::store::FeatureStore;
use crate::{Error, Result};

/// Which renderer a caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Gantt,
    List,
    Kanban,
    Table,
}

impl ViewKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gantt" | "timeline" => Some(Self::Gantt),
            "list" => Some(Self::List),
            "kanban" | "board" => Some(Self::Kanban),
            "table" => Some(Self::Table),
            _ => None,
        }
    }
}

/// Features of one stream on the timeline.
#[derive(Debug, Clone, Serialize)]
pub struct GanttGroup<'a> {
    pub name: String,
    pub features: Vec<&'a Feature>,
}

/// Group features by stream name, groups in name order, features in input order.
pub fn gantt_groups<'a>(features: &[&'a Feature]) -> Vec<GanttGroup<'a>> {
    let mut groups: BTreeMap<&str, Vec<&'a Feature>> = BTreeMap::new();
    for feature in features {
        groups.entry(feature.group.name.as_str()).or_default().push(feature);
    }
    groups
        .into_iter()
        .map(|(name, features)| GanttGroup {
            name: name.to_string(),
            features,
        })
        .collect()
}

/// One status column of the list or board view.
#[derive(Debug, Clone, Serialize)]
pub struct StatusLane<'a> {
    pub name: String,
    pub color: String,
    pub features: Vec<&'a Feature>,
}

/// Arrange features into the configured status columns.
///
/// Features whose status has no column are not shown.
pub fn status_lanes<'a>(features: &[&'a Feature], columns: &[StatusColumn]) -> Vec<StatusLane<'a>> {
    columns
        .iter()
        .map(|column| StatusLane {
            name: column.name.clone(),
            color: column.color.clone(),
            features: features
                .iter()
                .copied()
                .filter(|f| f.status.name == column.name)
                .collect(),
        })
        .collect()
}

/// Drop a feature onto a status lane.
///
/// The lane must be one of the configured columns and its status must exist in
/// the reference data. Returns false when nothing moved.
pub fn drop_on_lane(
    store: &mut FeatureStore,
    feature_id: &str,
    lane: &str,
    columns: &[StatusColumn],
    reference: &ReferenceData,
) -> bool {
    let Some(column) = columns.iter().find(|c| c.name == lane) else {
        return false;
    };
    let Some(known) = reference.status(&column.name) else {
        return false;
    };
    let status = FeatureStatus {
        id: known.id.clone(),
        name: column.name.clone(),
        color: column.color.clone(),
    };
    store.move_status(feature_id, status)
}

/// Sortable table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableColumn {
    Name,
    Owner,
    Status,
    Start,
    End,
    Release,
}

impl TableColumn {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "owner" => Ok(Self::Owner),
            "status" => Ok(Self::Status),
            "start" | "start_at" | "started" => Ok(Self::Start),
            "end" | "end_at" => Ok(Self::End),
            "release" => Ok(Self::Release),
            _ => Err(Error::InvalidInput(format!("Unknown table column: {}", s))),
        }
    }
}

/// One row of the table view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub status: String,
    pub status_color: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub release: String,
}

impl From<&Feature> for TableRow {
    fn from(feature: &Feature) -> Self {
        Self {
            id: feature.id.clone(),
            name: feature.name.clone(),
            owner: feature.owner.name.clone(),
            status: feature.status.name.clone(),
            status_color: feature.status.color.clone(),
            start: feature.start_date(),
            end: feature.end_date(),
            release: feature.release.name.clone(),
        }
    }
}

/// Table rows sorted by a column. Sorting is stable.
pub fn table_rows(features: &[&Feature], sort: TableColumn, descending: bool) -> Vec<TableRow> {
    let mut rows: Vec<TableRow> = features.iter().map(|f| TableRow::from(*f)).collect();
    rows.sort_by(|a, b| {
        let ord = compare(a, b, sort);
        if descending { ord.reverse() } else { ord }
    });
    rows
}

fn compare(a: &TableRow, b: &TableRow, column: TableColumn) -> Ordering {
    match column {
        TableColumn::Name => a.name.cmp(&b.name),
        TableColumn::Owner => a.owner.cmp(&b.owner),
        TableColumn::Status => a.status.cmp(&b.status),
        TableColumn::Start => a.start.cmp(&b.start),
        TableColumn::End => a.end.cmp(&b.end),
        TableColumn::Release => a.release.cmp(&b.release),
    }
}

/// Long display date, e.g. "Oct 18, 2026".
pub fn display_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Short display date, e.g. "Oct 18".
pub fn short_date(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// Date span shown on board cards, e.g. "Oct 18 - Nov 17, 2026".
pub fn card_span(feature: &Feature) -> String {
    format!(
        "{} - {}",
        short_date(feature.start_date()),
        display_date(feature.end_date())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoadmapConfig;
    use crate::models::Status;
    use crate::store::Membership;
    use crate::test_utils::{date, feature};

    fn columns() -> Vec<StatusColumn> {
        RoadmapConfig::default().status_columns()
    }

    #[test]
    fn test_gantt_groups_sorted_by_stream() {
        let a = feature("a", "Done", "Rewards");
        let b = feature("b", "Done", "Growth");
        let c = feature("c", "Done", "Rewards");
        let d = feature("d", "Done", "Mobile");
        let features = vec![&a, &b, &c, &d];

        let groups = gantt_groups(&features);
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Growth", "Mobile", "Rewards"]);

        let rewards: Vec<&str> = groups[2].features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(rewards, vec!["a", "c"]);
    }

    #[test]
    fn test_status_lanes_follow_column_order() {
        let a = feature("a", "Done", "Payments");
        let b = feature("b", "In progress", "Payments");
        let c = feature("c", "Backlog", "Payments");
        let features = vec![&a, &b, &c];

        let lanes = status_lanes(&features, &columns());
        let names: Vec<&str> = lanes.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Not started", "In progress", "At risk", "Done", "Cancelled"]
        );
        assert_eq!(lanes[1].features[0].id, "b");
        assert_eq!(lanes[3].features[0].id, "a");
        // Backlog has no column on the board
        let shown: usize = lanes.iter().map(|l| l.features.len()).sum();
        assert_eq!(shown, 2);
    }

    #[test]
    fn test_drop_on_lane_uses_reference_status_id() {
        let mut store = FeatureStore::new(Membership::All);
        store.insert(feature("a", "Not started", "Payments"));
        let at_risk = Status::new("At risk", "#F59E0B");
        let reference =
            ReferenceData::new(vec![at_risk.clone()], vec![], vec![], vec![], vec![], vec![]);

        assert!(drop_on_lane(&mut store, "a", "At risk", &columns(), &reference));
        let moved = store.get("a").unwrap();
        assert_eq!(moved.status.name, "At risk");
        assert_eq!(moved.status.id, at_risk.id);
    }

    #[test]
    fn test_drop_on_unknown_lane_is_ignored() {
        let mut store = FeatureStore::new(Membership::All);
        store.insert(feature("a", "Not started", "Payments"));

        assert!(!drop_on_lane(
            &mut store,
            "a",
            "Somewhere",
            &columns(),
            &ReferenceData::default()
        ));
        assert_eq!(store.get("a").unwrap().status.name, "Not started");
    }

    #[test]
    fn test_drop_on_lane_without_reference_status_is_ignored() {
        let mut store = FeatureStore::new(Membership::All);
        store.insert(feature("a", "Not started", "Payments"));
        let reference = ReferenceData::new(
            vec![Status::new("At risk", "#F59E0B")],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
        );

        // "Done" is a configured column but no such status is stored
        assert!(!drop_on_lane(&mut store, "a", "Done", &columns(), &reference));
        let unmoved = store.get("a").unwrap();
        assert_eq!(unmoved.status.name, "Not started");
        assert_eq!(unmoved.status.id, "not-started");
    }

    #[test]
    fn test_table_sort_by_start_descending() {
        let mut a = feature("a", "Done", "Payments");
        let mut b = feature("b", "Done", "Payments");
        a.start_at = crate::models::feature::midnight(date(2026, 1, 5));
        b.start_at = crate::models::feature::midnight(date(2026, 3, 1));
        let features = vec![&a, &b];

        let rows = table_rows(&features, TableColumn::Start, true);
        assert_eq!(rows[0].id, "b");
        let rows = table_rows(&features, TableColumn::Start, false);
        assert_eq!(rows[0].id, "a");
    }

    #[test]
    fn test_table_column_parse() {
        assert_eq!(TableColumn::parse("Start").unwrap(), TableColumn::Start);
        assert!(TableColumn::parse("budget").is_err());
    }

    #[test]
    fn test_display_dates() {
        let f = feature("a", "Done", "Payments");
        assert_eq!(display_date(date(2026, 10, 18)), "Oct 18, 2026");
        assert_eq!(short_date(date(2026, 1, 5)), "Jan 5");
        assert_eq!(card_span(&f), "Oct 18 - Nov 17, 2026");
    }

    #[test]
    fn test_view_kind_parse() {
        assert_eq!(ViewKind::parse("board"), Some(ViewKind::Kanban));
        assert_eq!(ViewKind::parse("GANTT"), Some(ViewKind::Gantt));
        assert_eq!(ViewKind::parse("pie"), None);
    }
}
