//! Per-screen feature store.
//!
//! A [`FeatureStore`] holds the ordered features of one screen. The screen's
//! [`Membership`] predicate decides which statuses belong on it (the roadmap
//! excludes the backlog status, the backlog screen shows only that status), and
//! a [`StreamFilter`] narrows what is shown further.
//!
//! Ids are unique within a store at all times.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::{Feature, FeatureStatus};

/// Status predicate deciding which features belong on a screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum Membership {
    /// Every status
    All,
    /// Only features in this status
    Only(String),
    /// Every status except this one
    Except(String),
}

impl Membership {
    pub fn admits(&self, feature: &Feature) -> bool {
        match self {
            Membership::All => true,
            Membership::Only(status) => feature.status.name == *status,
            Membership::Except(status) => feature.status.name != *status,
        }
    }

    /// Keep the features this predicate admits, preserving order.
    pub fn apply<'a, I>(&self, features: I) -> Vec<&'a Feature>
    where
        I: IntoIterator<Item = &'a Feature>,
    {
        features.into_iter().filter(|f| self.admits(f)).collect()
    }
}

/// Set of stream names currently selected in the stream filter control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFilter {
    selected: BTreeSet<String>,
}

impl StreamFilter {
    /// A filter with the given streams selected.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selected: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Flip one stream in or out of the selection.
    pub fn toggle(&mut self, name: &str) {
        if !self.selected.remove(name) {
            self.selected.insert(name.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.selected.contains(name)
    }

    pub fn admits(&self, feature: &Feature) -> bool {
        self.selected.contains(&feature.product.name)
    }

    pub fn selected(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }
}

/// Outcome of [`FeatureStore::replace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replaced {
    /// The entry was swapped in place
    Replaced,
    /// The updated feature left the screen's membership and was dropped
    Removed,
    /// No entry had that id
    Missing,
}

/// Ordered features for one screen.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    features: Vec<Feature>,
    membership: Membership,
}

impl FeatureStore {
    pub fn new(membership: Membership) -> Self {
        Self {
            features: Vec::new(),
            membership,
        }
    }

    pub fn membership(&self) -> &Membership {
        &self.membership
    }

    /// Every feature held, regardless of membership.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.features.iter().position(|f| f.id == id)
    }

    /// Replace the whole contents after a fetch.
    ///
    /// A repeated id keeps its first position and its last value.
    pub fn replace_all(&mut self, features: Vec<Feature>) {
        self.features.clear();
        for feature in features {
            self.insert(feature);
        }
    }

    /// Append a freshly created feature. An existing id is overwritten in place.
    pub fn insert(&mut self, feature: Feature) {
        match self.position(&feature.id) {
            Some(i) => self.features[i] = feature,
            None => self.features.push(feature),
        }
    }

    /// Swap in an updated feature.
    ///
    /// When the updated feature no longer satisfies the membership predicate the
    /// entry is removed instead. An unknown id leaves the store untouched.
    pub fn replace(&mut self, id: &str, feature: Feature) -> Replaced {
        let Some(i) = self.position(id) else {
            return Replaced::Missing;
        };

        if !self.membership.admits(&feature) {
            self.features.remove(i);
            return Replaced::Removed;
        }

        if feature.id != id {
            // the new id may already be held elsewhere
            if let Some(j) = self.position(&feature.id) {
                self.features.remove(j);
                let i = if j < i { i - 1 } else { i };
                self.features[i] = feature;
                return Replaced::Replaced;
            }
        }
        self.features[i] = feature;
        Replaced::Replaced
    }

    /// Drop a feature. Returns false when no entry had that id.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(i) => {
                self.features.remove(i);
                true
            }
            None => false,
        }
    }

    /// Local-only status reassignment from a list or board drag.
    pub fn move_status(&mut self, id: &str, status: FeatureStatus) -> bool {
        match self.features.iter_mut().find(|f| f.id == id) {
            Some(feature) => {
                feature.status = status;
                true
            }
            None => false,
        }
    }

    /// Local-only reschedule from a timeline drag. Ignored without an end.
    pub fn move_dates(
        &mut self,
        id: &str,
        start_at: NaiveDateTime,
        end_at: Option<NaiveDateTime>,
    ) -> bool {
        let Some(end_at) = end_at else {
            return false;
        };
        match self.features.iter_mut().find(|f| f.id == id) {
            Some(feature) => {
                feature.start_at = start_at;
                feature.end_at = end_at;
                true
            }
            None => false,
        }
    }

    pub fn filter_by_membership(&self, membership: &Membership) -> Vec<&Feature> {
        membership.apply(&self.features)
    }

    pub fn filter_by_stream(&self, streams: &StreamFilter) -> Vec<&Feature> {
        self.features.iter().filter(|f| streams.admits(f)).collect()
    }

    /// What the screen shows: its own membership combined with the stream filter.
    pub fn visible(&self, streams: &StreamFilter) -> Vec<&Feature> {
        self.features
            .iter()
            .filter(|f| self.membership.admits(f) && streams.admits(f))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::feature;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn ids(features: &[&Feature]) -> Vec<String> {
        features.iter().map(|f| f.id.clone()).collect()
    }

    fn assert_unique(store: &FeatureStore) {
        let mut seen = HashSet::new();
        for f in store.features() {
            assert!(seen.insert(f.id.clone()), "duplicate id {}", f.id);
        }
    }

    fn roadmap() -> FeatureStore {
        FeatureStore::new(Membership::Except("Backlog".to_string()))
    }

    fn backlog() -> FeatureStore {
        FeatureStore::new(Membership::Only("Backlog".to_string()))
    }

    #[test]
    fn test_insert_appends_in_order() {
        let mut store = roadmap();
        store.insert(feature("a", "Done", "Payments"));
        store.insert(feature("b", "In progress", "Growth"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.features()[1].id, "b");
    }

    #[test]
    fn test_insert_existing_id_overwrites() {
        let mut store = roadmap();
        store.insert(feature("a", "Done", "Payments"));
        store.insert(feature("a", "At risk", "Payments"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().status.name, "At risk");
    }

    #[test]
    fn test_replace_all_collapses_duplicates() {
        let mut store = roadmap();
        store.replace_all(vec![
            feature("a", "Done", "Payments"),
            feature("b", "Done", "Growth"),
            feature("a", "At risk", "Payments"),
        ]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.features()[0].status.name, "At risk");
    }

    #[test]
    fn test_replace_swaps_in_place() {
        let mut store = roadmap();
        store.insert(feature("a", "Done", "Payments"));
        store.insert(feature("b", "Done", "Growth"));

        let outcome = store.replace("a", feature("a", "In progress", "Payments"));
        assert_eq!(outcome, Replaced::Replaced);
        assert_eq!(store.features()[0].status.name, "In progress");
    }

    #[test]
    fn test_replace_into_backlog_removes_from_roadmap() {
        let mut store = roadmap();
        store.insert(feature("a", "Done", "Payments"));

        let outcome = store.replace("a", feature("a", "Backlog", "Payments"));
        assert_eq!(outcome, Replaced::Removed);
        assert!(store.is_empty());
    }

    #[test]
    fn test_replace_out_of_backlog_removes_from_backlog() {
        let mut store = backlog();
        store.insert(feature("fx", "Backlog", "Payments"));

        let outcome = store.replace("fx", feature("fx", "In progress", "Payments"));
        assert_eq!(outcome, Replaced::Removed);
        assert!(store.filter_by_membership(store.membership()).is_empty());
        assert!(store.get("fx").is_none());
    }

    #[test]
    fn test_replace_missing_is_noop() {
        let mut store = roadmap();
        store.insert(feature("a", "Done", "Payments"));
        assert_eq!(
            store.replace("zz", feature("zz", "Done", "Payments")),
            Replaced::Missing
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_replace_with_new_id_keeps_ids_unique() {
        let mut store = roadmap();
        store.insert(feature("a", "Done", "Payments"));
        store.insert(feature("b", "Done", "Growth"));
        store.insert(feature("c", "Done", "US"));

        store.replace("c", feature("a", "At risk", "US"));
        assert_unique(&store);
        assert_eq!(store.len(), 2);
        assert_eq!(store.features()[1].id, "a");
        assert_eq!(store.get("a").unwrap().status.name, "At risk");
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut store = roadmap();
        store.insert(feature("a", "Done", "Payments"));
        assert!(!store.remove("nope"));
        assert_eq!(store.len(), 1);
        assert!(store.remove("a"));
        assert!(store.is_empty());
    }

    const STATUSES: [&str; 4] = ["Done", "Backlog", "In progress", "At risk"];

    #[derive(Debug, Clone)]
    enum Op {
        Insert { id: u8, status: usize },
        Replace { id: u8, new_id: u8, status: usize },
        Remove { id: u8 },
    }

    // ids drawn from a small range so operations keep colliding
    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..8, 0usize..4).prop_map(|(id, status)| Op::Insert { id, status }),
            (0u8..8, 0u8..8, 0usize..4)
                .prop_map(|(id, new_id, status)| Op::Replace { id, new_id, status }),
            (0u8..8).prop_map(|id| Op::Remove { id }),
        ]
    }

    fn pid(n: u8) -> String {
        format!("p{}", n)
    }

    proptest! {
        #[test]
        fn test_ids_unique_under_any_operation_sequence(
            ops in prop::collection::vec(op(), 0..200),
            backlog_screen in any::<bool>(),
        ) {
            let mut store = if backlog_screen { backlog() } else { roadmap() };

            for op in ops {
                match op {
                    Op::Insert { id, status } => {
                        store.insert(feature(&pid(id), STATUSES[status], "Payments"));
                        prop_assert!(store.get(&pid(id)).is_some());
                    }
                    Op::Replace { id, new_id, status } => {
                        let updated = feature(&pid(new_id), STATUSES[status], "Growth");
                        let admitted = store.membership().admits(&updated);
                        let held = store.get(&pid(id)).is_some();
                        let outcome = store.replace(&pid(id), updated);
                        match (held, admitted) {
                            (false, _) => {
                                prop_assert_eq!(outcome, Replaced::Missing);
                            }
                            (true, false) => {
                                prop_assert_eq!(outcome, Replaced::Removed);
                                prop_assert!(store.get(&pid(id)).is_none());
                            }
                            (true, true) => {
                                prop_assert_eq!(outcome, Replaced::Replaced);
                                prop_assert!(store.get(&pid(new_id)).is_some());
                            }
                        }
                    }
                    Op::Remove { id } => {
                        store.remove(&pid(id));
                        prop_assert!(store.get(&pid(id)).is_none());
                    }
                }

                let mut seen = HashSet::new();
                for f in store.features() {
                    prop_assert!(seen.insert(f.id.clone()), "duplicate id {}", f.id);
                }
            }
        }
    }

    #[test]
    fn test_membership_filter_idempotent() {
        let mut store = FeatureStore::new(Membership::All);
        store.replace_all(vec![
            feature("a", "Backlog", "Payments"),
            feature("b", "Done", "Payments"),
            feature("c", "Backlog", "Growth"),
        ]);

        for membership in [
            Membership::All,
            Membership::Only("Backlog".to_string()),
            Membership::Except("Backlog".to_string()),
        ] {
            let once = store.filter_by_membership(&membership);
            let twice = membership.apply(once.iter().copied());
            assert_eq!(ids(&once), ids(&twice));
        }
    }

    #[test]
    fn test_backlog_entry_hidden_on_roadmap_but_stored() {
        let mut store = roadmap();
        store.insert(feature("fx", "Backlog", "Payments"));

        let streams = StreamFilter::new(["Payments"]);
        assert_eq!(store.len(), 1);
        assert!(store.visible(&streams).is_empty());
    }

    #[test]
    fn test_stream_filter_combines_with_membership() {
        let mut store = roadmap();
        store.replace_all(vec![
            feature("a", "Done", "Payments"),
            feature("b", "Done", "Growth"),
            feature("c", "Backlog", "Payments"),
        ]);

        let mut streams = StreamFilter::new(["Payments", "Growth"]);
        assert_eq!(ids(&store.visible(&streams)), vec!["a", "b"]);

        streams.toggle("Growth");
        assert_eq!(ids(&store.visible(&streams)), vec!["a"]);
        assert_eq!(ids(&store.filter_by_stream(&streams)), vec!["a", "c"]);

        streams.toggle("Growth");
        assert!(streams.contains("Growth"));
    }

    #[test]
    fn test_move_status_is_local() {
        let mut store = roadmap();
        store.insert(feature("a", "Not started", "Payments"));

        let done = FeatureStatus {
            id: "done".to_string(),
            name: "Done".to_string(),
            color: "#10B981".to_string(),
        };
        assert!(store.move_status("a", done.clone()));
        assert_eq!(store.get("a").unwrap().status, done);
        assert!(!store.move_status("zz", done));
    }

    #[test]
    fn test_move_dates_requires_end() {
        let mut store = roadmap();
        store.insert(feature("a", "Done", "Payments"));
        let original = store.get("a").unwrap().clone();

        let start = original.start_at + chrono::Duration::days(7);
        assert!(!store.move_dates("a", start, None));
        assert_eq!(store.get("a").unwrap(), &original);

        let end = original.end_at + chrono::Duration::days(7);
        assert!(store.move_dates("a", start, Some(end)));
        assert_eq!(store.get("a").unwrap().start_at, start);
        assert_eq!(store.get("a").unwrap().end_at, end);
    }
}
