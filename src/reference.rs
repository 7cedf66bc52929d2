//! Reference data cache.
//!
//! Holds the small reference sets fetched for one submission or one screen and
//! resolves the names a user picked in a form to stable ids. Each set gets a
//! [`NameIndex`] built once per fetch. Names are expected to be unique within a
//! set; when they are not, the first row in fetch order wins.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{Initiative, Named, Owner, Release, Status, Stream, User};

/// Name-to-position index over a reference list. First match wins.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    positions: HashMap<String, usize>,
}

impl NameIndex {
    pub fn build<T: Named>(rows: &[T]) -> Self {
        let mut positions = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            positions.entry(row.name().to_string()).or_insert(i);
        }
        Self { positions }
    }

    /// Position of the row with this exact name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// A reference list together with its name index.
#[derive(Debug, Clone)]
pub struct ReferenceSet<T> {
    rows: Vec<T>,
    index: NameIndex,
}

impl<T> Default for ReferenceSet<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            index: NameIndex::default(),
        }
    }
}

impl<T: Named> ReferenceSet<T> {
    pub fn new(rows: Vec<T>) -> Self {
        let index = NameIndex::build(&rows);
        Self { rows, index }
    }

    /// Look a row up by exact name.
    pub fn by_name(&self, name: &str) -> Option<&T> {
        self.index.position(name).map(|i| &self.rows[i])
    }

    pub fn by_id(&self, id: &str) -> Option<&T> {
        self.rows.iter().find(|row| row.id() == id)
    }

    /// Rows in fetch order.
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn names(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<T: Serialize> Serialize for ReferenceSet<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

/// All reference sets needed to resolve a project form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceData {
    pub statuses: ReferenceSet<Status>,
    pub streams: ReferenceSet<Stream>,
    pub owners: ReferenceSet<Owner>,
    pub users: ReferenceSet<User>,
    pub initiatives: ReferenceSet<Initiative>,
    pub releases: ReferenceSet<Release>,
}

impl ReferenceData {
    pub fn new(
        statuses: Vec<Status>,
        streams: Vec<Stream>,
        owners: Vec<Owner>,
        users: Vec<User>,
        initiatives: Vec<Initiative>,
        releases: Vec<Release>,
    ) -> Self {
        Self {
            statuses: ReferenceSet::new(statuses),
            streams: ReferenceSet::new(streams),
            owners: ReferenceSet::new(owners),
            users: ReferenceSet::new(users),
            initiatives: ReferenceSet::new(initiatives),
            releases: ReferenceSet::new(releases),
        }
    }

    pub fn status(&self, name: &str) -> Option<&Status> {
        self.statuses.by_name(name)
    }

    pub fn stream(&self, name: &str) -> Option<&Stream> {
        self.streams.by_name(name)
    }

    pub fn owner(&self, name: &str) -> Option<&Owner> {
        self.owners.by_name(name)
    }

    /// Id of the default owner: an owner with this name, else a user with it.
    pub fn default_owner_id(&self, name: &str) -> Option<&str> {
        self.owners
            .by_name(name)
            .map(|o| o.id.as_str())
            .or_else(|| self.users.by_name(name).map(|u| u.id.as_str()))
    }
}
