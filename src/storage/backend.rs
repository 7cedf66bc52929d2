//! The persistence seam.
//!
//! Orchestration talks to a [`ProjectRepository`]; [`super::Storage`] is the
//! SQLite implementation. Failures propagate unchanged, no call is retried and
//! no write is applied partially.

use crate::Result;
use crate::models::{Feature, NewProject, ProjectUpdate, ProjectWithRelations, to_feature};
use crate::reference::ReferenceData;

/// Trait for the store that persists projects and serves reference data.
pub trait ProjectRepository {
    /// All projects with relations joined, ordered by start date.
    fn fetch_projects(&self) -> Result<Vec<ProjectWithRelations>>;

    /// Every reference set, each in its fetch order.
    fn fetch_reference_data(&self) -> Result<ReferenceData>;

    /// Insert a project and return it with relations joined.
    fn create_project(&mut self, project: &NewProject) -> Result<ProjectWithRelations>;

    /// Apply a partial update. A missing id is `Error::NotFound`.
    fn update_project(&mut self, id: &str, update: &ProjectUpdate) -> Result<ProjectWithRelations>;

    /// Delete a project. Deleting a missing id succeeds.
    fn delete_project(&mut self, id: &str) -> Result<()>;

    /// All projects transformed into features.
    fn fetch_features(&self) -> Result<Vec<Feature>> {
        Ok(self.fetch_projects()?.iter().map(to_feature).collect())
    }
}
