//! Roadmap - planning views over a shared set of projects.
//!
//! This library provides the core of the `roadmap` CLI: the Feature view-model
//! and its transformer, the start-date bucket classifier, the per-screen
//! feature store, view grouping, create/update orchestration, SQLite
//! persistence, the session gate, and configuration.

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod reference;
#[cfg(feature = "serve")]
pub mod server;
pub mod storage;
pub mod store;
pub mod submit;
pub mod views;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use crate::Error;
    use crate::models::feature::midnight;
    use crate::models::{
        Feature, FeatureOwner, FeatureRef, FeatureStatus, NewProject, ProjectUpdate,
        ProjectWithRelations, Status, Stream, User,
    };
    use crate::reference::ReferenceData;
    use crate::storage::{ProjectRepository, Storage};

    /// Test environment with an isolated data directory.
    pub struct TestEnv {
        pub data_dir: TempDir,
    }

    impl TestEnv {
        pub fn new() -> Self {
            Self {
                data_dir: TempDir::new().unwrap(),
            }
        }

        pub fn data_path(&self) -> &std::path::Path {
            self.data_dir.path()
        }

        /// Initialize empty storage.
        pub fn init_storage(&self) -> Storage {
            Storage::init(self.data_path()).unwrap()
        }

        /// Initialize storage populated with the default reference data.
        pub fn seeded_storage(&self) -> Storage {
            let mut storage = self.init_storage();
            storage.seed_defaults(date(2026, 10, 18)).unwrap();
            storage
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// A feature in the given status and stream, without owner/initiative/release.
    pub fn feature(id: &str, status: &str, stream: &str) -> Feature {
        let stream_ref = FeatureRef::new(format!("stream-{}", stream.to_lowercase()), stream);
        Feature {
            id: id.to_string(),
            name: format!("Project {}", id),
            description: String::new(),
            start_at: midnight(date(2026, 10, 18)),
            end_at: midnight(date(2026, 11, 17)),
            status: FeatureStatus {
                id: status.to_lowercase().replace(' ', "-"),
                name: status.to_string(),
                color: "#6B7280".to_string(),
            },
            owner: FeatureOwner::none(),
            group: stream_ref.clone(),
            product: stream_ref,
            initiative: FeatureRef::none(),
            release: FeatureRef::none(),
        }
    }

    pub fn status(storage: &Storage, name: &str) -> Status {
        storage
            .fetch_statuses()
            .unwrap()
            .into_iter()
            .find(|s| s.name == name)
            .unwrap()
    }

    pub fn stream(storage: &Storage, name: &str) -> Stream {
        storage
            .fetch_streams()
            .unwrap()
            .into_iter()
            .find(|s| s.name == name)
            .unwrap()
    }

    pub fn product_team(storage: &Storage) -> User {
        storage
            .fetch_users()
            .unwrap()
            .into_iter()
            .find(|u| u.name == "Product Team")
            .unwrap()
    }

    /// Repository wrapper whose writes can be made to fail.
    pub struct FlakyRepository {
        pub inner: Storage,
        pub fail_writes: bool,
        pub fail_reads: bool,
        pub writes: usize,
    }

    impl FlakyRepository {
        pub fn new(inner: Storage) -> Self {
            Self {
                inner,
                fail_writes: false,
                fail_reads: false,
                writes: 0,
            }
        }

        fn check_write(&mut self) -> crate::Result<()> {
            self.writes += 1;
            if self.fail_writes {
                return Err(Error::Other("connection reset".to_string()));
            }
            Ok(())
        }

        fn check_read(&self) -> crate::Result<()> {
            if self.fail_reads {
                return Err(Error::Other("connection reset".to_string()));
            }
            Ok(())
        }
    }

    impl ProjectRepository for FlakyRepository {
        fn fetch_projects(&self) -> crate::Result<Vec<ProjectWithRelations>> {
            self.check_read()?;
            self.inner.fetch_projects()
        }

        fn fetch_reference_data(&self) -> crate::Result<ReferenceData> {
            self.check_read()?;
            self.inner.fetch_reference_data()
        }

        fn create_project(&mut self, project: &NewProject) -> crate::Result<ProjectWithRelations> {
            self.check_write()?;
            self.inner.create_project(project)
        }

        fn update_project(
            &mut self,
            id: &str,
            update: &ProjectUpdate,
        ) -> crate::Result<ProjectWithRelations> {
            self.check_write()?;
            self.inner.update_project(id, update)
        }

        fn delete_project(&mut self, id: &str) -> crate::Result<()> {
            self.check_write()?;
            self.inner.delete_project(id)
        }
    }
}

/// Library-level error type for roadmap operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Config error: {0}")]
    Config(#[from] kdl::KdlError),

    #[error("Not initialized: run `roadmap init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not logged in: run `roadmap login` first")]
    Unauthenticated,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for roadmap operations.
pub type Result<T> = std::result::Result<T, Error>;
