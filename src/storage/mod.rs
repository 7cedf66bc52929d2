//! Storage layer for roadmap data.
//!
//! Projects and their reference data live in a single SQLite database,
//! `<data-dir>/roadmap.db`. Reference tables (statuses, streams, owners, users,
//! initiatives, releases) are small and read whole; projects are joined to
//! them in memory after the project rows are read.
//!
//! A project's `owner_id` may name a row in `owners` or in `users`. Owners are
//! consulted first.

pub mod backend;

pub use backend::ProjectRepository;

use chrono::{Datelike, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::RoadmapConfig;
use crate::models::{
    Initiative, NewProject, Owner, Project, ProjectUpdate, ProjectWithRelations, Release, Status,
    Stream, User,
};
use crate::reference::ReferenceData;
use crate::{Error, Result};

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "ROADMAP_DATA_DIR";

/// Color given to the backlog status when seeding.
pub const BACKLOG_COLOR: &str = "#9CA3AF";

const DB_FILE: &str = "roadmap.db";

/// Storage manager for one data directory.
pub struct Storage {
    /// Data directory holding the database and session files
    pub root: PathBuf,
    conn: Connection,
}

/// Rows inserted by [`Storage::seed`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub statuses: usize,
    pub streams: usize,
    pub users: usize,
    pub initiatives: usize,
    pub releases: usize,
}

impl Storage {
    /// Open existing storage in a data directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let db_path = data_dir.join(DB_FILE);
        if !db_path.exists() {
            return Err(Error::NotInitialized);
        }

        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            root: data_dir.to_path_buf(),
            conn,
        })
    }

    /// Create (or reopen) storage in a data directory.
    pub fn init(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;

        let conn = Connection::open(data_dir.join(DB_FILE))?;
        Self::init_schema(&conn)?;
        info!(path = %data_dir.display(), "initialized storage");

        Ok(Self {
            root: data_dir.to_path_buf(),
            conn,
        })
    }

    /// Check if storage exists in a data directory.
    pub fn exists(data_dir: &Path) -> bool {
        data_dir.join(DB_FILE).exists()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS statuses (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                color TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS streams (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                color TEXT NOT NULL,
                icon TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS owners (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                role TEXT,
                email TEXT,
                phone TEXT,
                avatar_url TEXT,
                slack_handle TEXT,
                bio TEXT,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT,
                image TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS initiatives (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS releases (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                quarter TEXT,
                year INTEGER,
                release_date TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                status_id TEXT NOT NULL REFERENCES statuses(id),
                stream_id TEXT NOT NULL REFERENCES streams(id),
                owner_id TEXT,
                initiative_id TEXT REFERENCES initiatives(id) ON DELETE SET NULL,
                release_id TEXT REFERENCES releases(id) ON DELETE SET NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_projects_start ON projects(start_date);
            CREATE INDEX IF NOT EXISTS idx_projects_status ON projects(status_id);
            CREATE INDEX IF NOT EXISTS idx_projects_stream ON projects(stream_id);
            "#,
        )?;

        Self::run_migrations(conn)?;

        Ok(())
    }

    /// Run database migrations for schema changes.
    fn run_migrations(conn: &Connection) -> Result<()> {
        // SQLite has no ADD COLUMN IF NOT EXISTS; check the schema first
        let has_progress: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM pragma_table_info('projects') WHERE name = 'progress'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !has_progress {
            conn.execute(
                "ALTER TABLE projects ADD COLUMN progress INTEGER NOT NULL DEFAULT 0",
                [],
            )?;
        }

        Ok(())
    }

    // === Reference Data ===

    pub fn add_status(&mut self, status: &Status) -> Result<()> {
        self.conn.execute(
            "INSERT INTO statuses (id, name, color, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                status.id,
                status.name,
                status.color,
                status.created_at,
                status.updated_at
            ],
        )?;
        info!(name = %status.name, "added status");
        Ok(())
    }

    pub fn add_stream(&mut self, stream: &Stream) -> Result<()> {
        self.conn.execute(
            "INSERT INTO streams (id, name, color, icon, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                stream.id,
                stream.name,
                stream.color,
                stream.icon,
                stream.created_at,
                stream.updated_at
            ],
        )?;
        info!(name = %stream.name, "added stream");
        Ok(())
    }

    pub fn add_owner(&mut self, owner: &Owner) -> Result<()> {
        self.conn.execute(
            "INSERT INTO owners (id, name, role, email, phone, avatar_url, slack_handle, bio,
                                 active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                owner.id,
                owner.name,
                owner.role,
                owner.email,
                owner.phone,
                owner.avatar_url,
                owner.slack_handle,
                owner.bio,
                owner.active,
                owner.created_at,
                owner.updated_at
            ],
        )?;
        info!(name = %owner.name, "added owner");
        Ok(())
    }

    pub fn add_user(&mut self, user: &User) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (id, name, email, image, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id,
                user.name,
                user.email,
                user.image,
                user.created_at,
                user.updated_at
            ],
        )?;
        info!(name = %user.name, "added user");
        Ok(())
    }

    pub fn add_initiative(&mut self, initiative: &Initiative) -> Result<()> {
        self.conn.execute(
            "INSERT INTO initiatives (id, name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                initiative.id,
                initiative.name,
                initiative.description,
                initiative.created_at,
                initiative.updated_at
            ],
        )?;
        info!(name = %initiative.name, "added initiative");
        Ok(())
    }

    pub fn add_release(&mut self, release: &Release) -> Result<()> {
        self.conn.execute(
            "INSERT INTO releases (id, name, quarter, year, release_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                release.id,
                release.name,
                release.quarter,
                release.year,
                release.release_date,
                release.created_at,
                release.updated_at
            ],
        )?;
        info!(name = %release.name, "added release");
        Ok(())
    }

    /// Statuses ordered by name.
    pub fn fetch_statuses(&self) -> Result<Vec<Status>> {
        self.query_all(
            "SELECT id, name, color, created_at, updated_at FROM statuses ORDER BY name",
            status_from_row,
        )
    }

    /// Streams ordered by name.
    pub fn fetch_streams(&self) -> Result<Vec<Stream>> {
        self.query_all(
            "SELECT id, name, color, icon, created_at, updated_at FROM streams ORDER BY name",
            stream_from_row,
        )
    }

    /// Owners ordered by name.
    pub fn fetch_owners(&self) -> Result<Vec<Owner>> {
        self.query_all(
            "SELECT id, name, role, email, phone, avatar_url, slack_handle, bio, active,
                    created_at, updated_at
             FROM owners ORDER BY name",
            owner_from_row,
        )
    }

    /// Users ordered by name.
    pub fn fetch_users(&self) -> Result<Vec<User>> {
        self.query_all(
            "SELECT id, name, email, image, created_at, updated_at FROM users ORDER BY name",
            user_from_row,
        )
    }

    /// Initiatives ordered by name.
    pub fn fetch_initiatives(&self) -> Result<Vec<Initiative>> {
        self.query_all(
            "SELECT id, name, description, created_at, updated_at FROM initiatives ORDER BY name",
            initiative_from_row,
        )
    }

    /// Releases ordered by year, then quarter.
    pub fn fetch_releases(&self) -> Result<Vec<Release>> {
        self.query_all(
            "SELECT id, name, quarter, year, release_date, created_at, updated_at
             FROM releases ORDER BY year, quarter",
            release_from_row,
        )
    }

    fn query_all<T>(&self, sql: &str, map: fn(&Row) -> rusqlite::Result<T>) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], map)?.collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
    }

    // === Projects ===

    /// Get one project with relations joined.
    pub fn get_project(&self, id: &str) -> Result<ProjectWithRelations> {
        let project = self
            .conn
            .query_row(
                &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS),
                [id],
                project_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Project not found: {}", id)))?;

        self.hydrate(vec![project])?
            .pop()
            .ok_or_else(|| Error::NotFound(format!("Project not found: {}", id)))
    }

    /// Projects in one stream, ordered by start date.
    pub fn fetch_projects_by_stream(&self, stream_id: &str) -> Result<Vec<ProjectWithRelations>> {
        debug!(stream_id, "fetching projects by stream");
        let projects = self.query_projects("WHERE stream_id = ?1", Some(stream_id))?;
        self.hydrate(projects)
    }

    /// Projects in one status, ordered by start date.
    pub fn fetch_projects_by_status(&self, status_id: &str) -> Result<Vec<ProjectWithRelations>> {
        debug!(status_id, "fetching projects by status");
        let projects = self.query_projects("WHERE status_id = ?1", Some(status_id))?;
        self.hydrate(projects)
    }

    fn query_projects(&self, filter: &str, param: Option<&str>) -> Result<Vec<Project>> {
        let sql = format!(
            "SELECT {} FROM projects {} ORDER BY start_date, created_at",
            PROJECT_COLUMNS, filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match param {
            Some(p) => stmt.query_map([p], project_from_row)?.collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt.query_map([], project_from_row)?.collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
    }

    /// Join project rows to their reference rows.
    fn hydrate(&self, projects: Vec<Project>) -> Result<Vec<ProjectWithRelations>> {
        if projects.is_empty() {
            return Ok(Vec::new());
        }

        let statuses = by_id(self.fetch_statuses()?, |s| s.id.clone());
        let streams = by_id(self.fetch_streams()?, |s| s.id.clone());
        let owners = by_id(self.fetch_owners()?, |o| o.id.clone());
        let users = by_id(self.fetch_users()?, |u| u.id.clone());
        let initiatives = by_id(self.fetch_initiatives()?, |i| i.id.clone());
        let releases = by_id(self.fetch_releases()?, |r| r.id.clone());

        projects
            .into_iter()
            .map(|project| {
                let status = statuses.get(&project.status_id).cloned().ok_or_else(|| {
                    Error::NotFound(format!("Status not found: {}", project.status_id))
                })?;
                let stream = streams.get(&project.stream_id).cloned().ok_or_else(|| {
                    Error::NotFound(format!("Stream not found: {}", project.stream_id))
                })?;
                let owner = project.owner_id.as_ref().and_then(|id| {
                    owners
                        .get(id)
                        .cloned()
                        .or_else(|| users.get(id).map(User::as_owner))
                });
                let initiative = project
                    .initiative_id
                    .as_ref()
                    .and_then(|id| initiatives.get(id).cloned());
                let release = project
                    .release_id
                    .as_ref()
                    .and_then(|id| releases.get(id).cloned());

                Ok(ProjectWithRelations {
                    project,
                    status,
                    stream,
                    owner,
                    initiative,
                    release,
                })
            })
            .collect()
    }

    fn write_project(&self, project: &Project) -> Result<()> {
        self.conn.execute(
            "INSERT INTO projects (id, name, description, start_date, end_date, status_id,
                                   stream_id, owner_id, initiative_id, release_id, progress,
                                   created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                status_id = excluded.status_id,
                stream_id = excluded.stream_id,
                owner_id = excluded.owner_id,
                initiative_id = excluded.initiative_id,
                release_id = excluded.release_id,
                progress = excluded.progress,
                updated_at = excluded.updated_at",
            params![
                project.id,
                project.name,
                project.description,
                project.start_date,
                project.end_date,
                project.status_id,
                project.stream_id,
                project.owner_id,
                project.initiative_id,
                project.release_id,
                project.progress,
                project.created_at,
                project.updated_at
            ],
        )?;
        Ok(())
    }

    // === Seeding ===

    /// Insert the stock reference data. Rows whose name already exists are skipped.
    ///
    /// Inserts the status columns plus the backlog status, the configured
    /// streams, the default owner as a user, three planning horizons, and
    /// releases for the current quarter and the three after it.
    pub fn seed(&mut self, config: &RoadmapConfig, today: NaiveDate) -> Result<SeedSummary> {
        let mut summary = SeedSummary::default();

        let existing = ReferenceData::new(
            self.fetch_statuses()?,
            self.fetch_streams()?,
            Vec::new(),
            self.fetch_users()?,
            self.fetch_initiatives()?,
            self.fetch_releases()?,
        );

        let mut wanted_statuses: Vec<(String, String)> = config
            .status_columns()
            .into_iter()
            .map(|c| (c.name, c.color))
            .collect();
        wanted_statuses.push((config.backlog_status().to_string(), BACKLOG_COLOR.to_string()));
        for (name, color) in wanted_statuses {
            if existing.status(&name).is_none() {
                self.add_status(&Status::new(name, color))?;
                summary.statuses += 1;
            }
        }

        for meta in config.streams() {
            if existing.stream(&meta.name).is_none() {
                self.add_stream(&Stream::new(meta.name, meta.color, meta.icon))?;
                summary.streams += 1;
            }
        }

        if existing.users.by_name(config.default_owner()).is_none() {
            self.add_user(&User::new(config.default_owner()))?;
            summary.users += 1;
        }

        let horizons = [
            ("Horizon 1", "Starting within three months"),
            ("Horizon 2", "Starting in three to six months"),
            ("Horizon 3", "Starting six months out or later"),
        ];
        for (name, description) in horizons {
            if existing.initiatives.by_name(name).is_none() {
                let mut initiative = Initiative::new(name);
                initiative.description = Some(description.to_string());
                self.add_initiative(&initiative)?;
                summary.initiatives += 1;
            }
        }

        let (mut year, mut quarter) = (today.year(), quarter_of(today));
        for _ in 0..4 {
            let name = format!("{} Q{}", year, quarter);
            if existing.releases.by_name(&name).is_none() {
                let mut release = Release::new(name);
                release.quarter = Some(format!("Q{}", quarter));
                release.year = Some(year);
                release.release_date = quarter_end(year, quarter);
                self.add_release(&release)?;
                summary.releases += 1;
            }
            if quarter == 4 {
                year += 1;
                quarter = 1;
            } else {
                quarter += 1;
            }
        }

        info!(?summary, "seeded reference data");
        Ok(summary)
    }

    /// Seed with the built-in configuration.
    pub fn seed_defaults(&mut self, today: NaiveDate) -> Result<SeedSummary> {
        self.seed(&RoadmapConfig::default(), today)
    }
}

impl ProjectRepository for Storage {
    fn fetch_projects(&self) -> Result<Vec<ProjectWithRelations>> {
        debug!("fetching projects");
        let projects = self.query_projects("", None)?;
        self.hydrate(projects)
    }

    fn fetch_reference_data(&self) -> Result<ReferenceData> {
        debug!("fetching reference data");
        Ok(ReferenceData::new(
            self.fetch_statuses()?,
            self.fetch_streams()?,
            self.fetch_owners()?,
            self.fetch_users()?,
            self.fetch_initiatives()?,
            self.fetch_releases()?,
        ))
    }

    fn create_project(&mut self, new: &NewProject) -> Result<ProjectWithRelations> {
        if new.name.trim().is_empty() {
            return Err(Error::InvalidInput("Project name must not be empty".to_string()));
        }

        let now = Utc::now();
        let project = Project {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.name.clone(),
            description: new.description.clone(),
            start_date: new.start_date,
            end_date: new.end_date,
            status_id: new.status_id.clone(),
            stream_id: new.stream_id.clone(),
            owner_id: new.owner_id.clone(),
            initiative_id: new.initiative_id.clone(),
            release_id: new.release_id.clone(),
            progress: new.progress.min(100),
            created_at: now,
            updated_at: now,
        };
        self.write_project(&project)?;
        info!(id = %project.id, name = %project.name, "created project");

        self.get_project(&project.id)
    }

    fn update_project(&mut self, id: &str, update: &ProjectUpdate) -> Result<ProjectWithRelations> {
        let mut project = self.get_project(id)?.project;
        update.apply_to(&mut project);
        if project.name.trim().is_empty() {
            return Err(Error::InvalidInput("Project name must not be empty".to_string()));
        }
        project.progress = project.progress.min(100);
        project.updated_at = Utc::now();

        self.write_project(&project)?;
        info!(id, "updated project");

        self.get_project(id)
    }

    fn delete_project(&mut self, id: &str) -> Result<()> {
        let removed = self.conn.execute("DELETE FROM projects WHERE id = ?1", [id])?;
        info!(id, removed, "deleted project");
        Ok(())
    }
}

const PROJECT_COLUMNS: &str = "id, name, description, start_date, end_date, status_id, \
    stream_id, owner_id, initiative_id, release_id, progress, created_at, updated_at";

fn by_id<T>(rows: Vec<T>, key: impl Fn(&T) -> String) -> HashMap<String, T> {
    rows.into_iter().map(|row| (key(&row), row)).collect()
}

fn status_from_row(row: &Row) -> rusqlite::Result<Status> {
    Ok(Status {
        id: row.get("id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn stream_from_row(row: &Row) -> rusqlite::Result<Stream> {
    Ok(Stream {
        id: row.get("id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        icon: row.get("icon")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn owner_from_row(row: &Row) -> rusqlite::Result<Owner> {
    Ok(Owner {
        id: row.get("id")?,
        name: row.get("name")?,
        role: row.get("role")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        avatar_url: row.get("avatar_url")?,
        slack_handle: row.get("slack_handle")?,
        bio: row.get("bio")?,
        active: row.get("active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        image: row.get("image")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn initiative_from_row(row: &Row) -> rusqlite::Result<Initiative> {
    Ok(Initiative {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn release_from_row(row: &Row) -> rusqlite::Result<Release> {
    Ok(Release {
        id: row.get("id")?,
        name: row.get("name")?,
        quarter: row.get("quarter")?,
        year: row.get("year")?,
        release_date: row.get("release_date")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn project_from_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        status_id: row.get("status_id")?,
        stream_id: row.get("stream_id")?,
        owner_id: row.get("owner_id")?,
        initiative_id: row.get("initiative_id")?,
        release_id: row.get("release_id")?,
        progress: row.get("progress")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Calendar quarter (1-4) of a date.
pub fn quarter_of(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

/// Last day of a quarter.
fn quarter_end(year: i32, quarter: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if quarter == 4 {
        (year + 1, 1)
    } else {
        (year, quarter * 3 + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt())
}

/// Resolve the data directory.
///
/// Precedence: explicit path > `ROADMAP_DATA_DIR` > `<platform data dir>/roadmap`.
pub fn data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(dir) = std::env::var(DATA_DIR_ENV).ok().filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|d| d.join("roadmap"))
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))
}
