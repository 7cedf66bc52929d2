//! Command implementations for the Roadmap CLI.
//!
//! Each command loads what it needs from the data directory, runs one
//! operation and returns a result that renders as JSON or human text:
//! - `init` - create (and optionally seed) the database
//! - `login` / `logout` / `session` - the session gate
//! - `project_*` - create/update/delete through the project dialog
//! - `view` - Gantt, list, Kanban and table arrangements
//! - `reference_*` - statuses, streams, owners, users, initiatives, releases
//! - `config_show` - effective configuration with provenance
//!
//! Everything except `init` and the session commands requires a logged-in
//! session.

use chrono::NaiveDate;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::auth::{SessionGate, SessionStatus};
use crate::cli::{ProjectFields, ViewArgs};
use crate::config::schema::{
    data_config_path, is_hex_color, read_config, system_config_path, write_config,
};
use crate::config::{
    ConfigOverrides, OutputFormat, ResolvedConfig, RoadmapConfig, StatusColumn, resolve_config,
    resolve_layers,
};
use crate::models::feature::midnight;
use crate::models::{
    EntityKind, Feature, Initiative, Owner, Release, Status, Stream, User, format_date, parse_date,
};
use crate::reference::ReferenceData;
use crate::storage::{BACKLOG_COLOR, ProjectRepository, SeedSummary, Storage};
use crate::store::{FeatureStore, StreamFilter};
use crate::submit::{self, Confirm, ProjectDialog, ProjectForm, Screen, SubmitError, SubmitPolicy};
use crate::views::{self, TableColumn, TableRow, ViewKind};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

/// Environment shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub data_dir: PathBuf,
    pub config: ResolvedConfig,
    pub today: NaiveDate,
}

impl Context {
    pub fn new(data_dir: &Path, config: ResolvedConfig, today: NaiveDate) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            config,
            today,
        }
    }

    /// Resolve configuration for a data directory.
    pub fn load(data_dir: &Path, overrides: &ConfigOverrides, today: NaiveDate) -> Result<Self> {
        let config = resolve_config(data_dir, overrides)?;
        Ok(Self::new(data_dir, config, today))
    }

    /// The same context dated `today`.
    pub fn on(&self, today: NaiveDate) -> Self {
        Self {
            today,
            ..self.clone()
        }
    }

    pub fn gate(&self) -> SessionGate {
        SessionGate::new(&self.data_dir, &self.config)
    }

    fn policy(&self) -> SubmitPolicy {
        SubmitPolicy::from_config(&self.config.to_config())
    }

    /// Kanban and list lanes; the backlog screen leads with a backlog lane.
    fn columns(&self, screen: Screen) -> Vec<StatusColumn> {
        let mut columns = self.config.status_columns.value.clone();
        let backlog = &self.config.backlog_status.value;
        if screen == Screen::Backlog && !columns.iter().any(|c| &c.name == backlog) {
            columns.insert(0, StatusColumn::new(backlog, BACKLOG_COLOR));
        }
        columns
    }

    /// Open storage after checking the session.
    fn open_authorized(&self) -> Result<Storage> {
        self.gate().require()?;
        Storage::open(&self.data_dir)
    }

    /// A screen's store filled from the repository.
    fn load_store(&self, repo: &dyn ProjectRepository, screen: Screen) -> Result<FeatureStore> {
        let mut store = self.policy().store(screen);
        store.replace_all(repo.fetch_features()?);
        debug!(screen = ?screen, count = store.len(), "loaded features");
        Ok(store)
    }
}

fn screen(backlog: bool) -> Screen {
    if backlog {
        Screen::Backlog
    } else {
        Screen::Roadmap
    }
}

fn submit_error(e: SubmitError) -> Error {
    match e {
        SubmitError::Validation | SubmitError::Resolution => Error::InvalidInput(e.user_message()),
        _ => Error::Other(e.user_message()),
    }
}

/// Default stream selection: every known stream.
fn stream_filter(reference: &ReferenceData, names: &[String]) -> StreamFilter {
    if names.is_empty() {
        StreamFilter::new(reference.streams.names())
    } else {
        StreamFilter::new(names.iter().cloned())
    }
}

// === Init ===

#[derive(Debug, Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seeded: Option<SeedSummary>,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![if self.initialized {
            format!("Initialized roadmap at {}", self.path)
        } else {
            format!("Roadmap already initialized at {}", self.path)
        }];
        if let Some(s) = &self.seeded {
            lines.push(format!(
                "Seeded {} statuses, {} streams, {} users, {} initiatives, {} releases",
                s.statuses, s.streams, s.users, s.initiatives, s.releases
            ));
        }
        lines.join("\n")
    }
}

/// Create the database, optionally inserting the default reference data.
pub fn init(ctx: &Context, seed: bool) -> Result<InitResult> {
    let existed = Storage::exists(&ctx.data_dir);
    let mut storage = Storage::init(&ctx.data_dir)?;
    let seeded = if seed {
        Some(storage.seed(&ctx.config.to_config(), ctx.today)?)
    } else {
        None
    };

    Ok(InitResult {
        initialized: !existed,
        path: ctx.data_dir.display().to_string(),
        seeded,
    })
}

// === Session ===

#[derive(Debug, Serialize)]
pub struct AuthResult {
    pub success: bool,
    pub message: String,
}

impl Output for AuthResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        self.message.clone()
    }
}

impl Output for SessionStatus {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.authenticated {
            "Logged in".to_string()
        } else {
            "Not logged in".to_string()
        }
    }
}

pub fn login(ctx: &Context, username: &str, password: &str) -> Result<AuthResult> {
    ctx.gate().login(username, password)?;
    Ok(AuthResult {
        success: true,
        message: "Login successful".to_string(),
    })
}

pub fn logout(ctx: &Context) -> Result<AuthResult> {
    ctx.gate().logout()?;
    Ok(AuthResult {
        success: true,
        message: "Logged out successfully".to_string(),
    })
}

pub fn session(ctx: &Context) -> Result<SessionStatus> {
    Ok(ctx.gate().check_session())
}

// === Projects ===

#[derive(Debug, Serialize)]
pub struct ProjectResult {
    pub action: &'static str,
    /// Whether the screen still shows the project after the write
    pub on_screen: bool,
    pub feature: Feature,
}

impl Output for ProjectResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let f = &self.feature;
        let mut line = format!(
            "{} project {} \"{}\" [{}] in {}",
            capitalize(self.action),
            f.id,
            f.name,
            f.status.name,
            f.product.name
        );
        if !self.on_screen {
            line.push_str(" (no longer on this screen)");
        }
        line
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Copy set flags onto a form.
fn apply_fields(form: &mut ProjectForm, fields: &ProjectFields) -> Result<()> {
    if let Some(stream) = &fields.stream {
        form.stream = stream.clone();
    }
    if let Some(status) = &fields.status {
        form.status = status.clone();
    }
    if let Some(owner) = &fields.owner {
        form.owner = owner.clone();
    }
    if let Some(description) = &fields.description {
        form.description = description.clone();
    }
    if let Some(start) = &fields.start {
        form.start_date = parse_date(start)?;
    }
    if let Some(end) = &fields.end {
        form.end_date = parse_date(end)?;
    }
    Ok(())
}

fn run_dialog(
    mut dialog: ProjectDialog,
    storage: &mut Storage,
    mut store: FeatureStore,
    action: &'static str,
) -> Result<ProjectResult> {
    let feature = dialog
        .submit(storage, &mut store)
        .map_err(submit_error)?
        .ok_or_else(|| Error::Other("Dialog closed before the save completed".to_string()))?;

    Ok(ProjectResult {
        action,
        on_screen: store.membership().admits(&feature),
        feature,
    })
}

/// Create a project through a create dialog.
pub fn project_create(
    ctx: &Context,
    name: &str,
    fields: &ProjectFields,
    backlog: bool,
) -> Result<ProjectResult> {
    let mut storage = ctx.open_authorized()?;
    create_in(ctx, &mut storage, name, fields, backlog)
}

/// [`project_create`] against already-open storage.
pub fn create_in(
    ctx: &Context,
    storage: &mut Storage,
    name: &str,
    fields: &ProjectFields,
    backlog: bool,
) -> Result<ProjectResult> {
    let screen = screen(backlog);
    let store = ctx.load_store(storage, screen)?;

    let mut dialog = ProjectDialog::create(screen, ctx.policy(), ctx.today);
    dialog.form_mut().name = name.to_string();
    apply_fields(dialog.form_mut(), fields)?;

    run_dialog(dialog, storage, store, "created")
}

/// Update a project through an edit dialog pre-filled from its current state.
pub fn project_update(
    ctx: &Context,
    id: &str,
    name: Option<&str>,
    fields: &ProjectFields,
    backlog: bool,
) -> Result<ProjectResult> {
    let mut storage = ctx.open_authorized()?;
    update_in(ctx, &mut storage, id, name, fields, backlog)
}

/// [`project_update`] against already-open storage.
pub fn update_in(
    ctx: &Context,
    storage: &mut Storage,
    id: &str,
    name: Option<&str>,
    fields: &ProjectFields,
    backlog: bool,
) -> Result<ProjectResult> {
    let screen = screen(backlog);
    let store = ctx.load_store(storage, screen)?;

    let feature = store
        .get(id)
        .ok_or_else(|| Error::NotFound(format!("Project not found: {}", id)))?;
    let mut dialog = ProjectDialog::edit(screen, ctx.policy(), feature, ctx.today);
    if let Some(name) = name {
        dialog.form_mut().name = name.to_string();
    }
    apply_fields(dialog.form_mut(), fields)?;

    run_dialog(dialog, storage, store, "updated")
}

/// Confirmation read from stdin; anything but y/yes declines.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{} [y/N] ", prompt);
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResult {
    pub id: String,
    pub deleted: bool,
}

impl Output for DeleteResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.deleted {
            format!("Deleted project {}", self.id)
        } else {
            "Delete cancelled".to_string()
        }
    }
}

pub fn project_delete(
    ctx: &Context,
    id: &str,
    backlog: bool,
    confirm: &dyn Confirm,
) -> Result<DeleteResult> {
    let mut storage = ctx.open_authorized()?;
    delete_in(ctx, &mut storage, id, backlog, confirm)
}

/// [`project_delete`] against already-open storage.
pub fn delete_in(
    ctx: &Context,
    storage: &mut Storage,
    id: &str,
    backlog: bool,
    confirm: &dyn Confirm,
) -> Result<DeleteResult> {
    let screen = screen(backlog);
    let mut store = ctx.load_store(storage, screen)?;

    let deleted = submit::delete_project(storage, &mut store, screen, id, confirm)
        .map_err(submit_error)?;
    Ok(DeleteResult {
        id: id.to_string(),
        deleted,
    })
}

#[derive(Debug, Serialize)]
pub struct FeatureResult {
    #[serde(flatten)]
    pub feature: Feature,
}

impl Output for FeatureResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let f = &self.feature;
        let or_dash = |s: &str| {
            if s.is_empty() {
                "-".to_string()
            } else {
                s.to_string()
            }
        };
        let mut lines = vec![
            format!("{} {}", f.id, f.name),
            format!("  Status:     {}", f.status.name),
            format!("  Stream:     {}", f.product.name),
            format!("  Owner:      {}", or_dash(&f.owner.name)),
            format!(
                "  Dates:      {} - {}",
                views::display_date(f.start_date()),
                views::display_date(f.end_date())
            ),
            format!("  Initiative: {}", or_dash(&f.initiative.name)),
            format!("  Release:    {}", or_dash(&f.release.name)),
        ];
        if !f.description.is_empty() {
            lines.push(String::new());
            lines.push(f.description.clone());
        }
        lines.join("\n")
    }
}

pub fn project_show(ctx: &Context, id: &str) -> Result<FeatureResult> {
    let storage = ctx.open_authorized()?;
    let record = storage.get_project(id)?;
    Ok(FeatureResult {
        feature: crate::models::to_feature(&record),
    })
}

#[derive(Debug, Serialize)]
pub struct FeatureListResult {
    pub screen: Screen,
    pub count: usize,
    pub features: Vec<Feature>,
}

impl Output for FeatureListResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.features.is_empty() {
            return "No projects.".to_string();
        }
        let mut lines = vec![format!("{} project(s):", self.count)];
        for f in &self.features {
            lines.push(format!(
                "  {}  {}  [{}]  {}  {} - {}",
                f.id,
                f.name,
                f.status.name,
                f.product.name,
                format_date(f.start_date()),
                format_date(f.end_date())
            ));
        }
        lines.join("\n")
    }
}

/// Projects a screen shows under a stream selection.
pub fn project_list(ctx: &Context, backlog: bool, streams: &[String]) -> Result<FeatureListResult> {
    let storage = ctx.open_authorized()?;
    list_in(ctx, &storage, backlog, streams)
}

/// [`project_list`] against already-open storage.
pub fn list_in(
    ctx: &Context,
    storage: &Storage,
    backlog: bool,
    streams: &[String],
) -> Result<FeatureListResult> {
    let screen = screen(backlog);
    let store = ctx.load_store(storage, screen)?;
    let reference = storage.fetch_reference_data()?;

    let features: Vec<Feature> = store
        .visible(&stream_filter(&reference, streams))
        .into_iter()
        .cloned()
        .collect();
    Ok(FeatureListResult {
        screen,
        count: features.len(),
        features,
    })
}

// === Views ===

/// One titled group of a rendered view.
#[derive(Debug, Serialize)]
pub struct ViewGroup {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewData {
    Gantt { groups: Vec<ViewGroup> },
    List { lanes: Vec<ViewGroup> },
    Kanban { lanes: Vec<ViewGroup> },
    Table { rows: Vec<TableRow> },
}

#[derive(Debug, Serialize)]
pub struct ViewResult {
    pub screen: Screen,
    /// Ids changed by preview moves; nothing was saved
    pub previewed: Vec<String>,
    #[serde(flatten)]
    pub data: ViewData,
}

impl Output for ViewResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        match &self.data {
            ViewData::Gantt { groups } => {
                for group in groups {
                    lines.push(format!("== {} ==", group.name));
                    for f in &group.features {
                        lines.push(format!(
                            "  {}  {}  [{}]",
                            f.name,
                            views::card_span(f),
                            f.status.name
                        ));
                    }
                }
            }
            ViewData::List { lanes } => {
                for lane in lanes {
                    lines.push(format!("== {} ({}) ==", lane.name, lane.features.len()));
                    for f in &lane.features {
                        lines.push(format!(
                            "  {}  {}  {} - {}",
                            f.name,
                            f.product.name,
                            views::display_date(f.start_date()),
                            views::display_date(f.end_date())
                        ));
                    }
                }
            }
            ViewData::Kanban { lanes } => {
                for lane in lanes {
                    lines.push(format!("== {} ({}) ==", lane.name, lane.features.len()));
                    for f in &lane.features {
                        let owner = if f.owner.is_empty() {
                            String::new()
                        } else {
                            format!("  ({})", f.owner.initials())
                        };
                        lines.push(format!("  {}{}  {}", f.name, owner, views::card_span(f)));
                    }
                }
            }
            ViewData::Table { rows } => {
                lines.push("NAME\tOWNER\tSTATUS\tSTART\tEND\tRELEASE".to_string());
                for row in rows {
                    lines.push(format!(
                        "{}\t{}\t{}\t{}\t{}\t{}",
                        row.name,
                        row.owner,
                        row.status,
                        views::display_date(row.start),
                        views::display_date(row.end),
                        row.release
                    ));
                }
            }
        }
        if !self.previewed.is_empty() {
            lines.push(format!("(preview only, not saved: {})", self.previewed.join(", ")));
        }
        lines.join("\n")
    }
}

fn split_pair<'a>(arg: &'a str, flag: &str) -> Result<(&'a str, &'a str)> {
    arg.split_once('=')
        .filter(|(id, value)| !id.is_empty() && !value.is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("{} expects ID=VALUE, got: {}", flag, arg)))
}

fn owned(features: Vec<&Feature>) -> Vec<Feature> {
    features.into_iter().cloned().collect()
}

/// Arrange the visible projects for one view, after applying preview moves.
pub fn view(ctx: &Context, args: &ViewArgs) -> Result<ViewResult> {
    let kind = ViewKind::parse(&args.kind)
        .ok_or_else(|| Error::InvalidInput(format!("Unknown view: {}", args.kind)))?;
    let sort = TableColumn::parse(&args.sort)?;

    let storage = ctx.open_authorized()?;
    let screen = screen(args.backlog);
    let reference = storage.fetch_reference_data()?;
    let mut store = ctx.load_store(&storage, screen)?;

    let columns = ctx.columns(screen);
    let mut previewed = Vec::new();
    for arg in &args.moves {
        let (id, lane) = split_pair(arg, "--move")?;
        if views::drop_on_lane(&mut store, id, lane, &columns, &reference) {
            previewed.push(id.to_string());
        }
    }
    for arg in &args.reschedule {
        let (id, range) = split_pair(arg, "--reschedule")?;
        let (start, end) = match range.split_once(':') {
            Some((start, end)) => (parse_date(start)?, Some(parse_date(end)?)),
            None => (parse_date(range)?, None),
        };
        if store.move_dates(id, midnight(start), end.map(midnight)) {
            previewed.push(id.to_string());
        }
    }

    let visible = store.visible(&stream_filter(&reference, &args.streams));
    let lanes = || -> Vec<ViewGroup> {
        views::status_lanes(&visible, &columns)
            .into_iter()
            .map(|lane| ViewGroup {
                name: lane.name,
                color: Some(lane.color),
                features: owned(lane.features),
            })
            .collect()
    };

    let data = match kind {
        ViewKind::Gantt => ViewData::Gantt {
            groups: views::gantt_groups(&visible)
                .into_iter()
                .map(|group| ViewGroup {
                    name: group.name,
                    color: None,
                    features: owned(group.features),
                })
                .collect(),
        },
        ViewKind::List => ViewData::List { lanes: lanes() },
        ViewKind::Kanban => ViewData::Kanban { lanes: lanes() },
        ViewKind::Table => ViewData::Table {
            rows: views::table_rows(&visible, sort, args.desc),
        },
    };

    Ok(ViewResult {
        screen,
        previewed,
        data,
    })
}

// === Reference data ===

#[derive(Debug, Serialize)]
pub struct ReferenceListResult {
    pub kind: EntityKind,
    pub count: usize,
    pub items: Vec<serde_json::Value>,
}

impl Output for ReferenceListResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.items.is_empty() {
            return format!("No {}.", self.kind.table());
        }
        let mut lines = vec![format!("{} {}:", self.count, self.kind.table())];
        for item in &self.items {
            let name = item["name"].as_str().unwrap_or_default();
            let id = item["id"].as_str().unwrap_or_default();
            match item["color"].as_str() {
                Some(color) => lines.push(format!("  {}  {}  {}", id, name, color)),
                None => lines.push(format!("  {}  {}", id, name)),
            }
        }
        lines.join("\n")
    }
}

fn reference_kind(kind: &str) -> Result<EntityKind> {
    EntityKind::parse(kind)
        .filter(|k| *k != EntityKind::Project)
        .ok_or_else(|| Error::InvalidInput(format!("Unknown reference kind: {}", kind)))
}

fn to_values<T: Serialize>(rows: Vec<T>) -> Result<Vec<serde_json::Value>> {
    Ok(rows
        .into_iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn reference_list(ctx: &Context, kind: &str) -> Result<ReferenceListResult> {
    let kind = reference_kind(kind)?;
    let storage = ctx.open_authorized()?;

    let items = match kind {
        EntityKind::Status => to_values(storage.fetch_statuses()?)?,
        EntityKind::Stream => to_values(storage.fetch_streams()?)?,
        EntityKind::Owner => to_values(storage.fetch_owners()?)?,
        EntityKind::User => to_values(storage.fetch_users()?)?,
        EntityKind::Initiative => to_values(storage.fetch_initiatives()?)?,
        EntityKind::Release => to_values(storage.fetch_releases()?)?,
        EntityKind::Project => Vec::new(),
    };

    Ok(ReferenceListResult {
        kind,
        count: items.len(),
        items,
    })
}

/// Optional attributes of a new reference row.
#[derive(Debug, Clone, Default)]
pub struct ReferenceFields {
    pub color: Option<String>,
    pub icon: Option<String>,
    pub quarter: Option<String>,
    pub year: Option<i32>,
    pub date: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReferenceAddResult {
    pub kind: EntityKind,
    pub id: String,
    pub name: String,
}

impl Output for ReferenceAddResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Added {} {} \"{}\"", self.kind, self.id, self.name)
    }
}

const DEFAULT_COLOR: &str = "#6B7280";
const DEFAULT_ICON: &str = "circle";

pub fn reference_add(
    ctx: &Context,
    kind: &str,
    name: &str,
    fields: ReferenceFields,
) -> Result<ReferenceAddResult> {
    let kind = reference_kind(kind)?;
    if name.trim().is_empty() {
        return Err(Error::InvalidInput("Name must not be empty".to_string()));
    }
    let color = fields.color.unwrap_or_else(|| DEFAULT_COLOR.to_string());
    if !is_hex_color(&color) {
        return Err(Error::InvalidInput(format!("Invalid color: {}", color)));
    }

    let mut storage = ctx.open_authorized()?;
    let id = match kind {
        EntityKind::Status => {
            let status = Status::new(name, color);
            storage.add_status(&status)?;
            status.id
        }
        EntityKind::Stream => {
            let icon = fields.icon.unwrap_or_else(|| DEFAULT_ICON.to_string());
            let stream = Stream::new(name, color, icon);
            storage.add_stream(&stream)?;
            stream.id
        }
        EntityKind::Owner => {
            let mut owner = Owner::new(name);
            owner.role = fields.role;
            owner.email = fields.email;
            owner.avatar_url = fields.avatar_url;
            storage.add_owner(&owner)?;
            owner.id
        }
        EntityKind::User => {
            let mut user = User::new(name);
            user.email = fields.email;
            user.image = fields.avatar_url;
            storage.add_user(&user)?;
            user.id
        }
        EntityKind::Initiative => {
            let mut initiative = Initiative::new(name);
            initiative.description = fields.description;
            storage.add_initiative(&initiative)?;
            initiative.id
        }
        EntityKind::Release => {
            let mut release = Release::new(name);
            release.quarter = fields.quarter;
            release.year = fields.year;
            release.release_date = fields.date.as_deref().map(parse_date).transpose()?;
            storage.add_release(&release)?;
            release.id
        }
        EntityKind::Project => {
            return Err(Error::InvalidInput(
                "Projects are not reference data".to_string(),
            ));
        }
    };

    Ok(ReferenceAddResult {
        kind,
        id,
        name: name.to_string(),
    })
}

// === Config ===

#[derive(Debug, Serialize)]
pub struct ConfigShowResult {
    #[serde(flatten)]
    pub config: ResolvedConfig,
}

impl Output for ConfigShowResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let c = &self.config;
        let names = |items: Vec<&str>| items.join(", ");
        [
            format!(
                "output-format = {} ({})",
                c.output_format.value.as_str(),
                c.output_format.source
            ),
            format!(
                "backlog-status = {} ({})",
                c.backlog_status.value, c.backlog_status.source
            ),
            format!(
                "default-owner = {} ({})",
                c.default_owner.value, c.default_owner.source
            ),
            format!("username = {} ({})", c.username.value, c.username.source),
            format!("password = ******** ({})", c.password.source),
            format!("session-secret = ******** ({})", c.session_secret.source),
            format!(
                "streams = {} ({})",
                names(c.streams.value.iter().map(|s| s.name.as_str()).collect()),
                c.streams.source
            ),
            format!(
                "status-columns = {} ({})",
                names(c.status_columns.value.iter().map(|s| s.name.as_str()).collect()),
                c.status_columns.source
            ),
        ]
        .join("\n")
    }
}

pub fn config_show(ctx: &Context) -> Result<ConfigShowResult> {
    Ok(ConfigShowResult {
        config: ctx.config.clone(),
    })
}

#[derive(Debug, Serialize)]
pub struct ConfigSetResult {
    pub key: String,
    pub value: String,
    pub path: String,
}

impl Output for ConfigSetResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path)
    }
}

/// Write one key to `<data-dir>/config.kdl`.
///
/// Secrets are echoed masked.
pub fn config_set(ctx: &Context, key: &str, value: &str) -> Result<ConfigSetResult> {
    let path = data_config_path(&ctx.data_dir);
    let mut config = read_config(&path)?;
    let owned = Some(value.to_string());
    let mut secret = false;
    match key {
        "output-format" => {
            config.output_format = Some(OutputFormat::parse(value).ok_or_else(|| {
                Error::InvalidInput(format!("output-format must be json or human, got: {}", value))
            })?);
        }
        "backlog-status" => config.backlog_status = owned,
        "default-owner" => config.default_owner = owned,
        "username" => config.username = owned,
        "password" => {
            config.password = owned;
            secret = true;
        }
        "session-secret" => {
            config.session_secret = owned;
            secret = true;
        }
        _ => return Err(Error::InvalidInput(format!("Unknown config key: {}", key))),
    }
    config.validate_values().map_err(Error::InvalidInput)?;
    let system = match system_config_path() {
        Some(system_path) => read_config(&system_path)?,
        None => RoadmapConfig::default(),
    };
    resolve_layers(&config, &system, &ConfigOverrides::new())
        .to_config()
        .validate()
        .map_err(Error::InvalidInput)?;
    write_config(&path, &config)?;
    info!(key, path = %path.display(), "config updated");

    Ok(ConfigSetResult {
        key: key.to_string(),
        value: if secret {
            "********".to_string()
        } else {
            value.to_string()
        },
        path: path.display().to_string(),
    })
}
