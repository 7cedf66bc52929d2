//! Create/update orchestration for the project dialog.
//!
//! A [`ProjectDialog`] owns one form and walks it through
//! `Idle -> Submitting -> Success | Failure`. A submission is split in two so a
//! caller can interleave other work with the persistence call:
//!
//! 1. [`ProjectDialog::begin_submit`] validates the form, fetches reference
//!    data, resolves names to ids and builds the write payload.
//! 2. [`PendingSubmission::send`] performs the single write.
//! 3. [`ProjectDialog::finish_submit`] merges the returned record into the
//!    [`FeatureStore`], unless the dialog was closed in the meantime.
//!
//! [`ProjectDialog::submit`] runs all three back to back.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::Error;
use crate::config::RoadmapConfig;
use crate::models::{
    Feature, NewProject, ProjectUpdate, ProjectWithRelations, classify, to_feature,
};
use crate::reference::ReferenceData;
use crate::storage::ProjectRepository;
use crate::store::{FeatureStore, Membership};

/// Which screen a dialog or delete belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// Everything except the backlog status
    Roadmap,
    /// Only the backlog status
    Backlog,
}

impl Screen {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "roadmap" | "main" => Some(Self::Roadmap),
            "backlog" => Some(Self::Backlog),
            _ => None,
        }
    }

    pub fn delete_prompt(&self) -> &'static str {
        match self {
            Screen::Roadmap => "Are you sure you want to delete this project?",
            Screen::Backlog => "Are you sure you want to delete this backlog project?",
        }
    }
}

/// Screen-level settings injected from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitPolicy {
    /// Status that separates the backlog from the roadmap
    pub backlog_status: String,
    /// Owner used when none is picked, looked up in owners then users
    pub default_owner: String,
}

impl Default for SubmitPolicy {
    fn default() -> Self {
        Self {
            backlog_status: "Backlog".to_string(),
            default_owner: "Product Team".to_string(),
        }
    }
}

impl SubmitPolicy {
    pub fn from_config(config: &RoadmapConfig) -> Self {
        Self {
            backlog_status: config.backlog_status().to_string(),
            default_owner: config.default_owner().to_string(),
        }
    }

    /// Status predicate for a screen.
    pub fn membership(&self, screen: Screen) -> Membership {
        match screen {
            Screen::Roadmap => Membership::Except(self.backlog_status.clone()),
            Screen::Backlog => Membership::Only(self.backlog_status.clone()),
        }
    }

    /// An empty store for a screen.
    pub fn store(&self, screen: Screen) -> FeatureStore {
        FeatureStore::new(self.membership(screen))
    }
}

/// Whether the dialog creates a project or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogMode {
    Create,
    Edit { id: String },
}

impl DialogMode {
    fn verb(&self) -> &'static str {
        match self {
            DialogMode::Create => "create",
            DialogMode::Edit { .. } => "update",
        }
    }
}

/// Form fields as the user typed or picked them. Names, not ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectForm {
    pub name: String,
    pub description: String,
    pub stream: String,
    pub status: String,
    pub owner: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ProjectForm {
    /// Blank form with both dates set to today.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            stream: String::new(),
            status: String::new(),
            owner: String::new(),
            start_date: today,
            end_date: today,
        }
    }

    /// Form pre-filled from an existing feature, as the edit dialog opens.
    pub fn from_feature(feature: &Feature) -> Self {
        Self {
            name: feature.name.clone(),
            description: feature.description.clone(),
            stream: feature.product.name.clone(),
            status: feature.status.name.clone(),
            owner: feature.owner.name.clone(),
            start_date: feature.start_date(),
            end_date: feature.end_date(),
        }
    }

    fn validate(&self, screen: Screen) -> Result<(), SubmitError> {
        let blank = |s: &str| s.trim().is_empty();
        if blank(&self.name) || blank(&self.stream) {
            return Err(SubmitError::Validation);
        }
        if screen == Screen::Roadmap && blank(&self.status) {
            return Err(SubmitError::Validation);
        }
        Ok(())
    }

    fn description(&self) -> Option<String> {
        if self.description.is_empty() {
            None
        } else {
            Some(self.description.clone())
        }
    }
}

/// Where a dialog is in its submission lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum SubmitState {
    Idle,
    Submitting,
    Success,
    Failure(String),
}

/// Why a submission did not complete.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Please fill in all required fields")]
    Validation,

    #[error("Invalid stream or status selection")]
    Resolution,

    #[error("Failed to {action} project. Please try again.")]
    Persistence {
        action: &'static str,
        #[source]
        source: Error,
    },

    #[error("A submission is already in progress")]
    Busy,
}

impl SubmitError {
    /// Text shown to the user.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    fn persistence(action: &'static str, source: Error) -> Self {
        SubmitError::Persistence { action, source }
    }
}

/// The resolved write a submission will perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectWrite {
    Create(NewProject),
    Update { id: String, update: ProjectUpdate },
}

/// A validated, resolved submission waiting for its write.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    generation: u64,
    write: ProjectWrite,
}

impl PendingSubmission {
    pub fn write(&self) -> &ProjectWrite {
        &self.write
    }

    /// Perform the write. Exactly one repository call.
    pub fn send<R: ProjectRepository + ?Sized>(self, repo: &mut R) -> SubmissionResponse {
        let result = match &self.write {
            ProjectWrite::Create(project) => repo.create_project(project),
            ProjectWrite::Update { id, update } => repo.update_project(id, update),
        };
        SubmissionResponse {
            generation: self.generation,
            result,
        }
    }
}

/// Outcome of a write, tagged with the dialog generation that issued it.
#[derive(Debug)]
pub struct SubmissionResponse {
    generation: u64,
    result: crate::Result<ProjectWithRelations>,
}

/// One create or edit dialog.
#[derive(Debug, Clone)]
pub struct ProjectDialog {
    screen: Screen,
    policy: SubmitPolicy,
    mode: DialogMode,
    form: ProjectForm,
    state: SubmitState,
    open: bool,
    generation: u64,
    today: NaiveDate,
}

impl ProjectDialog {
    /// An open create dialog with a blank form.
    pub fn create(screen: Screen, policy: SubmitPolicy, today: NaiveDate) -> Self {
        Self {
            screen,
            policy,
            mode: DialogMode::Create,
            form: ProjectForm::new(today),
            state: SubmitState::Idle,
            open: true,
            generation: 0,
            today,
        }
    }

    /// An open edit dialog pre-filled from `feature`.
    pub fn edit(screen: Screen, policy: SubmitPolicy, feature: &Feature, today: NaiveDate) -> Self {
        Self {
            mode: DialogMode::Edit {
                id: feature.id.clone(),
            },
            form: ProjectForm::from_feature(feature),
            ..Self::create(screen, policy, today)
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn mode(&self) -> &DialogMode {
        &self.mode
    }

    pub fn form(&self) -> &ProjectForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ProjectForm {
        &mut self.form
    }

    pub fn state(&self) -> &SubmitState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Close the dialog. Any response still in flight will be ignored.
    pub fn close(&mut self) {
        self.open = false;
        self.generation += 1;
        if self.state == SubmitState::Submitting {
            self.state = SubmitState::Idle;
        }
    }

    /// Validate, fetch reference data and resolve the form into a write.
    pub fn begin_submit<R: ProjectRepository + ?Sized>(
        &mut self,
        repo: &R,
    ) -> Result<PendingSubmission, SubmitError> {
        if self.state == SubmitState::Submitting {
            return Err(SubmitError::Busy);
        }
        if let Err(e) = self.form.validate(self.screen) {
            warn!(screen = ?self.screen, "rejected submission with missing fields");
            return Err(e);
        }

        self.state = SubmitState::Submitting;
        debug!(screen = ?self.screen, mode = self.mode.verb(), "fetching reference data");

        let reference = match repo.fetch_reference_data() {
            Ok(reference) => reference,
            Err(e) => return Err(self.fail(SubmitError::persistence(self.mode.verb(), e))),
        };

        match self.resolve(&reference) {
            Some(write) => Ok(PendingSubmission {
                generation: self.generation,
                write,
            }),
            None => {
                warn!(
                    stream = %self.form.stream,
                    status = %self.form.status,
                    "selection did not resolve against reference data"
                );
                Err(self.fail(SubmitError::Resolution))
            }
        }
    }

    /// Merge a write's outcome into the store.
    ///
    /// Returns `Ok(None)` when the dialog was closed after the write was issued;
    /// the store is left untouched in that case.
    pub fn finish_submit(
        &mut self,
        response: SubmissionResponse,
        store: &mut FeatureStore,
    ) -> Result<Option<Feature>, SubmitError> {
        if response.generation != self.generation {
            debug!("dropping response for a closed dialog");
            return Ok(None);
        }

        let record = match response.result {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, mode = self.mode.verb(), "project write failed");
                return Err(self.fail(SubmitError::persistence(self.mode.verb(), e)));
            }
        };

        let feature = to_feature(&record);
        match &self.mode {
            DialogMode::Create => store.insert(feature.clone()),
            DialogMode::Edit { id } => {
                store.replace(id, feature.clone());
            }
        }
        info!(id = %feature.id, status = %feature.status.name, mode = self.mode.verb(), "saved project");

        self.form = ProjectForm::new(self.today);
        self.open = false;
        self.generation += 1;
        self.state = SubmitState::Success;
        Ok(Some(feature))
    }

    /// Run a whole submission against one repository.
    pub fn submit<R: ProjectRepository + ?Sized>(
        &mut self,
        repo: &mut R,
        store: &mut FeatureStore,
    ) -> Result<Option<Feature>, SubmitError> {
        let pending = self.begin_submit(&*repo)?;
        let response = pending.send(repo);
        self.finish_submit(response, store)
    }

    fn fail(&mut self, error: SubmitError) -> SubmitError {
        self.state = SubmitState::Failure(error.user_message());
        error
    }

    fn resolve(&self, reference: &ReferenceData) -> Option<ProjectWrite> {
        let form = &self.form;
        let stream = reference.stream(&form.stream)?;
        let status_name = match (self.screen, &self.mode) {
            (Screen::Backlog, DialogMode::Create) => self.policy.backlog_status.as_str(),
            _ => form.status.as_str(),
        };
        let status = reference.status(status_name)?;

        let bucket = classify(form.start_date, self.today);
        let initiative_id = bucket
            .pick(reference.initiatives.rows())
            .map(|i| i.id.clone());
        let release_id = bucket.pick(reference.releases.rows()).map(|r| r.id.clone());

        let chosen_owner = reference.owner(&form.owner).map(|o| o.id.clone());
        let default_owner = || {
            reference
                .default_owner_id(&self.policy.default_owner)
                .map(str::to_string)
        };

        let write = match &self.mode {
            DialogMode::Create => {
                let owner_id = match self.screen {
                    Screen::Roadmap => chosen_owner.or_else(default_owner),
                    Screen::Backlog => default_owner(),
                };
                ProjectWrite::Create(NewProject {
                    name: form.name.clone(),
                    description: form.description(),
                    start_date: form.start_date,
                    end_date: form.end_date,
                    status_id: status.id.clone(),
                    stream_id: stream.id.clone(),
                    owner_id,
                    initiative_id,
                    release_id,
                    progress: 0,
                })
            }
            DialogMode::Edit { id } => ProjectWrite::Update {
                id: id.clone(),
                update: ProjectUpdate {
                    name: Some(form.name.clone()),
                    description: Some(form.description()),
                    start_date: Some(form.start_date),
                    end_date: Some(form.end_date),
                    status_id: Some(status.id.clone()),
                    stream_id: Some(stream.id.clone()),
                    owner_id: match self.screen {
                        Screen::Roadmap => Some(chosen_owner),
                        Screen::Backlog => None,
                    },
                    initiative_id: Some(initiative_id),
                    release_id: Some(release_id),
                    progress: None,
                },
            },
        };
        Some(write)
    }
}

/// Caller-supplied confirmation before a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Delete a project once the caller confirms.
///
/// Returns `Ok(false)` when confirmation was declined. The store is only
/// touched after the repository call succeeds.
pub fn delete_project<R: ProjectRepository + ?Sized>(
    repo: &mut R,
    store: &mut FeatureStore,
    screen: Screen,
    id: &str,
    confirm: &dyn Confirm,
) -> Result<bool, SubmitError> {
    if !confirm.confirm(screen.delete_prompt()) {
        debug!(id, "delete declined");
        return Ok(false);
    }

    if let Err(e) = repo.delete_project(id) {
        warn!(id, error = %e, "project delete failed");
        return Err(SubmitError::persistence("delete", e));
    }
    store.remove(id);
    info!(id, "deleted project");
    Ok(true)
}
