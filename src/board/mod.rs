//! Board view-model and controller.
//!
//! `BoardModel` is plain state: the latest snapshot, its partition, the
//! input form, the edit and drag sessions, sidebar visibility and the last
//! notice. `BoardController` turns user intents into store mutations. It
//! never edits `tasks` itself; the effect of a write shows up when the
//! store pushes the next snapshot into [`BoardModel::apply_snapshot`].

pub mod drag;
pub mod form;

use std::sync::Arc;

use chrono::Utc;

use quadrant_common::{
    BoardView, Category, Identity, Task, TaskId, completion_patch, drop_patch, edit_patch,
    partition,
};

use crate::errors::{BoardError, StoreError};
use crate::store::{Subscription, TaskStore};

pub use drag::{DragRelease, DragSession};
pub use form::TaskForm;

/// One user-visible message under the header.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(s) | Notice::Error(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Blank input; nothing was written.
    Ignored,
    Created(TaskId),
    Updated(TaskId),
}

#[derive(Debug, Clone)]
pub struct BoardModel {
    tasks: Vec<Task>,
    view: BoardView,
    loaded: bool,
    pub form: TaskForm,
    editing: Option<TaskId>,
    pub drag: DragSession,
    completed_open: bool,
    notice: Option<Notice>,
}

impl Default for BoardModel {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            view: BoardView::default(),
            loaded: false,
            form: TaskForm::default(),
            editing: None,
            drag: DragSession::default(),
            completed_open: true,
            notice: None,
        }
    }
}

impl BoardModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace state with a pushed snapshot.
    ///
    /// An edit or drag whose task is gone or no longer active is dropped.
    pub fn apply_snapshot(&mut self, tasks: Vec<Task>) {
        self.view = partition(&tasks);
        self.tasks = tasks;
        self.loaded = true;

        if let Some(id) = &self.editing {
            if !self.is_active_task(id) {
                tracing::debug!(task = %id, "edited task left the board, ending edit");
                self.editing = None;
                self.form.clear();
            }
        }
        if let Some(id) = self.drag.active() {
            if !self.is_active_task(id) {
                self.drag.cancel();
            }
        }
    }

    pub fn snapshot_failed(&mut self, err: &StoreError) {
        tracing::warn!(error = %err, "snapshot failed");
        self.notice = Some(Notice::Error(format!("Kunde inte läsa uppgifter: {}", err)));
    }

    fn is_active_task(&self, id: &str) -> bool {
        self.task(id).is_some_and(|t| !t.completed)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn view(&self) -> &BoardView {
        &self.view
    }

    /// Whether at least one snapshot has arrived.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn completed_open(&self) -> bool {
        self.completed_open
    }

    pub fn toggle_completed_panel(&mut self) {
        self.completed_open = !self.completed_open;
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// Load an active task into the form and mark it as being edited.
    pub fn start_edit(&mut self, task_id: &str) -> Result<(), BoardError> {
        let task = self
            .task(task_id)
            .ok_or_else(|| BoardError::UnknownTask(task_id.to_string()))?;
        if task.completed {
            return Err(BoardError::TaskCompleted(task.text.clone()));
        }
        let text = task.text.clone();
        let category = task.quadrant().unwrap_or(Category::DEFAULT);
        self.form.load(&text, category);
        self.editing = Some(task_id.to_string());
        Ok(())
    }

    /// A click on a task body. Suppressed while a drag is active; returns
    /// whether an edit session started.
    pub fn click_task(&mut self, task_id: &str) -> Result<bool, BoardError> {
        if self.drag.is_active() {
            tracing::debug!(task = task_id, "click suppressed during drag");
            return Ok(false);
        }
        self.start_edit(task_id)?;
        Ok(true)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.form.clear();
    }

    /// Resolve a user reference: a board number or an id prefix.
    pub fn resolve(&self, reference: &str) -> Result<&Task, BoardError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(BoardError::UnknownTask(reference.to_string()));
        }
        if let Ok(n) = reference.parse::<usize>() {
            if n >= 1 {
                if let Some(task) = self.view.ordered().nth(n - 1) {
                    return Ok(task);
                }
            }
        }
        if let Some(task) = self.task(reference) {
            return Ok(task);
        }
        let mut matches = self.tasks.iter().filter(|t| t.id.starts_with(reference));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task),
            (Some(_), Some(_)) => Err(BoardError::AmbiguousTask(reference.to_string())),
            (None, _) => Err(BoardError::UnknownTask(reference.to_string())),
        }
    }
}

/// Wires user intents on one owner's board to the store.
pub struct BoardController {
    store: Arc<dyn TaskStore>,
    owner: Identity,
    pub model: BoardModel,
}

impl BoardController {
    pub fn new(store: Arc<dyn TaskStore>, owner: Identity) -> Self {
        Self {
            store,
            owner,
            model: BoardModel::new(),
        }
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub async fn subscribe(&self) -> Result<Subscription, StoreError> {
        self.store.subscribe(&self.owner.uid).await
    }

    /// Show an error as a notice and swallow it.
    pub fn surface<T>(&mut self, result: Result<T, BoardError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(owner = %self.owner.uid, error = %e, "board action failed");
                self.model.set_notice(Notice::Error(e.to_string()));
                None
            }
        }
    }

    /// Submit the form: update in place while editing, otherwise create.
    ///
    /// On failure the form keeps its contents so the user can retry.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, BoardError> {
        let Some(text) = self.model.form.submission().map(str::to_string) else {
            return Ok(SubmitOutcome::Ignored);
        };
        let category = self.model.form.category;

        let outcome = match self.model.editing.clone() {
            Some(id) => {
                let patch = edit_patch(&text, category, Utc::now());
                self.store.update(&self.owner.uid, &id, patch).await?;
                self.model.editing = None;
                SubmitOutcome::Updated(id)
            }
            None => {
                let id = self.store.create(&self.owner.uid, &text, category).await?;
                SubmitOutcome::Created(id)
            }
        };
        self.model.form.clear();
        Ok(outcome)
    }

    /// Drive the completion state machine. Returns whether anything was written.
    pub async fn set_completed(&mut self, task_id: &str, completed: bool) -> Result<bool, BoardError> {
        let task = self
            .model
            .task(task_id)
            .ok_or_else(|| BoardError::UnknownTask(task_id.to_string()))?;
        let Some(patch) = completion_patch(task, completed, Utc::now()) else {
            return Ok(false);
        };
        self.store.update(&self.owner.uid, task_id, patch).await?;
        Ok(true)
    }

    pub async fn toggle_complete(&mut self, task_id: &str) -> Result<bool, BoardError> {
        let completed = self
            .model
            .task(task_id)
            .map(|t| t.completed)
            .ok_or_else(|| BoardError::UnknownTask(task_id.to_string()))?;
        self.set_completed(task_id, !completed).await
    }

    pub fn drag_start(&mut self, task_id: &str) -> Result<(), BoardError> {
        let task = self
            .model
            .task(task_id)
            .ok_or_else(|| BoardError::UnknownTask(task_id.to_string()))?;
        if task.completed {
            return Err(BoardError::TaskCompleted(task.text.clone()));
        }
        if !self.model.drag.start(task_id) {
            return Err(BoardError::DragInProgress);
        }
        Ok(())
    }

    pub fn drag_over(&mut self, target: Option<&str>) {
        self.model.drag.over(target);
    }

    /// Release the drag on `target`, or on the hovered target if `None`.
    pub async fn drag_end(&mut self, target: Option<&str>) -> Result<bool, BoardError> {
        let Some(release) = self.model.drag.end(target) else {
            return Ok(false);
        };
        match release.target {
            Some(target) => self.drop_on(&release.task_id, &target).await,
            None => Ok(false),
        }
    }

    pub fn drag_cancel(&mut self) {
        self.model.drag.cancel();
    }

    /// Recategorize `task_id` as if dropped on `target`. Non-quadrant
    /// targets, the task's own quadrant, completed and missing tasks are
    /// no-ops.
    pub async fn drop_on(&mut self, task_id: &str, target: &str) -> Result<bool, BoardError> {
        let Some(task) = self.model.task(task_id) else {
            return Ok(false);
        };
        let Some(patch) = drop_patch(task, target) else {
            tracing::debug!(task = task_id, target, "drop ignored");
            return Ok(false);
        };
        self.store.update(&self.owner.uid, task_id, patch).await?;
        Ok(true)
    }

    /// Delete every task completed in the current snapshot.
    pub async fn clear_completed(&mut self) -> Result<usize, BoardError> {
        let ids: Vec<TaskId> = self
            .model
            .view()
            .completed
            .iter()
            .map(|t| t.id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        Ok(self.store.batch_delete(&self.owner.uid, &ids).await?)
    }
}
