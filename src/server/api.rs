use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};

use quadrant_common::{Category, ColumnView, Identity, Task, TaskId};

use crate::board::{BoardController, SubmitOutcome};
use crate::errors::{BoardError, StoreError};
use crate::store::{TaskStore, first_snapshot};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    /// The signed-in identity whose board is served.
    pub owner: Identity,
}

pub type SharedState = Arc<AppState>;

// ── Request / response payloads ───────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub text: String,
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    pub text: Option<String>,
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct DropRequest {
    /// Raw id of the drop target; only quadrant ids move the task.
    pub target: String,
}

#[derive(Serialize)]
pub struct Created {
    pub id: TaskId,
}

#[derive(Serialize)]
pub struct BoardResponse {
    pub columns: Vec<ColumnView>,
    pub unknown: Vec<Task>,
    pub completed: Vec<Task>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::TaskNotFound { .. } => ApiError::NotFound(e.to_string()),
            StoreError::MissingOwner | StoreError::EmptyText => ApiError::BadRequest(e.to_string()),
            StoreError::Database(_) | StoreError::SubscriptionClosed => {
                tracing::error!(error = %e, "store failure");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<BoardError> for ApiError {
    fn from(e: BoardError) -> Self {
        match e {
            BoardError::Store(inner) => inner.into(),
            BoardError::UnknownTask(_) => ApiError::NotFound(e.to_string()),
            BoardError::NotSignedIn
            | BoardError::AmbiguousTask(_)
            | BoardError::TaskCompleted(_)
            | BoardError::DragInProgress => ApiError::BadRequest(e.to_string()),
        }
    }
}

fn parse_category(raw: &str) -> Result<Category, ApiError> {
    Category::from_user_input(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/me", get(me))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/clear-completed", post(clear_completed))
        .route("/api/tasks/{id}", patch(update_task))
        .route("/api/tasks/{id}/complete", post(complete_task))
        .route("/api/tasks/{id}/drop", post(drop_task))
        .route("/api/board", get(get_board))
        .route("/health", get(health_check))
}

/// A controller loaded with the owner's current snapshot.
async fn loaded_board(state: &SharedState) -> Result<BoardController, ApiError> {
    let tasks = first_snapshot(state.store.as_ref(), &state.owner.uid).await?;
    let mut board = BoardController::new(state.store.clone(), state.owner.clone());
    board.model.apply_snapshot(tasks);
    Ok(board)
}

fn require_task(board: &BoardController, id: &str) -> Result<(), ApiError> {
    board
        .model
        .task(id)
        .map(|_| ())
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn me(State(state): State<SharedState>) -> Json<Identity> {
    Json(state.owner.clone())
}

async fn list_tasks(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let tasks = first_snapshot(state.store.as_ref(), &state.owner.uid).await?;
    Ok(Json(tasks))
}

async fn get_board(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let board = loaded_board(&state).await?;
    let view = board.model.view();
    Ok(Json(BoardResponse {
        columns: view.columns(),
        unknown: view.unknown.clone(),
        completed: view.completed.clone(),
    }))
}

async fn create_task(
    State(state): State<SharedState>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = match req.category.as_deref() {
        Some(raw) => parse_category(raw)?,
        None => Category::DEFAULT,
    };
    let id = state.store.create(&state.owner.uid, &req.text, category).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// Edit in place, the way the form does: text and quadrant together.
async fn update_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(StoreError::EmptyText.into());
    }
    let category = req.category.as_deref().map(parse_category).transpose()?;

    let mut board = loaded_board(&state).await?;
    board.model.start_edit(&id)?;
    if let Some(text) = req.text {
        board.model.form.text = text;
    }
    if let Some(category) = category {
        board.model.form.category = category;
    }
    match board.submit().await? {
        SubmitOutcome::Updated(_) => Ok(StatusCode::NO_CONTENT),
        other => Err(ApiError::Internal(format!("unexpected submit outcome {:?}", other))),
    }
}

async fn complete_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<CompleteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut board = loaded_board(&state).await?;
    let changed = board.set_completed(&id, req.completed).await?;
    Ok(Json(serde_json::json!({ "changed": changed })))
}

async fn drop_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<DropRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut board = loaded_board(&state).await?;
    require_task(&board, &id)?;
    let moved = board.drop_on(&id, &req.target).await?;
    Ok(Json(serde_json::json!({ "moved": moved })))
}

async fn clear_completed(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let mut board = loaded_board(&state).await?;
    let removed = board.clear_completed().await?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}

// ── Tests ─────────────────────────────────────────────────────────────
