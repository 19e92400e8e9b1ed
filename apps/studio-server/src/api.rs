/// REST API endpoints for studio projects
/// Handles project CRUD for the editor and the public embed feed
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use project::{ProjectInfo, ProjectStore, StoreError};
use serde_json::json;
use timeline::{Project, ProjectId};
use tracing::{error, info, warn};

use crate::models::*;
use crate::AppState;

pub const EMBED_CACHE_CONTROL: &str = "public, max-age=60";

/// API error type
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthenticated,
    NotFound,
    /// The body was not a readable project document.
    Unprocessable(String),
    Conflict(String),
    StorageError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::StorageError(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Storage error: {}", e))
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(StoreError::Conflict(msg)) = err.downcast_ref::<StoreError>() {
            return ApiError::Conflict(msg.clone());
        }
        error!(error = %err, "storage failure");
        ApiError::StorageError(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::NotFound,
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Backend(e) => e.into(),
        }
    }
}

fn parse_id(raw: &str) -> Result<ProjectId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid project id: {}", raw)))
}

/// GET /api/health
pub async fn health() -> &'static str {
    "ok"
}

/// GET /api/projects - Project listing without the documents
pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectInfo>>, ApiError> {
    Ok(Json(state.db.lock().list_projects()?))
}

/// POST /api/projects - Create an empty project
pub async fn create_project(
    State(state): State<AppState>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }
    let project = state.db.lock().create_project(&req.name)?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.db.lock().load_project(id)?))
}

/// PUT /api/projects/:id - Save the whole document
pub async fn save_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ProjectInfo>, ApiError> {
    let id = parse_id(&id)?;
    let text = std::str::from_utf8(&body)
        .map_err(|_| ApiError::Unprocessable("Body is not UTF-8".to_string()))?;
    let project = Project::from_json(text)
        .map_err(|e| ApiError::Unprocessable(format!("Malformed project: {}", e)))?;

    if project.id != id {
        return Err(ApiError::BadRequest(format!(
            "Body id {} does not match path id {}",
            project.id, id
        )));
    }
    let issues = project.validate();
    if !issues.is_empty() {
        let messages: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
        warn!(project = %id, issues = ?messages, "save rejected");
        return Err(ApiError::BadRequest(messages.join("; ")));
    }

    let db = state.db.lock();
    db.save_project(&project)?;
    let info = db.project_info(id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(info))
}

/// PATCH /api/projects/:id - Rename
pub async fn rename_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RenameProjectRequest>,
) -> Result<Json<ProjectInfo>, ApiError> {
    let id = parse_id(&id)?;
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }
    let db = state.db.lock();
    if !db.rename_project(id, &req.name)? {
        return Err(ApiError::NotFound);
    }
    let info = db.project_info(id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(info))
}

/// DELETE /api/projects/:id
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    if state.db.lock().delete_project(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// GET /api/embed/:id - Public project feed for the player
pub async fn embed_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let project = state.db.lock().load_project(id)?;
    info!(project = %id, "embed served");
    Ok((
        [(header::CACHE_CONTROL, EMBED_CACHE_CONTROL)],
        Json(project),
    )
        .into_response())
}
