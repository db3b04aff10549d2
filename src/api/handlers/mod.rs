use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::ArticleError;
use crate::models::*;
use crate::workspace::Workspace;

// ============================================================
// Error Handling
// ============================================================

/// Map an article error onto a status code and a message for the client.
///
/// Client mistakes are logged at warn, backend failures at error. Messages
/// carry no article text, so they are safe to return as is.
fn error_response(e: ArticleError) -> (StatusCode, String) {
    let status = match e {
        ArticleError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ArticleError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        ArticleError::BackendUnavailable(_) | ArticleError::ResolutionFailure { .. } => {
            StatusCode::BAD_GATEWAY
        }
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", e);
    } else {
        tracing::warn!("Request rejected: {}", e);
    }
    (status, e.to_string())
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Documents
// ============================================================

pub async fn get_document_blocks(
    State(workspace): State<Workspace>,
    Path(doc_id): Path<String>,
) -> Result<Json<DocumentContent>, (StatusCode, String)> {
    workspace
        .load_document(&doc_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Proxy one document image as raw bytes with its content type.
pub async fn get_document_image(
    State(workspace): State<Workspace>,
    Path((doc_id, token)): Path<(String, String)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let image = workspace
        .document_image(&doc_id, &token)
        .await
        .map_err(error_response)?;
    let bytes = image.bytes().map_err(|e| {
        error_response(ArticleError::ResolutionFailure {
            token: token.clone(),
            reason: e.to_string(),
        })
    })?;

    Ok(([(header::CONTENT_TYPE, image.mime_type)], bytes))
}

// ============================================================
// Sessions
// ============================================================

pub async fn create_article(
    State(workspace): State<Workspace>,
    Json(input): Json<CreateArticleInput>,
) -> Result<(StatusCode, Json<TurnOutcome>), (StatusCode, String)> {
    workspace
        .generate(input)
        .await
        .map(|outcome| (StatusCode::CREATED, Json(outcome)))
        .map_err(error_response)
}

pub async fn refine_article(
    State(workspace): State<Workspace>,
    Json(input): Json<RefineArticleInput>,
) -> Result<Json<TurnOutcome>, (StatusCode, String)> {
    workspace
        .refine(input)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn list_sessions(State(workspace): State<Workspace>) -> Json<Vec<SessionSummary>> {
    Json(workspace.sessions().await)
}

pub async fn get_session(
    State(workspace): State<Workspace>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, (StatusCode, String)> {
    workspace
        .session(id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Reset is tolerant: resetting an unknown id reports `released: false`.
pub async fn reset_session(
    State(workspace): State<Workspace>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let released = workspace.reset(id).await.map_err(error_response)?;
    Ok(Json(serde_json::json!({ "released": released })))
}

pub async fn preview_article(
    State(workspace): State<Workspace>,
    Path(id): Path<Uuid>,
) -> Result<Json<Preview>, (StatusCode, String)> {
    workspace
        .preview(id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn publish_article(
    State(workspace): State<Workspace>,
    Path(id): Path<Uuid>,
    Json(options): Json<PublishOptions>,
) -> Result<Json<PublishReport>, (StatusCode, String)> {
    workspace
        .publish(id, options)
        .await
        .map(Json)
        .map_err(error_response)
}
