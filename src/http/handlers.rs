use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use serde::Serialize;

use super::error::ApiError;
use super::extract::EntryRequest;
use super::AppState;
use crate::entity::JournalEntry;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub message: &'static str,
    pub deleted_id: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime: f64,
}

pub async fn index() -> Html<&'static str> {
    Html(
        "<h1>Journal Server</h1><ul><li><a href=\"/api/journalEntries\">/api/journalEntries</a></li></ul>",
    )
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime: state.uptime().as_secs_f64(),
    })
}

pub async fn list_entries(
    State(state): State<AppState>,
) -> Result<Json<Vec<JournalEntry>>, ApiError> {
    Ok(Json(state.service.list().await?))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JournalEntry>, ApiError> {
    Ok(Json(state.service.get(&id).await?))
}

pub async fn create_entry(
    State(state): State<AppState>,
    request: EntryRequest,
) -> Result<(StatusCode, Json<JournalEntry>), ApiError> {
    let entry = state
        .service
        .create(request.fields, request.upload)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: EntryRequest,
) -> Result<Json<JournalEntry>, ApiError> {
    let entry = state
        .service
        .update(&id, request.fields, request.upload)
        .await?;
    Ok(Json(entry))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let removed = state.service.delete(&id).await?;
    Ok(Json(DeletedResponse {
        message: "Deleted",
        deleted_id: removed.id,
    }))
}
