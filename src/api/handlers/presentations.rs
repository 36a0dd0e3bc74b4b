use crate::{
    types::{AppError, CreatePresentationRequest, Presentation, Result},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

/// Create the presentation record an outline stream will read
pub async fn create_presentation(
    State(state): State<AppState>,
    Json(payload): Json<CreatePresentationRequest>,
) -> Result<(StatusCode, Json<Presentation>)> {
    let presentation = state.store.create_presentation(&payload).await?;
    tracing::info!(presentation_id = %presentation.id, "Presentation created");

    Ok((StatusCode::CREATED, Json(presentation)))
}

pub async fn get_presentation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Presentation>> {
    state
        .store
        .get_presentation(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Presentation {} not found", id)))
}
