//! Artifact download endpoint

use crate::artifacts::{image_mime_type, ArtifactKind};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};

/// GET /artifacts/:request_id/image
pub async fn get_image(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let bytes = state
        .orchestrator
        .store()
        .load(&request_id, ArtifactKind::Image)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No image stored for request {}", request_id)))?;

    Ok(([(header::CONTENT_TYPE, image_mime_type(&bytes))], bytes))
}

/// Build artifact routes
pub fn artifact_routes() -> Router<AppState> {
    Router::new().route("/artifacts/:request_id/image", get(get_image))
}
