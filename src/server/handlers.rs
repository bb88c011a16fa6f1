use super::types::ApiError;
use crate::{
    Error, Result,
    detection::{DetectionResponse, DetectionService, HealthStatus, ImageUpload},
};
use axum::{
    extract::{Multipart, State, multipart::MultipartRejection},
    response::Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const IMAGE_FIELD: &str = "image";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DetectionService>,
    /// Include debug renderings of errors in responses.
    pub debug: bool,
}

impl AppState {
    pub fn new(service: Arc<DetectionService>, debug: bool) -> Self {
        Self { service, debug }
    }

    fn fail(&self, error: Error) -> ApiError {
        ApiError::new(error, self.debug)
    }
}

pub async fn detect(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<DetectionResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    info!(%request_id, "Received detection request");

    // Report a missing model before looking at the payload.
    state.service.ensure_available().map_err(|e| state.fail(e))?;

    let multipart = multipart.map_err(|_| state.fail(Error::MissingImage))?;
    let upload = read_image_field(multipart)
        .await
        .map_err(|e| state.fail(e))?;

    let response = state
        .service
        .detect(upload)
        .await
        .map_err(|e| state.fail(e))?;

    info!(%request_id, detections = response.detections.len(), "Detection request completed");
    Ok(Json(response))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.service.health())
}

async fn read_image_field(mut multipart: Multipart) -> Result<ImageUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid_image(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::invalid_image(e.body_text()))?;

        return Ok(ImageUpload::new(filename, bytes.to_vec()));
    }

    Err(Error::MissingImage)
}
