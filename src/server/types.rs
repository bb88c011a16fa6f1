use crate::{Error, error::ErrorKind};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// An [`Error`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError {
    error: Error,
    with_details: bool,
}

impl ApiError {
    pub fn new(error: Error, with_details: bool) -> Self {
        Self {
            error,
            with_details,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.error.kind() {
            ErrorKind::ClientInput => StatusCode::BAD_REQUEST,
            ErrorKind::Unavailable | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Error processing image: {}", self.error);
        } else {
            warn!("Rejected request: {}", self.error);
        }

        let body = ErrorResponse {
            error: self.error.to_string(),
            details: self.with_details.then(|| format!("{:?}", self.error)),
        };

        (status, Json(body)).into_response()
    }
}
