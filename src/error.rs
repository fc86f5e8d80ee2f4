use crate::region::BoundingBox;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnprError {
    #[error("No number plate detected")]
    NoDetection,

    #[error("Invalid plate region {bbox} for image of {width}x{height}")]
    InvalidRegion {
        bbox: BoundingBox,
        width: u32,
        height: u32,
    },

    #[error("Plate region is empty")]
    EmptyRegion,

    #[error("Recognition engine failed: {0}")]
    RecognitionEngine(String),

    #[error("Plate detector failed: {0}")]
    Detection(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to initialize engine: {0}")]
    InitializationError(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Upload exceeds the {max} byte limit")]
    BodyTooLarge { max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnprError {
    /// HTTP status and machine-readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AnprError::NoDetection => (StatusCode::OK, "NO_DETECTION"),
            AnprError::InvalidRegion { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_REGION")
            }
            AnprError::EmptyRegion => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_REGION"),
            AnprError::RecognitionEngine(_) => {
                (StatusCode::BAD_GATEWAY, "RECOGNITION_ENGINE_ERROR")
            }
            AnprError::Detection(_) => (StatusCode::BAD_GATEWAY, "DETECTION_ERROR"),
            AnprError::Decode(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_FORMAT"),
            AnprError::InitializationError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INIT_ERROR"),
            AnprError::ImageTooLarge { .. } | AnprError::BodyTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE")
            }
            AnprError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            AnprError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            AnprError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Informational body returned when no plate region was found
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl IntoResponse for AnprError {
    fn into_response(self) -> Response {
        // Not a failure from the client's point of view
        if let AnprError::NoDetection = self {
            let body = Json(MessageResponse {
                message: self.to_string(),
            });
            return (StatusCode::OK, body).into_response();
        }

        let (status, code) = self.status_and_code();

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_detection_is_not_an_error_status() {
        let response = AnprError::NoDetection.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_engine_failures_map_to_bad_gateway() {
        let response = AnprError::RecognitionEngine("model crashed".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let (_, code) = AnprError::Detection("bad tensor".to_string()).status_and_code();
        assert_eq!(code, "DETECTION_ERROR");
    }

    #[test]
    fn test_region_errors_are_unprocessable() {
        let err = AnprError::InvalidRegion {
            bbox: BoundingBox::new(0, 0, 500, 10),
            width: 100,
            height: 100,
        };
        assert_eq!(err.status_and_code().0, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("[0, 0, 500, 10]"));
        assert_eq!(
            AnprError::EmptyRegion.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_upload_errors_are_client_errors() {
        let err = AnprError::ImageTooLarge { size: 10, max: 5 };
        assert_eq!(err.status_and_code().0, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            AnprError::BodyTooLarge { max: 5 }.status_and_code(),
            (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE")
        );
        assert_eq!(AnprError::MissingFile.status_and_code().0, StatusCode::BAD_REQUEST);
        assert_eq!(
            AnprError::Decode("not an image".to_string()).status_and_code().1,
            "UNSUPPORTED_FORMAT"
        );
    }
}
