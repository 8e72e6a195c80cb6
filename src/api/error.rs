//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::logistic::PredictionError;
use crate::types::prediction::ErrorBody;
use crate::types::telemetry::InputError;

/// Errors a request handler can answer with
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body could not be turned into telemetry
    #[error("{}: {}", input_prefix(.0), .0)]
    Input(#[from] InputError),

    /// The classifier rejected the encoded features
    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictionError),

    /// No model is loaded
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// A handler panicked or failed in an unforeseen way
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    /// Collector could not append to the capture file
    #[error("Error saving data")]
    CaptureWrite(String),

    /// Collector stored the record but could not classify it
    #[error("Error predicting data")]
    CapturePrediction(String),
}

impl ApiError {
    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Input(e) if e.is_value_error() => "value_error",
            ApiError::Input(_) => "type_error",
            ApiError::Prediction(_) => "prediction_error",
            ApiError::Unavailable(_) => "unavailable",
            ApiError::Unexpected(_) => "unexpected",
            ApiError::CaptureWrite(_) => "capture_write",
            ApiError::CapturePrediction(_) => "capture_prediction",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Input(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Prediction(_)
            | ApiError::Unexpected(_)
            | ApiError::CaptureWrite(_)
            | ApiError::CapturePrediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

fn input_prefix(error: &InputError) -> &'static str {
    if error.is_value_error() {
        "ValueError"
    } else {
        "TypeError"
    }
}

/// Result type alias for handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_prefixes() {
        let err = ApiError::from(InputError::EmptyInput);
        assert_eq!(err.to_string(), "ValueError: The list 'mouseMovements' is empty");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "value_error");

        let err = ApiError::from(InputError::NotAnObject("array"));
        assert!(err.to_string().starts_with("TypeError: "));
        assert_eq!(err.kind(), "type_error");
    }

    #[test]
    fn test_server_side_statuses() {
        let err = ApiError::from(PredictionError::NonFiniteScore(f64::NAN));
        assert!(err.to_string().starts_with("Prediction error: "));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ApiError::Unavailable("model not loaded".to_string());
        assert_eq!(err.to_string(), "Service unavailable: model not loaded");
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err = ApiError::Unexpected("boom".to_string());
        assert_eq!(err.to_string(), "Unexpected error: boom");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(
            ApiError::CaptureWrite("disk full".to_string()).to_string(),
            "Error saving data"
        );
    }
}
