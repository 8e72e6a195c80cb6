//! HTTP prediction service
//!
//! One route, `POST /predict`. The model is loaded once at startup; when the
//! artifact cannot be loaded the service still starts and answers 503.

pub mod error;
pub mod handlers;

use axum::{
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::metrics::ServiceMetrics;
use crate::models::inference::InferenceEngine;

pub use error::{ApiError, ApiResult};

/// Whether a classifier is available to serve requests
#[derive(Debug, Clone)]
pub enum ModelState {
    Ready(Arc<InferenceEngine>),
    /// Loading failed; holds the reason
    Unavailable(String),
}

impl ModelState {
    /// Load the artifact at `path`, degrading to `Unavailable` on failure.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match InferenceEngine::load(path) {
            Ok(engine) => {
                info!(
                    model_id = %engine.model_id(),
                    classes = ?engine.classes().names(),
                    "Model ready"
                );
                ModelState::Ready(Arc::new(engine))
            }
            Err(e) => {
                error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load model; serving 503 until restarted"
                );
                ModelState::Unavailable(format!("model not loaded: {e}"))
            }
        }
    }

    pub fn engine(&self) -> ApiResult<&InferenceEngine> {
        match self {
            ModelState::Ready(engine) => Ok(engine.as_ref()),
            ModelState::Unavailable(reason) => Err(ApiError::Unavailable(reason.clone())),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready(_))
    }
}

impl From<InferenceEngine> for ModelState {
    fn from(engine: InferenceEngine) -> Self {
        ModelState::Ready(Arc::new(engine))
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub model: ModelState,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(model: ModelState) -> Self {
        Self {
            model,
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }
}

/// Create the prediction service router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(permissive_cors())
}

/// Any origin, any method, any header
pub fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin)
}

/// Turn a handler panic into a 500 JSON body.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    error!(detail = %detail, "Request handler panicked");
    ApiError::Unexpected(detail).into_response()
}

/// Resolves on Ctrl-C; used for graceful shutdown of the HTTP binaries.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining connections"),
        Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
    }
}
