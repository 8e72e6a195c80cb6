//! Request handlers

use axum::{body::Bytes, extract::State, Json};
use std::time::Instant;
use tracing::{debug, warn};

use super::error::ApiResult;
use super::{AppState, ModelState};
use crate::types::prediction::{Prediction, PredictionResponse};
use crate::types::telemetry::TelemetryRequest;

/// `POST /predict`
///
/// The raw body is parsed by hand so that JSON and type problems map onto
/// the same error bodies regardless of the request's content type.
pub async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<PredictionResponse>> {
    let started = Instant::now();

    match classify(&state.model, &body) {
        Ok(prediction) => {
            let elapsed = started.elapsed();
            state
                .metrics
                .record_prediction(&prediction.label, prediction.probability, elapsed);
            debug!(
                prediction = prediction.class_code,
                label = %prediction.label,
                probability = prediction.probability,
                latency_us = elapsed.as_micros() as u64,
                "Prediction served"
            );
            Ok(Json(PredictionResponse::from(&prediction)))
        }
        Err(err) => {
            state.metrics.record_rejection(err.kind(), started.elapsed());
            warn!(kind = err.kind(), error = %err, "Prediction request rejected");
            Err(err)
        }
    }
}

fn classify(model: &ModelState, body: &[u8]) -> ApiResult<Prediction> {
    let engine = model.engine()?;
    let request = TelemetryRequest::from_slice(body)?;
    Ok(engine.predict(&request.to_telemetry())?)
}
