//! HTTP contract of the prediction service

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use bot_detection::{
    api::{create_router, panic_response, AppState, ModelState},
    feature_extractor::{Thresholds, FEATURE_COUNT},
    models::{
        artifact::ModelArtifact, inference::InferenceEngine, logistic::LogisticRegression,
        vocabulary::{CategoricalVocabularies, CategoryVocabulary, ClassLabels},
    },
};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;

const SAMPLE: &str = r#"{"mouseMovements": [{"timestamp": 10}, {"timestamp": 300}], "screenWidth": 1536, "screenHeight": 864, "timeOnPage": 15, "clicks": 8, "keyPresses": 20, "language": "en-GB", "browserName": "Chrome", "userAgent": "UA1", "referrer": "direct"}"#;

/// Votes `human` when mouse, width and height thresholds all pass.
fn engine() -> InferenceEngine {
    let mut weights = vec![0.0; FEATURE_COUNT];
    weights[0] = 2.0;
    weights[1] = 2.0;
    weights[2] = 2.0;
    let artifact = ModelArtifact::new(
        Thresholds::default(),
        CategoricalVocabularies {
            browser_name: CategoryVocabulary::fit(["Chrome", "Firefox"]),
            user_agent: CategoryVocabulary::fit(["UA1"]),
            referrer: CategoryVocabulary::fit(["direct"]),
        },
        ClassLabels::fit(["bot", "human"]),
        LogisticRegression {
            weights,
            intercept: -5.0,
        },
    );
    InferenceEngine::from_artifact(artifact).unwrap()
}

fn app() -> (Router, AppState) {
    let state = AppState::new(ModelState::from(engine()));
    (create_router(state.clone()), state)
}

async fn post(app: Router, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_predict_end_to_end() {
    let (app, state) = app();
    let (status, body) = post(app, SAMPLE).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"prediction": 1}));
    assert_eq!(state.metrics.predictions_served.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_predict_bot_like_session() {
    let (app, _) = app();
    let body = json!({
        "mouseMovements": [{"timestamp": 1}, {"timestamp": 2}],
        "screenWidth": 800,
        "screenHeight": 600,
        "browserName": "HeadlessChrome"
    });
    let (status, body) = post(app, &body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], 0);
}

#[tokio::test]
async fn test_empty_mouse_movements_is_value_error() {
    let (app, state) = app();
    let (status, body) = post(app, r#"{"mouseMovements": []}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValueError: The list 'mouseMovements' is empty");
    assert_eq!(
        state.metrics.rejections_by_kind().get("value_error"),
        Some(&1)
    );
}

#[tokio::test]
async fn test_missing_mouse_movements_is_value_error() {
    let (app, _) = app();
    let (status, body) = post(app, r#"{"screenWidth": 1920}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "ValueError: Expected 'mouseMovements' to be a list"
    );
}

#[tokio::test]
async fn test_non_list_mouse_movements_is_value_error() {
    for body in [r#"{"mouseMovements": {"timestamp": 1}}"#, r#"{"mouseMovements": 5}"#] {
        let (app, _) = app();
        let (status, body) = post(app, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "ValueError: Expected 'mouseMovements' to be a list"
        );
    }
}

#[tokio::test]
async fn test_unconvertible_timestamp_is_value_error() {
    let (app, _) = app();
    let (status, body) = post(app, r#"{"mouseMovements": [{"timestamp": "later"}]}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "ValueError: All elements in 'mouseMovements' should be convertible to integers"
    );
}

#[tokio::test]
async fn test_wrong_field_type_is_type_error() {
    let (app, _) = app();
    let (status, body) = post(
        app,
        r#"{"mouseMovements": [{"timestamp": 1}], "screenWidth": "wide"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("TypeError: "));
}

#[tokio::test]
async fn test_malformed_json_is_value_error() {
    let (app, _) = app();
    let (status, body) = post(app, "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("ValueError: "));
}

#[tokio::test]
async fn test_unavailable_model_returns_503() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(ModelState::load(dir.path().join("missing.json")));
    assert!(!state.model.is_ready());

    let (status, body) = post(create_router(state), SAMPLE).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Service unavailable: "));
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let (app, _) = app();
    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/predict")
                .header("origin", "https://shop.example")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}

#[tokio::test]
async fn test_no_other_routes() {
    let (app, _) = app();
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_handler_panic_is_unexpected_error() {
    async fn explode() -> &'static str {
        panic!("boom")
    }

    let app = Router::new()
        .route("/predict", axum::routing::post(explode))
        .layer(CatchPanicLayer::custom(panic_response));
    let (status, body) = post(app, SAMPLE).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Unexpected error: boom");
}

#[tokio::test]
async fn test_panic_payload_string_is_reported() {
    let response = panic_response(Box::new(String::from("index out of range")));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Unexpected error: "));
}
