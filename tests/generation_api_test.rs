// HTTP surface: authentication, request parsing and error bodies
mod common;

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::*;
use serde_json::{json, Value};
use tryon_backend_core::models::{GenerationStatus, QualityTier};
use uuid::Uuid;

fn model_body(target: Uuid, images: Value) -> Value {
    json!({
        "targetId": target,
        "qualityTier": "standard",
        "config": {
            "gender": "female",
            "ethnicity": "east_asian",
            "ageRange": "young_adult",
            "bodyType": "athletic",
            "pose": "standing_front",
            "background": "studio_white"
        },
        "referenceImages": images
    })
}

#[tokio::test]
async fn test_missing_token_is_unauthenticated() {
    let h = Harness::new();
    let app = h.test_app();

    let response = app
        .post("/api/v1/generations/model")
        .json(&model_body(Uuid::new_v4(), json!([])))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await;
    assert_eq!(body["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_invalid_token_is_unauthenticated() {
    let h = Harness::new();
    let app = h.test_app();

    let response = app
        .post("/api/v1/generations/model")
        .bearer("not.a.jwt")
        .json(&model_body(Uuid::new_v4(), json!([])))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_model_generation_completes_over_http() {
    let h = Harness::new();
    let app = h.test_app();
    let user = h.trial_user(5, 1, 0);
    let target = h.pending_generation(user);
    h.provider
        .push_status(Ok(tryon_backend_core::services::TaskStatus::succeeded(RESULT_URL)));

    let response = app
        .post("/api/v1/generations/model")
        .bearer(&app.token_for(user))
        .json(&model_body(
            target,
            json!([{ "type": "garment", "sourceData": "https://cdn.example.com/dress.png" }]),
        ))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await;
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["imageUrl"], RESULT_URL);
    assert_eq!(body["qualityTier"], "standard");
    assert_eq!(body["creditCost"], 0);
    assert_eq!(h.balances(user), (4, 1, 0));
}

#[tokio::test]
async fn test_zero_images_is_bad_request() {
    let h = Harness::new();
    let app = h.test_app();
    let user = h.trial_user(5, 0, 0);
    let target = h.pending_generation(user);

    let response = app
        .post("/api/v1/generations/model")
        .bearer(&app.token_for(user))
        .json(&model_body(target, json!([])))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await;
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(h.balances(user), (5, 0, 0));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let h = Harness::new();
    let app = h.test_app();
    let user = h.trial_user(5, 0, 0);

    let response = app
        .post("/api/v1/generations/model")
        .bearer(&app.token_for(user))
        .raw_json("{\"targetId\": ")
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await;
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_option_outside_allow_list_is_bad_request() {
    let h = Harness::new();
    let app = h.test_app();
    let user = h.trial_user(5, 0, 0);
    let mut body = model_body(
        h.pending_generation(user),
        json!([{ "type": "garment", "sourceData": "https://cdn.example.com/dress.png" }]),
    );
    body["config"]["pose"] = json!("handstand");

    let response = app
        .post("/api/v1/generations/model")
        .bearer(&app.token_for(user))
        .json(&body)
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.balances(user), (5, 0, 0));
}

#[tokio::test]
async fn test_foreign_generation_is_not_found() {
    let h = Harness::new();
    let app = h.test_app();
    let owner = h.trial_user(5, 0, 0);
    let intruder = h.trial_user(5, 0, 0);
    let target = h.pending_generation(owner);

    let response = app
        .post("/api/v1/generations/model")
        .bearer(&app.token_for(intruder))
        .json(&model_body(
            target,
            json!([{ "type": "garment", "sourceData": "https://cdn.example.com/dress.png" }]),
        ))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await;
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_denials_are_forbidden_with_distinct_codes() {
    let h = Harness::new();
    let app = h.test_app();
    let user = h.paid_user(tryon_backend_core::models::Plan::Starter, 0);
    let target = h.pending_generation(user);

    let response = app
        .post("/api/v1/generations/model")
        .bearer(&app.token_for(user))
        .json(&model_body(
            target,
            json!([{ "type": "garment", "sourceData": "https://cdn.example.com/dress.png" }]),
        ))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await;
    assert_eq!(body["code"], "INSUFFICIENT_CREDITS");
    assert!(body["error"].as_str().unwrap().contains("credits"));

    h.rate_limiter.preload(user, "generate-model", 5);
    let response = app
        .post("/api/v1/generations/model")
        .bearer(&app.token_for(user))
        .json(&model_body(
            target,
            json!([{ "type": "garment", "sourceData": "https://cdn.example.com/dress.png" }]),
        ))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await;
    assert_eq!(body["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_large_inline_image_reaches_staging() {
    let h = Harness::new();
    let app = h.test_app();
    let user = h.trial_user(5, 1, 0);
    let target = h.pending_generation(user);
    h.provider
        .push_status(Ok(tryon_backend_core::services::TaskStatus::succeeded(RESULT_URL)));

    // 3 MiB photo, about 4 MiB once base64-encoded
    let mut bytes = PNG_HEADER.to_vec();
    bytes.resize(3 * 1024 * 1024, 0x5a);
    let source = format!("data:image/png;base64,{}", BASE64.encode(&bytes));

    let response = app
        .post("/api/v1/generations/model")
        .bearer(&app.token_for(user))
        .json(&model_body(
            target,
            json!([{ "type": "garment", "sourceData": source }]),
        ))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await;
    assert_eq!(body["status"], "completed");
    assert_eq!(h.storage.uploads().len(), 1);
    assert_eq!(h.balances(user), (4, 1, 0));
}

#[tokio::test]
async fn test_processing_then_status_poll() {
    let h = Harness::new();
    let app = h.test_app();
    let user = h.trial_user(0, 1, 0);
    let target = h.pending_generation(user);
    let token = app.token_for(user);

    let mut body = model_body(
        target,
        json!([{ "type": "garment", "sourceData": "https://cdn.example.com/dress.png" }]),
    );
    body["qualityTier"] = json!(QualityTier::Pro);

    let response = app
        .post("/api/v1/generations/model")
        .bearer(&token)
        .json(&body)
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await;
    assert_eq!(body["status"], "processing");
    assert_eq!(body["taskId"], "task-1");
    assert_eq!(h.status_of(target), GenerationStatus::Processing);

    h.provider
        .push_status(Ok(tryon_backend_core::services::TaskStatus::succeeded(RESULT_URL)));
    let response = app
        .get(&format!("/api/v1/generations/{}/status?taskId=task-1", target))
        .bearer(&token)
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["imageUrl"], RESULT_URL);
    assert_eq!(h.status_of(target), GenerationStatus::Completed);
    assert_eq!(h.balances(user), (0, 0, 0));
}

#[tokio::test]
async fn test_status_without_task_id_is_bad_request() {
    let h = Harness::new();
    let app = h.test_app();
    let user = h.trial_user(0, 0, 0);
    let target = h.generations.insert_processing(user, "task-1");

    let response = app
        .get(&format!("/api/v1/generations/{}/status", target))
        .bearer(&app.token_for(user))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_without_pools_reports_not_configured() {
    let h = Harness::new();
    let app = h.test_app();

    let response = app.get("/api/v1/health").send().await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["redis"]["status"], "not_configured");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let h = Harness::new();
    let app = h.test_app();

    let response = app.get("/api/v1/docs/openapi.json").send().await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await;
    assert!(body["paths"]["/api/v1/generations/model"]["post"].is_object());
}
