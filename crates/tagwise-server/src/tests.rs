//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tagwise_core::db::Database;
use tower::ServiceExt;

const STATEMENT_CSV: &str = "Date,Description,Amount
07/15/2024,NETFLIX.COM*12345,-15.49
07/16/2024,SHELL OIL 57442 SAN JOSE,-48.20
07/20/2024,NETFLIX.COM*99881,-15.49";

fn setup_test_app() -> Router {
    setup_test_app_with_category().0
}

/// App with the default categories plus a "Streaming" category
fn setup_test_app_with_category() -> (Router, i64) {
    let db = Database::in_memory().unwrap();
    db.seed_default_categories().unwrap();
    let streaming = db.create_category("Streaming", Some("#e50914")).unwrap();
    let config = ServerConfig {
        require_auth: false,
        allowed_origins: vec![],
        ..Default::default()
    };
    let app = create_router(db, LearningConfig::default(), config).unwrap();
    (app, streaming)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn load_statement(app: &Router) -> serde_json::Value {
    let response = post_json(
        app,
        "/api/review",
        serde_json::json!({ "csv": STATEMENT_CSV }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    get_body_json(response).await
}

// ========== Category API Tests ==========

#[tokio::test]
async fn test_list_categories() {
    let app = setup_test_app();

    let response = get(&app, "/api/categories").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let categories = json.as_array().unwrap();
    assert!(categories.len() > 10);
    assert!(categories.iter().any(|c| c["name"] == "Streaming"));
}

#[tokio::test]
async fn test_create_category() {
    let app = setup_test_app();

    let response = post_json(
        &app,
        "/api/categories",
        serde_json::json!({ "name": "Pets", "color": "#ff0000" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["name"], "Pets");
    assert_eq!(json["color"], "#ff0000");
    assert!(json["id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_create_duplicate_category() {
    let app = setup_test_app();

    let response = post_json(
        &app,
        "/api/categories",
        serde_json::json!({ "name": "streaming" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_category_empty_name() {
    let app = setup_test_app();

    let response = post_json(&app, "/api/categories", serde_json::json!({ "name": "  " })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_category() {
    let (app, streaming) = setup_test_app_with_category();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/categories/{}", streaming))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);

    let json = get_body_json(get(&app, "/api/categories").await).await;
    assert!(!json
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["name"] == "Streaming"));
}

#[tokio::test]
async fn test_delete_missing_category() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/categories/99999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Suggestion API Tests ==========

#[tokio::test]
async fn test_suggest_without_patterns() {
    let app = setup_test_app();

    let response = post_json(
        &app,
        "/api/suggest",
        serde_json::json!({ "descriptions": ["NETFLIX.COM*12345", "#1234 5678"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let results = json.as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["normalized"], "NETFLIX.COM");
    assert!(results[0]["suggestion"].is_null());
    assert_eq!(results[1]["normalized"], "");
}

#[tokio::test]
async fn test_suggest_batch_too_large() {
    let app = setup_test_app();

    let descriptions = vec!["COFFEE"; MAX_SUGGEST_BATCH + 1];
    let response = post_json(
        &app,
        "/api/suggest",
        serde_json::json!({ "descriptions": descriptions }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_learned_pattern_is_suggested() {
    let (app, streaming) = setup_test_app_with_category();

    load_statement(&app).await;
    let response = post_json(
        &app,
        "/api/review/classify",
        serde_json::json!({ "category_id": streaming }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(
        &app,
        "/api/suggest",
        serde_json::json!({ "descriptions": ["netflix.com *55555"] }),
    )
    .await;
    let json = get_body_json(response).await;
    let suggestion = &json[0]["suggestion"];
    assert_eq!(suggestion["category_id"], streaming);
    assert_eq!(suggestion["pattern_text"], "NETFLIX.COM");
    assert_eq!(suggestion["match_kind"], "substring");
}

// ========== Pattern and Metrics API Tests ==========

#[tokio::test]
async fn test_patterns_and_metrics_empty() {
    let app = setup_test_app();

    let json = get_body_json(get(&app, "/api/patterns").await).await;
    assert!(json.as_array().unwrap().is_empty());

    let response = get(&app, "/api/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["total_patterns"], 0);
    assert_eq!(json["average_confidence"], 0.0);
    assert!(json["category_usage"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_patterns_filtered() {
    let (app, streaming) = setup_test_app_with_category();

    load_statement(&app).await;
    post_json(
        &app,
        "/api/review/classify",
        serde_json::json!({ "category_id": streaming }),
    )
    .await;
    post_json(
        &app,
        "/api/review/classify",
        serde_json::json!({ "category_id": 1 }),
    )
    .await;

    let json = get_body_json(get(&app, "/api/patterns").await).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let uri = format!("/api/patterns?category_id={}", streaming);
    let json = get_body_json(get(&app, &uri).await).await;
    let patterns = json.as_array().unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0]["pattern_text"], "NETFLIX.COM");
    assert_eq!(patterns[0]["frequency"], 1);

    let json = get_body_json(get(&app, "/api/patterns?min_confidence=0.9").await).await;
    assert!(json.as_array().unwrap().is_empty());

    let json = get_body_json(get(&app, "/api/metrics").await).await;
    assert_eq!(json["total_patterns"], 2);
    assert_eq!(json["active_patterns"], 2);
}

// ========== Review API Tests ==========

#[tokio::test]
async fn test_review_initially_empty() {
    let app = setup_test_app();

    let response = get(&app, "/api/review").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["session"], "completed");
    assert_eq!(json["summary"]["total"], 0);
    assert!(json["current"].is_null());

    let response = get(&app, "/api/review/current").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_json(&app, "/api/review/reject", serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_review_load_csv() {
    let app = setup_test_app();

    let json = load_statement(&app).await;
    assert_eq!(json["session"], "active");
    assert_eq!(json["summary"]["total"], 3);
    assert_eq!(json["summary"]["pending"], 3);
    assert_eq!(json["summary"]["without_suggestion"], 3);
    assert_eq!(json["current"]["normalized_text"], "NETFLIX.COM");

    let json = get_body_json(get(&app, "/api/review/candidates").await).await;
    let candidates = json.as_array().unwrap();
    assert_eq!(candidates.len(), 3);
    assert_eq!(candidates[1]["position"], 1);
    assert_eq!(candidates[1]["state"], "pending");
}

#[tokio::test]
async fn test_review_load_transactions() {
    let app = setup_test_app();

    let response = post_json(
        &app,
        "/api/review",
        serde_json::json!({
            "transactions": [{
                "external_id": "tx-1",
                "date": "2024-07-15",
                "description": "SQ *BLUE BOTTLE COFFEE",
                "amount": -6.75
            }]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(get(&app, "/api/review/current").await).await;
    assert_eq!(json["transaction"]["external_id"], "tx-1");
    assert_eq!(json["normalized_text"], "BLUE BOTTLE COFFEE");
}

#[tokio::test]
async fn test_review_load_requires_one_source() {
    let app = setup_test_app();

    let response = post_json(&app, "/api/review", serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app,
        "/api/review",
        serde_json::json!({ "csv": STATEMENT_CSV, "transactions": [] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_review_load_bad_csv() {
    let app = setup_test_app();

    let response = post_json(
        &app,
        "/api/review",
        serde_json::json!({ "csv": "Foo,Bar\n1,2" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_review_accept_without_suggestion() {
    let app = setup_test_app();
    load_statement(&app).await;

    let response = post_json(&app, "/api/review/accept", serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The candidate is still pending
    let json = get_body_json(get(&app, "/api/review").await).await;
    assert_eq!(json["summary"]["pending"], 3);
}

#[tokio::test]
async fn test_review_full_flow() {
    let (app, streaming) = setup_test_app_with_category();

    // First session: teach the engine by hand
    load_statement(&app).await;
    let response = post_json(
        &app,
        "/api/review/classify",
        serde_json::json!({ "category_id": streaming }),
    )
    .await;
    let json = get_body_json(response).await;
    assert_eq!(json["kind"], "manual");
    assert_eq!(json["state"], "rejected");
    assert_eq!(json["effects"][0]["effect"], "created");
    assert_eq!(json["session"], "active");

    // Defer the Shell row, then reject the second Netflix row
    let json = get_body_json(post_json(&app, "/api/review/defer", serde_json::json!({})).await).await;
    assert_eq!(json["current"]["position"], 2);

    let json = get_body_json(post_json(&app, "/api/review/reject", serde_json::json!({})).await).await;
    assert_eq!(json["kind"], "reject");
    assert_eq!(json["effects"][0]["effect"], "none");

    let json = get_body_json(post_json(&app, "/api/review/reject", serde_json::json!({})).await).await;
    assert_eq!(json["position"], 1);
    assert_eq!(json["session"], "completed");

    // Second session: Netflix rows now carry a suggestion
    let json = load_statement(&app).await;
    assert_eq!(json["summary"]["without_suggestion"], 1);
    assert_eq!(json["current"]["suggestion"]["category_id"], streaming);

    let response = post_json(&app, "/api/review/accept", serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["kind"], "accept");
    assert_eq!(json["state"], "accepted");
    assert_eq!(json["effects"][0]["effect"], "reinforced");
    assert_eq!(json["effects"][0]["pattern"]["frequency"], 2);

    // Every decision was logged
    let json = get_body_json(get(&app, "/api/decisions/stats").await).await;
    assert_eq!(json["total"], 4);
    assert_eq!(json["manual"], 1);
    assert_eq!(json["rejected"], 2);
    assert_eq!(json["accepted"], 1);

    let json = get_body_json(get(&app, "/api/decisions?limit=1").await).await;
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["kind"], "accept");
}

#[tokio::test]
async fn test_review_classify_rejected() {
    let (app, streaming) = setup_test_app_with_category();
    load_statement(&app).await;

    post_json(&app, "/api/review/reject", serde_json::json!({})).await;

    let response = post_json(
        &app,
        "/api/review/classify",
        serde_json::json!({ "category_id": streaming, "position": 0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["kind"], "manual");
    assert_eq!(json["effects"][0]["effect"], "created");

    // A second attempt on the same candidate is refused
    let response = post_json(
        &app,
        "/api/review/classify",
        serde_json::json!({ "category_id": streaming, "position": 0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Still-pending candidates cannot be reclassified
    let response = post_json(
        &app,
        "/api/review/classify",
        serde_json::json!({ "category_id": streaming, "position": 1 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_review_classify_unknown_category() {
    let app = setup_test_app();
    load_statement(&app).await;

    let response = post_json(
        &app,
        "/api/review/classify",
        serde_json::json!({ "category_id": 99999 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["kind"], "invalid_category");
    assert_eq!(json["effects"][0]["effect"], "none");

    // Nothing was learned and the queue moved on
    let json = get_body_json(get(&app, "/api/patterns").await).await;
    assert!(json.as_array().unwrap().is_empty());
    let json = get_body_json(get(&app, "/api/review").await).await;
    assert_eq!(json["summary"]["pending"], 2);
}

// ========== Decision Log API Tests ==========

#[tokio::test]
async fn test_decisions_empty() {
    let app = setup_test_app();

    let json = get_body_json(get(&app, "/api/decisions").await).await;
    assert!(json.as_array().unwrap().is_empty());

    let json = get_body_json(get(&app, "/api/decisions/stats").await).await;
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn test_decisions_limit_clamped() {
    let app = setup_test_app();

    let response = get(&app, "/api/decisions?limit=0").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/api/decisions?limit=999999").await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ========== Authentication Tests ==========

#[tokio::test]
async fn test_auth_required() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: true, // Auth required
        allowed_origins: vec![],
        api_keys: vec!["secret-key".to_string()],
    };
    let app = create_router(db, LearningConfig::default(), config).unwrap();

    let response = get(&app, "/api/categories").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/categories")
                .header("authorization", "Bearer wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_with_api_key() {
    let db = Database::in_memory().unwrap();
    db.seed_default_categories().unwrap();
    let config = ServerConfig {
        require_auth: true,
        allowed_origins: vec![],
        api_keys: vec!["secret-key".to_string()],
    };
    let app = create_router(db, LearningConfig::default(), config).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/categories")
                .header("authorization", "Bearer secret-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_auth_without_configured_keys() {
    let db = Database::in_memory().unwrap();
    let app = create_router(db, LearningConfig::default(), ServerConfig::default()).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/categories")
                .header("authorization", "Bearer ")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn test_validate_api_key() {
    let keys = vec!["alpha".to_string(), "bravo-2".to_string()];
    assert!(validate_api_key("alpha", &keys));
    assert!(validate_api_key("bravo-2", &keys));
    assert!(!validate_api_key("alph", &keys));
    assert!(!validate_api_key("alphaa", &keys));
    assert!(!validate_api_key("", &keys));
    assert!(!validate_api_key("alpha", &[]));
}

#[test]
fn test_parse_api_keys() {
    assert_eq!(parse_api_keys("a, b ,,c"), vec!["a", "b", "c"]);
    assert!(parse_api_keys("").is_empty());
    assert!(parse_api_keys(" , ").is_empty());
}

// ========== Security Header Tests ==========

#[tokio::test]
async fn test_security_headers() {
    let app = setup_test_app();

    let response = get(&app, "/api/categories").await;
    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("content-security-policy").is_some());
}

#[tokio::test]
async fn test_error_body_shape() {
    let app = setup_test_app();

    let response = get(&app, "/api/review/current").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = get_body_json(response).await;
    assert!(json["error"].is_string());
}
