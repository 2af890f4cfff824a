//! Case CRUD, authoring helpers and cross-cutting middleware.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use urocase_storage::ObjectStore;

use crate::support::{
    body_bytes, body_json, get, json_request, test_app, TestApp, TestAppBuilder, CHAT_REPLY,
    EXPLANATION, TITLE,
};

fn new_case(title: &str) -> Value {
    json!({
        "title": title,
        "imageUrl": "data:image/jpeg;base64,aGVsbG8=",
        "explanation": EXPLANATION,
        "category": "Stones",
    })
}

async fn create(app: &TestApp, body: Value) -> Value {
    let response = app.send(json_request("POST", "/api/cases", body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

/// Test health check endpoint
#[tokio::test]
async fn test_health_check() {
    let app = test_app();

    let response = app.send(get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

/// Test metrics route is absent without a recorder
#[tokio::test]
async fn test_metrics_disabled() {
    let app = test_app();
    let response = app.send(get("/metrics")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Test 404 for unknown routes
#[tokio::test]
async fn test_not_found() {
    let app = test_app();
    let response = app.send(get("/api/nonexistent")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Test case numbering, listing order and partial updates
#[tokio::test]
async fn test_case_crud_flow() {
    let app = test_app();

    let first = create(&app, new_case("Left UPJ Stone")).await;
    let second = create(&app, new_case("Bosniak IV Cyst")).await;
    assert_eq!(first["caseNumber"], 1);
    assert_eq!(second["caseNumber"], 2);
    assert_eq!(first["mediaType"], "image");

    let listed = body_json(app.send(get("/api/cases")).await).await;
    let numbers: Vec<u64> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["caseNumber"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![2, 1]);

    let id = first["id"].as_str().unwrap();
    let response = app
        .send(json_request(
            "PATCH",
            &format!("/api/cases/{}", id),
            json!({ "title": "Obstructing Left UPJ Stone" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["title"], "Obstructing Left UPJ Stone");
    assert_eq!(updated["explanation"], EXPLANATION);

    let response = app
        .send(json_request("PATCH", &format!("/api/cases/{}", id), json!({})))
        .await;
    assert_eq!(body_json(response).await["title"], "Obstructing Left UPJ Stone");

    let response = app.send(get("/api/cases/does-not-exist")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "not_found");
}

/// Test payload validation
#[tokio::test]
async fn test_create_case_validation() {
    let app = test_app();

    let response = app
        .send(json_request("POST", "/api/cases", new_case("")))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "validation_error");
}

/// Test delete renumbers, drops messages and removes the stored video
#[tokio::test]
async fn test_delete_case_cleans_up() {
    let app = test_app();
    let key = "videos/00000000-0000-0000-0000-000000000001.mp4";
    app.objects
        .put(key, b"clip".to_vec(), "video/mp4")
        .await
        .unwrap();

    let mut with_video = new_case("Renal Trauma");
    with_video["videoUrl"] = json!(key);
    with_video["mediaType"] = json!("video");
    let first = create(&app, with_video).await;
    let second = create(&app, new_case("Ureterocele")).await;

    let first_id = first["id"].as_str().unwrap();
    let response = app
        .send(json_request(
            "POST",
            &format!("/api/cases/{}/messages", first_id),
            json!({ "role": "user", "content": "Where is the laceration?" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/cases/{}", first_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    assert!(!app.objects.exists(key).await.unwrap());

    let remaining = body_json(
        app.send(get(&format!("/api/cases/{}", second["id"].as_str().unwrap())))
            .await,
    )
    .await;
    assert_eq!(remaining["caseNumber"], 1);

    let response = app
        .send(get(&format!("/api/cases/{}/messages", first_id)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Test chat messages are listed oldest first
#[tokio::test]
async fn test_case_messages() {
    let app = test_app();
    let case = create(&app, new_case("Emphysematous Pyelonephritis")).await;
    let uri = format!("/api/cases/{}/messages", case["id"].as_str().unwrap());

    for (role, content) in [("user", "Is there gas?"), ("ai", "Yes, in the parenchyma.")] {
        let response = app
            .send(json_request("POST", &uri, json!({ "role": role, "content": content })))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let messages = body_json(app.send(get(&uri)).await).await;
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["content"], "Yes, in the parenchyma.");
}

/// Test image explanation returns a titled, categorized draft
#[tokio::test]
async fn test_analyze_image() {
    let app = test_app();

    let response = app
        .send(json_request(
            "POST",
            "/api/ai/analyze",
            json!({
                "imageBase64": "data:image/png;base64,aGVsbG8=",
                "attendingPrompt": "Note the UPJ",
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["explanation"], EXPLANATION);
    assert_eq!(body["title"], TITLE);
    assert_eq!(body["category"], "Stones");
}

/// Test blank refinement feedback is rejected before inference
#[tokio::test]
async fn test_refine_requires_feedback() {
    let app = test_app();

    let response = app
        .send(json_request(
            "POST",
            "/api/ai/refine",
            json!({
                "imageBase64": "aGVsbG8=",
                "currentExplanation": EXPLANATION,
                "feedback": "   ",
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.backend.image_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

/// Test follow-up chat
#[tokio::test]
async fn test_chat() {
    let app = test_app();

    let response = app
        .send(json_request(
            "POST",
            "/api/ai/chat",
            json!({
                "explanation": EXPLANATION,
                "chatHistory": [
                    { "role": "user", "content": "Which side?" },
                    { "role": "ai", "content": "Left." },
                ],
                "userMessage": "How big is it?",
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["response"], CHAT_REPLY);
}

/// Test security headers and request id propagation
#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = test_app();

    let response = app
        .send(
            Request::builder()
                .uri("/health")
                .header("X-Request-ID", "trace-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["cross-origin-resource-policy"], "same-origin");
    assert_eq!(headers["x-request-id"], "trace-123");

    let response = app.send(get("/health")).await;
    assert!(!response.headers()["x-request-id"].is_empty());
}

/// Test per-IP rate limiting on API routes
#[tokio::test]
async fn test_rate_limit() {
    let app = TestAppBuilder::new().rate_limit_rps(1).build();

    let request = |ip: &str| {
        Request::builder()
            .uri("/api/cases")
            .header("X-Forwarded-For", ip)
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(app.send(request("203.0.113.7")).await.status(), StatusCode::OK);

    let limited = app.send(request("203.0.113.7")).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.headers()["retry-after"], "1");
    assert!(!body_bytes(limited).await.is_empty());

    assert_eq!(app.send(request("203.0.113.8")).await.status(), StatusCode::OK);
}
