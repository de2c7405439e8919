use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sheet_insights::{config::Config, routes, AppState};
use tower::ServiceExt;

const BOUNDARY: &str = "sheet-insights-test-boundary";

fn app_with(config: Config) -> Router {
    let state = AppState::new(config).expect("app state");
    routes::router(Arc::new(state))
}

fn app() -> Router {
    app_with(Config::default())
}

fn upload_request(uri: &str, filename: &str, contents: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         {c}\r\n\
         --{b}--\r\n",
        b = BOUNDARY,
        f = filename,
        c = contents
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .expect("build upload request")
}

fn query_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build query request")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("read body").to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

#[tokio::test]
async fn root_and_health_respond() {
    let app = app();

    let (status, body) = send(&app, Request::get("/").body(Body::empty()).expect("request")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Sheet insights API is running"}));

    let (status, body) = send(&app, Request::get("/health").body(Body::empty()).expect("request")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".into()));
}

#[tokio::test]
async fn upload_query_and_describe_a_file() {
    let app = app();
    let csv = "Region,Amount\nA,10\nB,20\nA,30\n";

    let (status, upload) = send(&app, upload_request("/api/upload?user_id=u1", "sales.csv", csv)).await;
    assert_eq!(status, StatusCode::OK, "upload failed: {}", upload);
    assert_eq!(upload["filename"], "sales.csv");
    assert_eq!(upload["row_count"], 3);
    assert_eq!(upload["columns"], json!(["region", "amount"]));
    let file_id = upload["file_id"].as_str().expect("file id").to_string();

    let (status, answer) = send(
        &app,
        query_request(json!({"file_id": file_id, "query": "compare regions", "conversation_id": "c1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        answer["visualization"],
        json!({"type": "bar", "data": [{"label": "A", "value": 20.0}, {"label": "B", "value": 20.0}]})
    );
    assert_eq!(answer["query_metadata"]["query_type"], "comparison");

    let (status, info) = send(
        &app,
        Request::get(format!("/api/files/{}", file_id)).body(Body::empty()).expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["user_id"], "u1");
    assert_eq!(info["original_filename"], "sales.csv");
    assert_eq!(info["column_mapping"], json!({"region": "text", "amount": "numeric"}));
    assert_eq!(info["data_preview"][0], json!({"region": "A", "amount": 10.0}));
}

#[tokio::test]
async fn upload_requires_user_id() {
    let (status, body) = send(&app(), upload_request("/api/upload", "sales.csv", "a\n1\n")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("error").contains("User ID is required"));
}

#[tokio::test]
async fn upload_rejects_unknown_extension() {
    let (status, body) = send(&app(), upload_request("/api/upload?user_id=u1", "notes.txt", "a\n1\n")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("error").contains("Unsupported file format"));
}

#[tokio::test]
async fn upload_over_the_size_limit_is_rejected() {
    let app = app_with(Config {
        max_file_size: 16,
        ..Config::default()
    });
    let contents = "value\n".to_string() + &"12345\n".repeat(10);

    let (status, _) = send(&app, upload_request("/api/upload?user_id=u1", "big.csv", &contents)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn unknown_file_ids_are_not_found() {
    let app = app();

    let (status, body) = send(&app, query_request(json!({"file_id": "nope", "query": "summary"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "File data not found"}));

    let (status, body) = send(&app, Request::get("/api/files/nope").body(Body::empty()).expect("request")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "File not found"}));
}
