//! HTTP tests for the import endpoints.
//!
//! The router is built over the in-memory store and driven with
//! `tower::ServiceExt::oneshot`, so no database or TCP port is needed.

mod common;

use std::path::Path;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value as JsonValue;
use tower::ServiceExt;

use emr_server::config::Config;

use common::{MemoryStore, bundle, encounter, patient};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const TEST_API_KEY: &str = "test-secret-key";

/// Build the app router with test configuration.
fn test_app(store: MemoryStore, import_dir: &Path) -> Router {
    let config = Config {
        database_url: String::new(), // unused, the store is in memory
        bind_address: "0.0.0.0:0".to_string(),
        api_key: Some(TEST_API_KEY.to_string()),
        cors_origins: vec!["*".to_string()],
        import_dir: import_dir.to_path_buf(),
        default_doctor_id: 1,
        max_bundle_bytes: 1024 * 1024,
    };
    emr_server::build_app(store, &config)
}

/// Send a request to the app and return (status, body as JSON).
async fn request(app: &Router, req: Request<Body>) -> (StatusCode, JsonValue) {
    let response = app.clone().oneshot(req).await.expect("Request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();

    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };

    (status, body)
}

/// Build a POST request with a raw body and the admin key.
fn post(uri: &str, body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/fhir+json")
        .header("X-API-Key", TEST_API_KEY)
        .body(Body::from(body.into()))
        .unwrap()
}

fn jane_bundle() -> String {
    bundle(vec![
        patient("p1", "Jane", "Doe", "jane@example.org"),
        encounter("Patient/p1", "2023-04-01T09:15:00", "finished"),
    ])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(MemoryStore::new(), dir.path());

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = request(&app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_health_store_down() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(MemoryStore::unavailable(), dir.path());

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = request(&app, req).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn test_auth() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(MemoryStore::new(), dir.path());

    // No API key → 401
    let req = Request::builder()
        .method("POST")
        .uri("/fhir/import")
        .body(Body::from(jane_bundle()))
        .unwrap();
    let (status, body) = request(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["resourceType"], "OperationOutcome");

    // Wrong API key → 401
    let req = Request::builder()
        .method("POST")
        .uri("/fhir/import")
        .header("X-API-Key", "wrong-key")
        .body(Body::from(jane_bundle()))
        .unwrap();
    let (status, _) = request(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Correct API key → 200
    let (status, _) = request(&app, post("/fhir/import", jane_bundle())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_import_body() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let app = test_app(store.clone(), dir.path());

    let (status, body) = request(&app, post("/fhir/import", jane_bundle())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["patients"], 1);
    assert_eq!(body["stats"]["appointments"], 1);
    assert_eq!(store.tables().patients.len(), 1);
}

#[tokio::test]
async fn test_import_rejects_bad_bundles() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let app = test_app(store.clone(), dir.path());

    let (status, body) = request(&app, post("/fhir/import", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["issue"][0]["code"], "invalid");

    let (status, body) = request(&app, post("/fhir/import", "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["issue"][0]["code"], "structure");

    assert_eq!(store.begun(), 0);
}

#[tokio::test]
async fn test_import_failure_reports_cause() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::failing_on_email("jane@example.org");
    let app = test_app(store.clone(), dir.path());

    let (status, body) = request(&app, post("/fhir/import", jane_bundle())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["resourceType"], "OperationOutcome");
    assert_eq!(body["issue"][0]["code"], "exception");
    let diagnostics = body["issue"][0]["diagnostics"].as_str().unwrap();
    assert!(diagnostics.contains("jane@example.org"));
    assert_eq!(store.rolled_back(), 1);
}

#[tokio::test]
async fn test_import_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("jane.json"), jane_bundle()).unwrap();
    let store = MemoryStore::new();
    let app = test_app(store.clone(), dir.path());

    let (status, body) = request(&app, post("/fhir/import/jane.json", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "FHIR data from jane.json imported successfully"
    );
    assert_eq!(store.tables().appointments.len(), 1);

    // Missing file → 404
    let (status, body) = request(&app, post("/fhir/import/absent.json", "")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["issue"][0]["code"], "not-found");

    // Path traversal → 400
    let (status, _) = request(&app, post("/fhir/import/..%2Fjane.json", "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_all() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("1.json"), jane_bundle()).unwrap();
    std::fs::write(dir.path().join("2.json"), "{}").unwrap();
    std::fs::write(
        dir.path().join("3.json"),
        bundle(vec![patient("p2", "John", "Roe", "john@example.org")]),
    )
    .unwrap();
    let store = MemoryStore::new();
    let app = test_app(store.clone(), dir.path());

    let (status, body) = request(&app, post("/fhir/import-all", "")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "FHIR data import complete");
    assert_eq!(body["summary"]["total"], 3);
    assert_eq!(body["summary"]["imported"], 2);
    assert_eq!(body["summary"]["failed"], 1);
    assert_eq!(body["summary"]["files"][1]["file"], "2.json");
    assert_eq!(store.tables().patients.len(), 2);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(MemoryStore::new(), dir.path());

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .header("X-Request-ID", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();

    assert_eq!(response.headers()["X-Request-ID"], "req-123");
}

#[tokio::test]
async fn test_import_carries_request_id() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("jane.json"), jane_bundle()).unwrap();
    let app = test_app(MemoryStore::new(), dir.path());

    for uri in ["/fhir/import", "/fhir/import/jane.json", "/fhir/import-all"] {
        let body = if uri == "/fhir/import" { jane_bundle() } else { String::new() };
        let mut req = post(uri, body);
        req.headers_mut()
            .insert("X-Request-ID", "import-42".parse().unwrap());

        let response = app.clone().oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert_eq!(response.headers()["X-Request-ID"], "import-42");
    }
}
