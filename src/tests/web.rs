use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::sample::sample_documents;
use crate::tests::app::create_app;
use crate::tests::semantic::KeywordEmbedder;
use crate::web::router;

async fn call(app: &Arc<crate::app::App>, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(app.clone()).oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// handlers use block_in_place, which needs the multi-threaded runtime
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_search() {
    let (app, _, _tmp) = create_app();
    app.reindex(sample_documents()).unwrap();
    let app = Arc::new(app);

    let (status, body) = call(&app, post("/api/search", json!({"query": "diabetes", "top_k": 2}))).await;

    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(
        results[0]["document"]["identifier"],
        "diabetes-medication-adherence"
    );
    assert!(results[0]["score"].as_f64().unwrap() > 0.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_search_defaults_and_blank_query() {
    let (app, _, _tmp) = create_app();
    app.reindex(sample_documents()).unwrap();
    let app = Arc::new(app);

    let (status, body) = call(&app, post("/api/search", json!({"query": "covid health adults"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), app.config().default_top_k);

    let (status, body) = call(&app, post("/api/search", json!({"query": "  "}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_search_model_failure_is_unavailable() {
    let (app, model, _tmp) = create_app();
    app.reindex(sample_documents()).unwrap();
    model.set_failing(true);
    let app = Arc::new(app);

    let (status, body) = call(&app, post("/api/search", json!({"query": "diabetes"}))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("model unavailable"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_status_and_documents() {
    let (app, _, _tmp) = create_app();
    app.reindex(sample_documents()).unwrap();
    let app = Arc::new(app);

    let (status, body) = call(&app, get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documents"], sample_documents().len());
    assert_eq!(body["model"], KeywordEmbedder::NAME);
    assert_eq!(body["index"], "current");

    let (status, body) = call(&app, get("/api/documents")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), sample_documents().len());
    assert_eq!(body[0]["identifier"], "covid-vaccine-older-adults");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reindex_with_documents() {
    let (app, _, _tmp) = create_app();
    let app = Arc::new(app);

    let (status, body) = call(
        &app,
        post(
            "/api/reindex",
            json!({"documents": [{"title": "Asthma in children", "summary": "asthma"}]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documents"], 1);
    assert!(app.config().index_path().exists());

    let (_, body) = call(&app, post("/api/search", json!({"query": "asthma"}))).await;
    assert_eq!(body[0]["document"]["title"], "Asthma in children");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reindex_from_documents_file() {
    let (app, _, _tmp) = create_app();
    crate::documents::save_documents(&app.config().documents_path(), &sample_documents()).unwrap();
    let app = Arc::new(app);

    let (status, body) = call(&app, post("/api/reindex", json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documents"], sample_documents().len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reindex_without_documents_file() {
    let (app, _, _tmp) = create_app();
    let app = Arc::new(app);

    let (status, body) = call(&app, post("/api/reindex", json!({}))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_malformed_search_request() {
    let (app, _, _tmp) = create_app();
    let app = Arc::new(app);

    let (status, _) = call(&app, post("/api/search", json!({"top_k": 3}))).await;

    assert!(status.is_client_error());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[cfg(unix)]
async fn test_reindex_while_another_writer_holds_the_lock() {
    let (app, _, tmp) = create_app();
    let _indexer = crate::lock::FileLock::try_acquire(tmp.path()).unwrap();
    let app = Arc::new(app);

    let (status, body) = call(&app, post("/api/reindex", json!({"documents": []}))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("projfind.lock"));
}
