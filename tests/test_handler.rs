//! Integration tests for the HTTP handler
//!
//! Requests are dispatched straight to `MatrixHandler::handle` against a
//! model folder built in a temporary directory.

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use useeio_matrix::{
    encode_matrix, CacheMetrics, FileStore, Matrix, MatrixHandler, Model, ModelRegistry,
};

struct Fixture {
    _dir: TempDir,
    handler: MatrixHandler,
    metrics: Arc<CacheMetrics>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let matrix = Matrix::from_rows(vec![
        vec![1.0, 2.0, 3.0, 4.0],
        vec![5.0, 6.0, 7.0, 8.0],
        vec![9.0, 10.0, 11.0, 12.0],
    ])
    .unwrap();
    std::fs::write(dir.path().join("A.bin"), encode_matrix(&matrix).unwrap()).unwrap();
    std::fs::write(dir.path().join("B.bin"), [1u8, 2, 3]).unwrap();
    std::fs::write(dir.path().join("B_dqi.csv"), "\"(1,2)\",3,4\n5,6\n").unwrap();

    let metrics = Arc::new(CacheMetrics::new());
    let model = Model::new("test", dir.path(), Arc::new(FileStore), Arc::clone(&metrics))
        .with_name("Test model")
        .with_description(Some("fixture".to_string()));
    let registry = Arc::new(ModelRegistry::with_models(vec![model]));

    Fixture {
        _dir: dir,
        handler: MatrixHandler::new(registry, Arc::clone(&metrics)),
        metrics,
    }
}

async fn get(handler: &MatrixHandler, uri: &str) -> (StatusCode, String) {
    let req = Request::get(uri).body(()).unwrap();
    let response: Response<Full<Bytes>> = handler.handle(req).await;
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn get_json(handler: &MatrixHandler, uri: &str) -> Value {
    let (status, body) = get(handler, uri).await;
    assert_eq!(status, StatusCode::OK, "GET {} failed: {}", uri, body);
    serde_json::from_str(&body).unwrap()
}

#[tokio::test]
async fn test_full_matrix() {
    let f = fixture();
    let body = get_json(&f.handler, "/api/test/matrix/A").await;
    assert_eq!(
        body,
        json!([[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0], [9.0, 10.0, 11.0, 12.0]])
    );
}

#[tokio::test]
async fn test_row_and_column() {
    let f = fixture();
    assert_eq!(
        get_json(&f.handler, "/api/test/matrix/A?row=1").await,
        json!([5.0, 6.0, 7.0, 8.0])
    );
    assert_eq!(
        get_json(&f.handler, "/api/test/matrix/A?col=2").await,
        json!([3.0, 7.0, 11.0])
    );
    assert_eq!(
        get_json(&f.handler, "/api/test/matrix/A?row=1&col=2").await,
        json!([3.0, 7.0, 11.0])
    );
}

#[tokio::test]
async fn test_percent_encoded_selectors() {
    let f = fixture();
    assert_eq!(
        get_json(&f.handler, "/api/test/matrix/A?c%6Fl=2").await,
        json!([3.0, 7.0, 11.0])
    );
    assert_eq!(
        get_json(&f.handler, "/api/test/matrix/A?row=%32").await,
        json!([9.0, 10.0, 11.0, 12.0])
    );
}

#[tokio::test]
async fn test_dqi_grid() {
    let f = fixture();
    assert_eq!(
        get_json(&f.handler, "/api/test/matrix/B_dqi").await,
        json!([["(1,2)", "3", "4"], ["5", "6"]])
    );
    assert_eq!(
        get_json(&f.handler, "/api/test/matrix/B_dqi?col=0").await,
        json!(["(1,2)", "5"])
    );

    let (status, _) = get(&f.handler, "/api/test/matrix/B_dqi?col=2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bad_requests() {
    let f = fixture();
    for uri in [
        "/api/test/matrix/A?row=3",
        "/api/test/matrix/A?col=4",
        "/api/test/matrix/A?row=abc",
        "/api/test/matrix/A?col=-1",
    ] {
        let (status, _) = get(&f.handler, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "GET {}", uri);
    }
    // Index validation happens before any file is decoded
    assert_eq!(f.metrics.get_stats().total_loads(), 1);
}

#[tokio::test]
async fn test_not_found() {
    let f = fixture();
    for uri in [
        "/api/test/matrix/Z",
        "/api/test/matrix/A_dqi",
        "/api/none/matrix/A",
        "/api/test/sectors",
        "/",
    ] {
        let (status, _) = get(&f.handler, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "GET {}", uri);
    }
    assert_eq!(f.metrics.get_stats().total_loads(), 0);
}

#[tokio::test]
async fn test_load_failures_are_server_errors() {
    let f = fixture();

    // Malformed file
    let (status, body) = get(&f.handler, "/api/test/matrix/B").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Failed to load matrix B");

    // Missing file
    let (status, body) = get(&f.handler, "/api/test/matrix/L").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Failed to load matrix L");

    let stats = f.metrics.get_stats();
    assert_eq!(stats.server_errors, 2);
    assert_eq!(stats.load_failures, 2);
}

#[tokio::test]
async fn test_repeated_requests_hit_cache() {
    let f = fixture();
    for _ in 0..5 {
        get_json(&f.handler, "/api/test/matrix/A?row=0").await;
    }

    let stats = f.metrics.get_stats();
    assert_eq!(stats.matrix_loads, 1);
    assert_eq!(stats.cache_hits, 4);
    assert_eq!(stats.requests, 5);
}

#[tokio::test]
async fn test_model_list() {
    let f = fixture();
    assert_eq!(
        get_json(&f.handler, "/api/models").await,
        json!([{"id": "test", "name": "Test model", "description": "fixture"}])
    );
}
