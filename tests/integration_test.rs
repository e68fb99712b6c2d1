//! Integration tests for michiru
//!
//! Runs the importer against the in-memory engine and exercises the HTTP
//! API on top of the imported data.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use michiru::{
    config::Config,
    engine::MemoryEngine,
    http::{create_router, AppState, HttpServer},
    import::{DumpInput, DumpParser, ImportPipeline, IntervalGate, PipelineError},
    shutdown::Shutdown,
};
use serde_json::Value;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use tower::ServiceExt;

/// A dump with `count` well-formed records titled "Show N" plus one bad record
fn dump_xml(count: u64) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!-- Created: Wed Jan 1 00:00:00 2020 (9999 anime, 55555 titles) -->\n\
         <animetitles>\n",
    );
    for aid in 1..=count {
        xml.push_str(&format!(
            "<anime aid=\"{aid}\">\
             <title xml:lang=\"x-jat\" type=\"main\">Show {aid}</title>\
             <title xml:lang=\"en\" type=\"official\">The Show {aid}</title>\
             <title xml:lang=\"en\" type=\"syn\">Alias A{aid}</title>\
             <title xml:lang=\"en\" type=\"syn\">Alias B{aid}</title>\
             </anime>\n"
        ));
    }
    xml.push_str("<anime><title type=\"main\">No aid</title></anime>\n");
    xml.push_str("</animetitles>\n");
    xml
}

fn write_dump(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.engine.task_poll_interval_ms = 1;
    config
}

async fn import(engine: &Arc<MemoryEngine>, count: u64) -> Result<(), PipelineError> {
    let file = write_dump(dump_xml(count).as_bytes());
    ImportPipeline::new(engine.clone(), &test_config(), Shutdown::never())
        .with_parser(
            DumpParser::new().with_retrieved_at(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
        )
        .run(&DumpInput::File(file.path().to_path_buf()))
        .await
        .map(|_| ())
}

fn router(engine: &Arc<MemoryEngine>) -> Router {
    create_router(AppState::new(engine.clone(), &test_config().engine), None)
}

async fn get(router: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

// ============================================================================
// Import
// ============================================================================

#[tokio::test]
async fn test_import_from_gzipped_file() {
    let engine = Arc::new(MemoryEngine::new());

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(dump_xml(3).as_bytes()).unwrap();
    let file = write_dump(&encoder.finish().unwrap());

    let stats = ImportPipeline::new(engine.clone(), &test_config(), Shutdown::never())
        .run(&DumpInput::File(file.path().to_path_buf()))
        .await
        .unwrap();

    assert_eq!(stats.documents_imported, 3);
    assert_eq!(stats.records_skipped, 1);
    assert_eq!(stats.bytes_processed, dump_xml(3).len() as u64);
    assert_eq!(engine.document_count("titles"), 3);
}

#[tokio::test]
async fn test_second_import_within_interval_is_refused() {
    let engine = Arc::new(MemoryEngine::new());
    let file = write_dump(dump_xml(2).as_bytes());
    let pipeline = ImportPipeline::new(engine.clone(), &test_config(), Shutdown::never());
    let input = DumpInput::File(file.path().to_path_buf());

    pipeline.run(&input).await.unwrap();
    let calls_after_first = engine.calls().len();

    let err = pipeline.run(&input).await.unwrap_err();
    assert!(matches!(err, PipelineError::TooSoon(_)));
    assert!(!engine.calls()[calls_after_first..]
        .iter()
        .any(|c| c.starts_with("delete_all_documents") || c.starts_with("add_documents")));
}

#[tokio::test]
async fn test_reimport_replaces_documents() {
    let engine = Arc::new(MemoryEngine::new());
    import(&engine, 5).await.unwrap();
    assert_eq!(engine.document_count("titles"), 5);

    let file = write_dump(dump_xml(2).as_bytes());
    ImportPipeline::new(engine.clone(), &test_config(), Shutdown::never())
        .with_gate(IntervalGate::new(Duration::ZERO))
        .run(&DumpInput::File(file.path().to_path_buf()))
        .await
        .unwrap();
    assert_eq!(engine.document_count("titles"), 2);
    assert_eq!(engine.document_count("index_metadata"), 1);
}

// ============================================================================
// Search API
// ============================================================================

#[tokio::test]
async fn test_search_returns_payload_and_paging() {
    let engine = Arc::new(MemoryEngine::new());
    import(&engine, 25).await.unwrap();

    let (status, headers, body) = get(router(&engine), "/search?query=show&limit=10&offset=10").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let json: Value = serde_json::from_slice(&body).unwrap();
    let payload = json["payload"].as_array().unwrap();
    assert_eq!(payload.len(), 10);
    assert_eq!(payload[0]["aid"], 11);
    assert_eq!(payload[0]["mainTitle"], "Show 11");
    assert_eq!(
        payload[0]["synonymousTitles"]["en"],
        serde_json::json!(["Alias A11", "Alias B11"])
    );
    assert!(payload[0]["_formatted"].is_object());

    assert_eq!(json["paging"]["count"], 25);
    assert_eq!(
        json["paging"]["next"],
        "/search?limit=10&offset=20&query=show"
    );
    assert_eq!(json["paging"]["prev"], "/search?limit=10&offset=0&query=show");
}

#[tokio::test]
async fn test_search_without_matches() {
    let engine = Arc::new(MemoryEngine::new());
    import(&engine, 3).await.unwrap();

    let (status, _, body) = get(router(&engine), "/search?query=nothing+here").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, serde_json::json!({"payload": [], "paging": {"count": 0}}));
}

#[tokio::test]
async fn test_search_rejects_bad_parameters() {
    let engine = Arc::new(MemoryEngine::new());
    import(&engine, 1).await.unwrap();

    for uri in [
        "/search",
        "/search?query=",
        "/search?query=a&limit=abc",
        "/search?query=a&limit=0",
        "/search?query=a&limit=51",
        "/search?query=a&offset=-1",
        "/search?query=a&offset=x",
    ] {
        let (status, headers, body) = get(router(&engine), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert!(!body.is_empty());
    }
}

#[tokio::test]
async fn test_search_engine_failure_is_500() {
    let engine = Arc::new(MemoryEngine::new());
    import(&engine, 1).await.unwrap();
    engine.fail_reads(503, "engine down");

    let (status, _, body) = get(router(&engine), "/search?query=show").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(String::from_utf8(body).unwrap().contains("engine down"));
}

// ============================================================================
// Metadata API
// ============================================================================

#[tokio::test]
async fn test_metadata_before_import_is_404() {
    let engine = Arc::new(MemoryEngine::new());
    let (status, _, _) = get(router(&engine), "/metadata").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metadata_after_import() {
    let engine = Arc::new(MemoryEngine::new());
    import(&engine, 2).await.unwrap();

    let (status, headers, body) = get(router(&engine), "/metadata").await;
    assert_eq!(status, StatusCode::OK);

    // Retrieved in 2020, long expired
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=0");
    assert_eq!(headers[header::EXPIRES], "Thu, 02 Jan 2020 00:00:00 GMT");
    assert_eq!(headers[header::LAST_MODIFIED], "Wed, 01 Jan 2020 00:00:00 GMT");

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["id"], "titles");
    assert_eq!(json["dumpEntries"], 9999);
    assert_eq!(json["dumpTitles"], 55555);
    assert_eq!(json["retrievedAt"], "2020-01-01T00:00:00Z");
}

#[tokio::test]
async fn test_metadata_engine_failure_is_500() {
    let engine = Arc::new(MemoryEngine::new());
    import(&engine, 1).await.unwrap();
    engine.fail_reads(500, "boom");

    let (status, _, _) = get(router(&engine), "/metadata").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================================
// Server layers
// ============================================================================

#[tokio::test]
async fn test_web_ui_fallback_and_cors() {
    let engine = Arc::new(MemoryEngine::new());
    let web_ui = TempDir::new().unwrap();
    std::fs::write(web_ui.path().join("index.html"), "<h1>michiru</h1>").unwrap();

    let mut config = test_config();
    config.server.web_ui_path = web_ui.path().to_path_buf();
    config.server.cors_enabled = true;
    let app = HttpServer::new(
        config.server.clone(),
        AppState::new(engine.clone(), &config.engine),
    )
    .app();

    let (status, _, body) = get(app.clone(), "/index.html").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>michiru</h1>");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metadata")
                .header(header::ORIGIN, "https://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_missing_web_ui_is_not_served() {
    let engine = Arc::new(MemoryEngine::new());
    let state = AppState::new(engine.clone(), &test_config().engine);
    let app = create_router(state, Some(std::path::Path::new("/nonexistent/michiru-ui")));

    let (status, _, _) = get(app, "/index.html").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
