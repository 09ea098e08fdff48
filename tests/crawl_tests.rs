//! End-to-end crawl tests
//!
//! Each test runs the full engine against a wiremock HTTP server with an
//! in-memory frontier store and a filesystem sink in a temp directory, then
//! asserts on frontier state, metrics, and the documents that reached the
//! sink.

use driftnet::config::CrawlerConfig;
use driftnet::engine::Engine;
use driftnet::frontier::MemoryStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(output_dir: &Path, seeds: Vec<String>) -> CrawlerConfig {
    CrawlerConfig {
        workers: 2,
        max_depth: 0,
        max_pages: 10,
        request_timeout: 10,
        default_delay: 0.0,
        seed_urls: seeds,
        metrics_interval: 1,
        idle_shutdown_threshold: 2,
        local_output_dir: output_dir.to_string_lossy().to_string(),
        job_name: "test".to_string(),
        ..CrawlerConfig::default()
    }
}

async fn engine_with_memory_store(config: CrawlerConfig) -> Arc<Engine> {
    Engine::with_store(config, Arc::new(MemoryStore::new()))
        .await
        .expect("engine should build")
}

async fn run_to_completion(engine: &Arc<Engine>) {
    tokio::time::timeout(Duration::from_secs(30), Arc::clone(engine).run())
        .await
        .expect("crawl should finish before the timeout")
        .expect("crawl should not error");
}

/// Reads every document JSON the file sink wrote
fn saved_documents(output_dir: &Path) -> Vec<serde_json::Value> {
    let job_dir = output_dir.join("documents").join("test");
    let Ok(entries) = std::fs::read_dir(&job_dir) else {
        return Vec::new();
    };
    let mut documents = Vec::new();
    for entry in entries.flatten() {
        let content = std::fs::read_to_string(entry.path()).expect("document readable");
        documents.push(serde_json::from_str(&content).expect("document is valid JSON"));
    }
    documents
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

fn html_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

#[tokio::test]
async fn seed_only_crawl_single_domain() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(format!(
            r#"<html><head><title>Home</title></head><body>
                <a href="{base}/p1">1</a>
                <a href="{base}/p2">2</a>
                <a href="{base}/p3">3</a>
                <a href="{base}/p4">4</a>
                <a href="{base}/p5">5</a>
            </body></html>"#
        )))
        .expect(1)
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let config = test_config(output.path(), vec![format!("{}/", base)]);
    let engine = engine_with_memory_store(config).await;

    run_to_completion(&engine).await;

    let metrics = engine.metrics_snapshot();
    assert_eq!(metrics.pages_crawled, 1);

    let status = engine.status().await;
    assert!(!status.running);
    assert_eq!(status.queue_size, 0, "depth cap keeps links out of the queue");
    assert_eq!(status.completed_count, 1);

    let documents = saved_documents(output.path());
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["links"].as_array().unwrap().len(), 5);
    assert_eq!(documents[0]["title"], "Home");
    assert_eq!(documents[0]["depth"], 0);
    assert_eq!(documents[0]["status_code"], 200);
}

#[tokio::test]
async fn depth_expansion_with_dedupe() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    // A links to B and C; B links back to A and on to D
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_response(format!(
            r#"<html><body><a href="{base}/b">B</a><a href="{base}/c">C</a></body></html>"#
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_response(format!(
            r#"<html><body><a href="{base}/a">A</a><a href="{base}/d">D</a></body></html>"#
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(html_response("<html><body>C</body></html>".to_string()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/d"))
        .respond_with(html_response("<html><body>D</body></html>".to_string()))
        .expect(1)
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let config = CrawlerConfig {
        max_depth: 2,
        ..test_config(output.path(), vec![format!("{}/a", base)])
    };
    let engine = engine_with_memory_store(config).await;

    run_to_completion(&engine).await;

    let metrics = engine.metrics_snapshot();
    assert_eq!(metrics.pages_crawled, 4);

    let status = engine.status().await;
    assert_eq!(status.seen_count, 4);
    assert_eq!(status.completed_count, 4);
    assert_eq!(saved_documents(output.path()).len(), 4);
    // The expect(1) on each mock asserts every page was fetched exactly once
}

#[tokio::test]
async fn robots_denied_path() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nDisallow: /private/").await;
    Mock::given(method("GET"))
        .and(path("/private/"))
        .respond_with(html_response("<html><body>secret</body></html>".to_string()))
        .expect(0)
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let config = test_config(output.path(), vec![format!("{}/private/", base)]);
    let engine = engine_with_memory_store(config).await;

    run_to_completion(&engine).await;

    let metrics = engine.metrics_snapshot();
    assert_eq!(metrics.pages_crawled, 0);
    assert_eq!(metrics.robots_denied, 1);

    let status = engine.status().await;
    assert_eq!(status.completed_count, 1);
    assert!(saved_documents(output.path()).is_empty());
}

#[tokio::test]
async fn redirect_to_completed_url() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", format!("{}/b", base).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_response("<html><body>B</body></html>".to_string()))
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let config = test_config(output.path(), vec![format!("{}/a", base)]);
    let engine = engine_with_memory_store(config).await;

    // B finished in an earlier crawl
    engine
        .frontier()
        .mark_completed(&format!("{}/b", base))
        .await
        .unwrap();

    run_to_completion(&engine).await;

    assert!(saved_documents(output.path()).is_empty(), "no document re-emitted");
    let status = engine.status().await;
    assert_eq!(status.completed_count, 2, "both A and B are terminal");
    assert_eq!(engine.metrics_snapshot().pages_crawled, 0);
}

#[tokio::test]
async fn rate_limit_spacing_on_one_host() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    for page in ["/r1", "/r2", "/r3", "/r4", "/r5"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html_response("<html><body>x</body></html>".to_string()))
            .mount(&server)
            .await;
    }

    let output = TempDir::new().unwrap();
    let config = CrawlerConfig {
        workers: 4,
        default_delay: 0.2,
        ..test_config(
            output.path(),
            (1..=5).map(|i| format!("{}/r{}", base, i)).collect(),
        )
    };
    let engine = engine_with_memory_store(config).await;

    let runner = Arc::clone(&engine);
    let run_task = tokio::spawn(async move { runner.run().await });

    // Watch for the moment the fifth page lands
    let started = tokio::time::Instant::now();
    let all_fetched = loop {
        if engine.metrics_snapshot().pages_crawled >= 5 {
            break started.elapsed();
        }
        if started.elapsed() > Duration::from_secs(20) {
            panic!("crawl did not fetch all pages in time");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };

    // Five same-host fetches need at least four full delays between them
    assert!(
        all_fetched >= Duration::from_millis(760),
        "five fetches finished too fast: {:?}",
        all_fetched
    );

    tokio::time::timeout(Duration::from_secs(30), run_task)
        .await
        .expect("run should finish")
        .expect("run task should not panic")
        .expect("run should not error");
}

#[tokio::test]
async fn idle_shutdown_without_seeds() {
    let output = TempDir::new().unwrap();
    let config = CrawlerConfig {
        idle_shutdown_threshold: 3,
        ..test_config(output.path(), Vec::new())
    };
    let engine = engine_with_memory_store(config).await;

    let started = tokio::time::Instant::now();
    tokio::time::timeout(Duration::from_secs(8), Arc::clone(&engine).run())
        .await
        .expect("engine should shut itself down")
        .expect("run should not error");

    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(engine.metrics_snapshot().pages_crawled, 0);
    assert!(!engine.is_running());
}

#[tokio::test]
async fn page_cap_limits_fetches() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    for page in ["/c1", "/c2", "/c3", "/c4"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html_response("<html><body>x</body></html>".to_string()))
            .mount(&server)
            .await;
    }

    let output = TempDir::new().unwrap();
    let config = CrawlerConfig {
        workers: 1,
        max_pages: 2,
        ..test_config(
            output.path(),
            (1..=4).map(|i| format!("{}/c{}", base, i)).collect(),
        )
    };
    let engine = engine_with_memory_store(config).await;

    run_to_completion(&engine).await;

    assert_eq!(engine.metrics_snapshot().pages_crawled, 2);
    assert_eq!(saved_documents(output.path()).len(), 2);
}

#[tokio::test]
async fn content_type_filter_completes_without_emitting() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/image"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0u8; 16])
                .insert_header("content-type", "image/png"),
        )
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let config = test_config(output.path(), vec![format!("{}/image", base)]);
    let engine = engine_with_memory_store(config).await;

    run_to_completion(&engine).await;

    assert_eq!(engine.metrics_snapshot().pages_crawled, 0);
    assert_eq!(engine.status().await.completed_count, 1);
    assert!(saved_documents(output.path()).is_empty());
}

#[tokio::test]
async fn fetch_error_marks_failed_not_completed() {
    // No server at this address
    let output = TempDir::new().unwrap();
    let mut config = test_config(
        output.path(),
        vec!["http://127.0.0.1:9/unreachable".to_string()],
    );
    config.respect_robots_txt = false;
    config.request_timeout = 2;
    let engine = engine_with_memory_store(config).await;

    run_to_completion(&engine).await;

    let metrics = engine.metrics_snapshot();
    assert_eq!(metrics.pages_crawled, 0);
    assert!(metrics.errors >= 1);
    assert_eq!(metrics.pages_failed, 1);

    let status = engine.status().await;
    assert_eq!(status.completed_count, 0, "failures are not completions");
    assert_eq!(status.processing_count, 0, "failures release the claim");
    assert_eq!(status.seen_count, 1, "seen blocks re-admission");
}

#[tokio::test]
async fn excluded_extensions_never_enqueued() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(format!(
            r#"<html><body>
                <a href="{base}/doc.pdf">pdf</a>
                <a href="{base}/style.css">css</a>
                <a href="{base}/next">ok</a>
            </body></html>"#
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(html_response("<html><body>next</body></html>".to_string()))
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let config = CrawlerConfig {
        max_depth: 1,
        ..test_config(output.path(), vec![format!("{}/", base)])
    };
    let engine = engine_with_memory_store(config).await;

    run_to_completion(&engine).await;

    // Only the seed and /next were fetched; the pdf and css links were filtered
    assert_eq!(engine.metrics_snapshot().pages_crawled, 2);
    assert_eq!(engine.status().await.seen_count, 2);
}
