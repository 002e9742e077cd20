//! Integration tests for the mirror over HTTP
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! fetch, rewrite and save cycle against a temporary output directory.

use crate::support::with_subdirectories;
use sumi_mirror::config::Config;
use sumi_mirror::{Mirror, MirrorError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a configuration writing into `directory`
fn create_test_config(seeds: Vec<String>, directory: &std::path::Path) -> Config {
    let mut config = Config::new(seeds, directory);
    config.user_agent.crawler_name = "TestBot".to_string();
    config
}

async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_mirror_single_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(
        &mock_server,
        "/",
        r#"<html><body><img src="a.png"><link rel="stylesheet" href="b.css"></body></html>"#,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/b.css"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes("body { background: url(a.png) }")
                .insert_header("content-type", "text/css"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    // Referenced from both the page and the stylesheet, fetched once
    Mock::given(method("GET"))
        .and(path("/a.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x89, b'P', b'N', b'G'])
                .insert_header("content-type", "image/png"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let site = dir.path().join("site");
    let config = with_subdirectories(create_test_config(vec![format!("{}/", base_url)], &site));

    let mirror = Mirror::builder(config)
        .build()
        .expect("Failed to build mirror");
    let reports = mirror.scrape().await.expect("Mirror failed");

    assert_eq!(reports.len(), 1);
    assert!(reports[0].saved);
    assert_eq!(reports[0].filename.as_deref(), Some("index.html"));

    let index = std::fs::read_to_string(site.join("index.html")).unwrap();
    assert_eq!(
        index,
        r#"<html><body><img src="img/a.png"><link rel="stylesheet" href="css/b.css"></body></html>"#
    );

    let css = std::fs::read_to_string(site.join("css/b.css")).unwrap();
    assert_eq!(css, "body { background: url(../img/a.png) }");

    let png = std::fs::read(site.join("img/a.png")).unwrap();
    assert_eq!(png, vec![0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn test_http_error_rolls_back() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // "/missing.png" is not mounted, so the server answers 404
    mount_html(&mock_server, "/", r#"<img src="missing.png">"#).await;

    let dir = tempfile::tempdir().unwrap();
    let site = dir.path().join("site");
    let config = create_test_config(vec![format!("{}/", base_url)], &site);

    let err = Mirror::builder(config)
        .build()
        .unwrap()
        .scrape()
        .await
        .expect_err("Mirror should fail on a broken reference");

    match err {
        MirrorError::Network { url, message } => {
            assert!(url.ends_with("/missing.png"), "{url}");
            assert_eq!(message, "HTTP 404");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!site.exists(), "output directory should be rolled back");
}

#[tokio::test]
async fn test_failing_seed_tolerated() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(&mock_server, "/", "<p>home</p>").await;

    let dir = tempfile::tempdir().unwrap();
    let site = dir.path().join("site");
    let mut config = create_test_config(
        vec![format!("{}/", base_url), format!("{}/gone", base_url)],
        &site,
    );
    config.crawler.ignore_errors = true;

    let reports = Mirror::builder(config)
        .build()
        .unwrap()
        .scrape()
        .await
        .expect("Mirror should tolerate the failing seed");

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].status, "saved");
    assert_eq!(reports[1].status, "failed");
    assert_eq!(
        std::fs::read_to_string(site.join("index.html")).unwrap(),
        "<p>home</p>"
    );
}

#[tokio::test]
async fn test_configured_headers_sent() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("x-mirror", "yes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes("<p>ok</p>")
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let site = dir.path().join("site");
    let mut config = create_test_config(vec![format!("{}/", base_url)], &site);
    config
        .request
        .headers
        .insert("x-mirror".to_string(), "yes".to_string());

    Mirror::builder(config)
        .build()
        .unwrap()
        .scrape()
        .await
        .expect("Mirror failed");

    assert!(site.join("index.html").exists());
}

#[tokio::test]
async fn test_redirected_seed_saved_under_final_url() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let location = format!("{}/new", base_url);
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", location.as_str()))
        .mount(&mock_server)
        .await;
    mount_html(&mock_server, "/new", "<p>moved</p>").await;

    let dir = tempfile::tempdir().unwrap();
    let site = dir.path().join("site");
    let config = create_test_config(vec![format!("{}/old", base_url)], &site);

    let reports = Mirror::builder(config)
        .build()
        .unwrap()
        .scrape()
        .await
        .expect("Mirror failed");

    assert_eq!(reports[0].url, format!("{}/new", base_url));
    assert_eq!(reports[0].filename.as_deref(), Some("new.html"));
    assert_eq!(
        std::fs::read_to_string(site.join("new.html")).unwrap(),
        "<p>moved</p>"
    );
}
