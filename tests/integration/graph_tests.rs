//! Resource graph tests over an in-memory fetcher and storage
//!
//! These tests pin down deduplication, ceilings, rewriting and the
//! failure protocol without any network access.

use crate::support::{
    absolute, config, mirror, recursive_config, with_subdirectories, MemoryFetcher,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sumi_mirror::config::{FilenameStrategy, MissingSourcesPolicy, SeedEntry, SourceRule};
use sumi_mirror::crawler::{FetchResponse, Fetcher, RequestOptions};
use sumi_mirror::storage::MemoryStorage;
use sumi_mirror::{ConfigError, Mirror, MirrorError, Plugin, Resource, ResourceKind};

fn setup(fetcher: MemoryFetcher) -> (Arc<MemoryFetcher>, Arc<MemoryStorage>) {
    (Arc::new(fetcher), Arc::new(MemoryStorage::new()))
}

#[tokio::test]
async fn test_mirror_rewrites_references() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html(
                "/",
                r#"<html><head><link rel="stylesheet" href="b.css"></head><body><img src="a.png"></body></html>"#,
            )
            .css("/b.css", r#"body { background: url("bg.png") }"#)
            .image("/a.png")
            .image("/bg.png"),
    );

    let reports = mirror(with_subdirectories(config(&["/"])), &fetcher, &storage)
        .scrape()
        .await
        .unwrap();

    assert_eq!(
        storage.paths(),
        vec!["css/b.css", "img/a.png", "img/bg.png", "index.html"]
    );
    assert_eq!(
        storage.text("index.html").unwrap(),
        r#"<html><head><link rel="stylesheet" href="css/b.css"></head><body><img src="img/a.png"></body></html>"#
    );
    assert_eq!(
        storage.text("css/b.css").unwrap(),
        r#"body { background: url("../img/bg.png") }"#
    );
    assert_eq!(
        storage.get("img/a.png").unwrap(),
        b"image:/a.png".to_vec()
    );

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].filename.as_deref(), Some("index.html"));
    assert!(reports[0].saved);
    assert_eq!(reports[0].children.len(), 2);
    assert_eq!(fetcher.total_fetches(), 4);
}

#[tokio::test]
async fn test_equivalent_urls_fetched_once() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html(
                "/",
                r#"<img src="a.png"><img src="./a.png"><img src="https://EXAMPLE.com:443/a.png#x">"#,
            )
            .image("/a.png"),
    );

    mirror(config(&["/"]), &fetcher, &storage)
        .scrape()
        .await
        .unwrap();

    assert_eq!(fetcher.fetch_count("/a.png"), 1);
    assert_eq!(fetcher.total_fetches(), 2);
    assert_eq!(storage.paths(), vec!["a.png", "index.html"]);
    assert_eq!(
        storage.text("index.html").unwrap(),
        r#"<img src="a.png"><img src="a.png"><img src="a.png">"#
    );
}

#[tokio::test]
async fn test_query_order_does_not_split_resources() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<img src="a.png?b=2&a=1"><img src="a.png?a=1&b=2">"#)
            .image("/a.png?b=2&a=1"),
    );

    mirror(config(&["/"]), &fetcher, &storage)
        .scrape()
        .await
        .unwrap();

    assert_eq!(fetcher.total_fetches(), 2);
    assert_eq!(
        storage.text("index.html").unwrap(),
        r#"<img src="a.png"><img src="a.png">"#
    );
}

#[tokio::test]
async fn test_trailing_slash_is_significant() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<a href="/docs">x</a><a href="/docs/">y</a>"#)
            .html("/docs", "<p>docs</p>")
            .html("/docs/", "<p>docs dir</p>"),
    );

    mirror(recursive_config(&["/"]), &fetcher, &storage)
        .scrape()
        .await
        .unwrap();

    assert_eq!(fetcher.fetch_count("/docs"), 1);
    assert_eq!(fetcher.fetch_count("/docs/"), 1);
    assert_eq!(
        storage.paths(),
        vec!["docs.html", "index.html", "index_1.html"]
    );
}

#[tokio::test]
async fn test_depth_ceiling() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<a href="p1.html">1</a>"#)
            .html("/p1.html", r#"<a href="p2.html">2</a>"#)
            .html("/p2.html", r#"<a href="p3.html">3</a>"#)
            .html("/p3.html", "end"),
    );

    let mut config = recursive_config(&["/"]);
    config.crawler.max_depth = Some(2);

    let reports = mirror(config, &fetcher, &storage).scrape().await.unwrap();

    assert_eq!(fetcher.fetch_count("/p3.html"), 0);
    assert_eq!(storage.paths(), vec!["index.html", "p1.html", "p2.html"]);
    assert_eq!(
        storage.text("p2.html").unwrap(),
        r#"<a href="p3.html">3</a>"#
    );

    let skipped = reports[0].find(&absolute("/p3.html")).unwrap();
    assert_eq!(skipped.status, "skipped");
    assert!(!skipped.saved);
}

#[tokio::test]
async fn test_recursive_ceiling_only_limits_hyperlinks() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<a href="page.html">page</a>"#)
            .html(
                "/page.html",
                r#"<img src="pic.png"><a href="deep.html">deep</a>"#,
            )
            .image("/pic.png")
            .html("/deep.html", "deep"),
    );

    let mut config = recursive_config(&["/"]);
    config.crawler.max_recursive_depth = Some(1);

    mirror(config, &fetcher, &storage).scrape().await.unwrap();

    assert_eq!(fetcher.fetch_count("/pic.png"), 1);
    assert_eq!(fetcher.fetch_count("/deep.html"), 0);
    assert_eq!(storage.paths(), vec!["index.html", "page.html", "pic.png"]);
}

#[tokio::test]
async fn test_hyperlinks_ignored_without_recursion() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<a href="./page.html">page</a><img src="./pic.png">"#)
            .html("/page.html", "page")
            .image("/pic.png"),
    );

    mirror(config(&["/"]), &fetcher, &storage)
        .scrape()
        .await
        .unwrap();

    assert_eq!(fetcher.fetch_count("/page.html"), 0);
    assert_eq!(
        storage.text("index.html").unwrap(),
        r#"<a href="./page.html">page</a><img src="pic.png">"#
    );
}

#[tokio::test]
async fn test_fragments_kept_for_documents_only() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html(
                "/",
                r#"<a href="./page.html#sec">a</a><img src="./pic.png#frag">"#,
            )
            .html("/page.html", "page")
            .image("/pic.png"),
    );

    mirror(recursive_config(&["/"]), &fetcher, &storage)
        .scrape()
        .await
        .unwrap();

    assert_eq!(fetcher.fetch_count("/page.html"), 1);
    assert_eq!(
        storage.text("index.html").unwrap(),
        r#"<a href="page.html#sec">a</a><img src="pic.png">"#
    );
}

#[tokio::test]
async fn test_reference_cycle_terminates() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/a.html", r#"<a href="b.html">b</a>"#)
            .html("/b.html", r#"<a href="a.html">a</a>"#),
    );

    let reports = mirror(recursive_config(&["/a.html"]), &fetcher, &storage)
        .scrape()
        .await
        .unwrap();

    assert_eq!(fetcher.fetch_count("/a.html"), 1);
    assert_eq!(fetcher.fetch_count("/b.html"), 1);
    assert_eq!(storage.paths(), vec!["a.html", "b.html"]);

    let b = &reports[0].children[0];
    assert_eq!(b.filename.as_deref(), Some("b.html"));
    assert_eq!(b.children[0].url, absolute("/a.html"));
    assert!(b.children[0].children.is_empty());
}

#[tokio::test]
async fn test_tolerant_mode_keeps_going() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<img src="ok.png"><img src="broken.png">"#)
            .image("/ok.png")
            .status("/broken.png", 500),
    );

    let mut config = config(&["/"]);
    config.crawler.ignore_errors = true;

    let reports = mirror(config, &fetcher, &storage).scrape().await.unwrap();

    assert_eq!(storage.paths(), vec!["index.html", "ok.png"]);
    assert_eq!(
        storage.text("index.html").unwrap(),
        r#"<img src="ok.png"><img src="broken.png">"#
    );
    let broken = reports[0].find(&absolute("/broken.png")).unwrap();
    assert_eq!(broken.status, "failed");
    assert!(broken.filename.is_none());
}

#[tokio::test]
async fn test_missing_references_made_absolute() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<img src="broken.png">"#)
            .status("/broken.png", 404),
    );

    let mut config = config(&["/"]);
    config.crawler.ignore_errors = true;
    config.crawler.update_missing_sources = MissingSourcesPolicy::All(true);

    mirror(config, &fetcher, &storage).scrape().await.unwrap();

    assert_eq!(
        storage.text("index.html").unwrap(),
        r#"<img src="https://example.com/broken.png">"#
    );
}

#[tokio::test]
async fn test_missing_policy_limited_to_rules() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<img src="pic.png"><a href="about.html">about</a>"#)
            .image("/pic.png")
            .html("/about.html", "about"),
    );

    let mut config = recursive_config(&["/"]);
    config.crawler.max_depth = Some(0);
    config.crawler.update_missing_sources =
        MissingSourcesPolicy::Rules(vec![SourceRule::attr("a", "href")]);

    mirror(config, &fetcher, &storage).scrape().await.unwrap();

    assert_eq!(fetcher.total_fetches(), 1);
    assert_eq!(
        storage.text("index.html").unwrap(),
        r#"<img src="pic.png"><a href="https://example.com/about.html">about</a>"#
    );
}

#[derive(Default)]
struct ErrorRecorder {
    errors: Mutex<Vec<String>>,
    resource_errors: AtomicUsize,
}

#[async_trait]
impl Plugin for ErrorRecorder {
    async fn on_resource_error(&self, _resource: &Resource, _error: &MirrorError) {
        self.resource_errors.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_error(&self, error: &MirrorError) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

#[tokio::test]
async fn test_fail_fast_rolls_back() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<img src="ok.png"><img src="broken.png">"#)
            .image("/ok.png")
            .status("/broken.png", 500),
    );
    let recorder = Arc::new(ErrorRecorder::default());

    let mirror = Mirror::builder(config(&["/"]))
        .fetcher(fetcher.clone())
        .storage(storage.clone())
        .plugin(recorder.clone())
        .build()
        .unwrap();

    let err = mirror.scrape().await.unwrap_err();
    match &err {
        MirrorError::Network { url, message } => {
            assert_eq!(url, &absolute("/broken.png"));
            assert_eq!(message, "HTTP 500");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(storage.is_empty());
    assert_eq!(recorder.errors.lock().unwrap().len(), 1);
    assert_eq!(recorder.resource_errors.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_crawl_leaves_no_directory() {
    let dir = tempfile::tempdir().unwrap();
    let site = dir.path().join("site");

    let fetcher = Arc::new(
        MemoryFetcher::new()
            .image("/ok.png")
            .html("/", r#"<img src="broken.png">"#)
            .status("/broken.png", 500),
    );

    let mut config = config(&["/ok.png", "/"]);
    config.output.directory = site.clone();
    config.crawler.root_concurrency = 1;

    let result = Mirror::builder(config)
        .fetcher(fetcher.clone())
        .build()
        .unwrap()
        .scrape()
        .await;

    assert!(result.is_err());
    assert!(!site.exists());
}

#[tokio::test]
async fn test_existing_directory_rejected_before_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MemoryFetcher::new().html("/", "<p>"));

    let mut config = config(&["/"]);
    config.output.directory = dir.path().to_path_buf();

    let err = Mirror::builder(config)
        .fetcher(fetcher.clone())
        .build()
        .unwrap()
        .scrape()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MirrorError::Config(ConfigError::DirectoryExists(_))
    ));
    assert_eq!(fetcher.total_fetches(), 0);
    assert!(dir.path().exists());
}

#[tokio::test]
async fn test_url_filter_predicate() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<img src="https://cdn.test/x.png"><img src="y.png">"#)
            .image("https://cdn.test/x.png")
            .image("/y.png"),
    );

    let mirror = Mirror::builder(config(&["/"]))
        .fetcher(fetcher.clone())
        .storage(storage.clone())
        .url_filter(|url| url.host_str() == Some("example.com"))
        .build()
        .unwrap();
    mirror.scrape().await.unwrap();

    assert_eq!(fetcher.fetch_count("https://cdn.test/x.png"), 0);
    assert_eq!(storage.paths(), vec!["index.html", "y.png"]);
    assert_eq!(
        storage.text("index.html").unwrap(),
        r#"<img src="https://cdn.test/x.png"><img src="y.png">"#
    );
}

#[tokio::test]
async fn test_url_filter_host_patterns() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html(
                "/",
                r#"<img src="https://img.cdn.test/x.png"><img src="https://other.test/y.png">"#,
            )
            .image("https://img.cdn.test/x.png")
            .image("https://other.test/y.png"),
    );

    let mut config = config(&["/"]);
    config.crawler.url_filter = vec!["example.com".into(), "*.cdn.test".into()];

    mirror(config, &fetcher, &storage).scrape().await.unwrap();

    assert_eq!(fetcher.fetch_count("https://img.cdn.test/x.png"), 1);
    assert_eq!(fetcher.fetch_count("https://other.test/y.png"), 0);
}

#[tokio::test]
async fn test_collisions_get_unique_names() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<img src="a/logo.png"><img src="b/logo.png">"#)
            .image("/a/logo.png")
            .image("/b/logo.png"),
    );

    mirror(config(&["/"]), &fetcher, &storage)
        .scrape()
        .await
        .unwrap();

    assert_eq!(
        storage.paths(),
        vec!["index.html", "logo.png", "logo_1.png"]
    );
    assert_ne!(storage.get("logo.png"), storage.get("logo_1.png"));

    let html = storage.text("index.html").unwrap();
    assert!(html.contains(r#"src="logo.png""#));
    assert!(html.contains(r#"src="logo_1.png""#));
}

#[tokio::test]
async fn test_paths_never_escape_output_root() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html(
                "/",
                r#"<img src="a/%2E%2E/%2E%2E/%2E%2E/etc/passwd.png"><img src="../../../up.png">"#,
            )
            .image("/etc/passwd.png")
            .image("/up.png"),
    );

    let mut config = config(&["/"]);
    config.output.filename_generator = FilenameStrategy::BySiteStructure;
    config.crawler.ignore_errors = true;

    mirror(config, &fetcher, &storage).scrape().await.unwrap();

    assert!(storage.paths().contains(&"example.com/index.html".to_string()));
    for path in storage.paths() {
        assert!(path.starts_with("example.com/"), "{path}");
        assert!(!path.split('/').any(|part| part == ".." || part == "."), "{path}");
    }
}

#[tokio::test]
async fn test_redirect_onto_known_resource_aliases() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", "<p>home</p>")
            .redirect("/home", "/"),
    );

    let reports = mirror(config(&["/", "/home"]), &fetcher, &storage)
        .scrape()
        .await
        .unwrap();

    assert_eq!(storage.paths(), vec!["index.html"]);
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1].url, absolute("/"));
    assert_eq!(reports[1].filename.as_deref(), Some("index.html"));
}

#[tokio::test]
async fn test_redirect_records_final_url() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<img src="old.png">"#)
            .redirect("/old.png", "/new.png")
            .image("/new.png"),
    );

    mirror(config(&["/"]), &fetcher, &storage)
        .scrape()
        .await
        .unwrap();

    assert_eq!(storage.paths(), vec!["index.html", "new.png"]);
    assert_eq!(storage.text("index.html").unwrap(), r#"<img src="new.png">"#);
}

#[tokio::test]
async fn test_base_href_changes_resolution_and_is_removed() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<head><base href="/assets/"></head><img src="a.png">"#)
            .image("/assets/a.png"),
    );

    mirror(config(&["/"]), &fetcher, &storage)
        .scrape()
        .await
        .unwrap();

    assert_eq!(fetcher.fetch_count("/assets/a.png"), 1);
    assert_eq!(
        storage.text("index.html").unwrap(),
        r#"<head></head><img src="a.png">"#
    );
}

#[tokio::test]
async fn test_site_structure_links() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<a href="docs/">docs</a>"#)
            .html("/docs/", r#"<a href="../">home</a>"#),
    );

    let mut config = recursive_config(&["/"]);
    config.output.filename_generator = FilenameStrategy::BySiteStructure;

    mirror(config, &fetcher, &storage).scrape().await.unwrap();

    assert_eq!(
        storage.text("example.com/index.html").unwrap(),
        r#"<a href="docs/index.html">docs</a>"#
    );
    assert_eq!(
        storage.text("example.com/docs/index.html").unwrap(),
        r#"<a href="../index.html">home</a>"#
    );
}

#[tokio::test]
async fn test_prettified_links() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<a href="docs/index.html">docs</a>"#)
            .html("/docs/index.html", r#"<a href="../index.html">home</a>"#),
    );

    let mut config = recursive_config(&["/"]);
    config.output.filename_generator = FilenameStrategy::BySiteStructure;
    config.output.prettify_urls = true;

    mirror(config, &fetcher, &storage).scrape().await.unwrap();

    assert_eq!(
        storage.text("example.com/index.html").unwrap(),
        r#"<a href="docs/">docs</a>"#
    );
    assert_eq!(
        storage.text("example.com/docs/index.html").unwrap(),
        r#"<a href="../">home</a>"#
    );
}

#[tokio::test]
async fn test_srcset_and_inline_styles() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html(
                "/",
                r#"<img srcset="a.png 1x, b.png 2x"><div style="background: url('c.png')"></div><style>p { background: url(d.png) }</style>"#,
            )
            .image("/a.png")
            .image("/b.png")
            .image("/c.png")
            .image("/d.png"),
    );

    mirror(with_subdirectories(config(&["/"])), &fetcher, &storage)
        .scrape()
        .await
        .unwrap();

    assert_eq!(
        storage.text("index.html").unwrap(),
        r#"<img srcset="img/a.png 1x, img/b.png 2x"><div style="background: url('img/c.png')"></div><style>p { background: url(img/d.png) }</style>"#
    );
}

#[tokio::test]
async fn test_entities_in_attributes() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<a href="page.php?x=1&amp;y=2">p</a>"#)
            .html("/page.php?x=1&y=2", "page"),
    );

    mirror(recursive_config(&["/"]), &fetcher, &storage)
        .scrape()
        .await
        .unwrap();

    assert_eq!(fetcher.fetch_count("/page.php?x=1&y=2"), 1);
    assert_eq!(
        storage.text("index.html").unwrap(),
        r#"<a href="page.php">p</a>"#
    );
}

#[tokio::test]
async fn test_reports_follow_seed_order() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/b.html", "b")
            .html("/a.html", "a")
            .html("/c", "c"),
    );

    let mut config = config(&["/b.html", "/a.html"]);
    config.seeds.push(SeedEntry::Detailed {
        url: absolute("/c"),
        filename: Some("home.html".into()),
    });

    let reports = mirror(config, &fetcher, &storage).scrape().await.unwrap();

    let urls: Vec<&str> = reports.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            absolute("/b.html").as_str(),
            absolute("/a.html").as_str(),
            absolute("/c").as_str()
        ]
    );
    assert_eq!(reports[2].filename.as_deref(), Some("home.html"));
    assert_eq!(storage.paths(), vec!["a.html", "b.html", "home.html"]);
}

/// Adds a header, drops GIFs, names stylesheets and counts saves
#[derive(Default)]
struct Policy {
    saved: AtomicUsize,
}

#[async_trait]
impl Plugin for Policy {
    fn name(&self) -> &str {
        "policy"
    }

    async fn before_request(
        &self,
        _resource: &Resource,
        mut options: RequestOptions,
    ) -> sumi_mirror::Result<RequestOptions> {
        options.headers.insert("x-test".into(), "1".into());
        Ok(options)
    }

    async fn after_response(
        &self,
        resource: &Resource,
        response: FetchResponse,
    ) -> sumi_mirror::Result<Option<FetchResponse>> {
        if resource.url().path().ends_with(".gif") {
            Ok(None)
        } else {
            Ok(Some(response))
        }
    }

    fn generate_filename(&self, resource: &Resource, _occupied: &[String]) -> Option<String> {
        (resource.kind() == Some(ResourceKind::Css)).then(|| "styles/main.css".to_string())
    }

    async fn on_resource_saved(&self, _resource: &Resource) {
        self.saved.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_plugin_hooks() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html(
                "/",
                r#"<img src="skip.gif"><link rel="stylesheet" href="b.css">"#,
            )
            .page("/skip.gif", Some("image/gif"), "GIF")
            .css("/b.css", "p {}"),
    );
    let policy = Arc::new(Policy::default());

    Mirror::builder(config(&["/"]))
        .fetcher(fetcher.clone())
        .storage(storage.clone())
        .plugin(policy.clone())
        .build()
        .unwrap()
        .scrape()
        .await
        .unwrap();

    let options = fetcher.options_for("/").unwrap();
    assert_eq!(options.headers.get("x-test").map(String::as_str), Some("1"));

    assert_eq!(fetcher.fetch_count("/skip.gif"), 1);
    assert_eq!(storage.paths(), vec!["index.html", "styles/main.css"]);
    assert_eq!(
        storage.text("index.html").unwrap(),
        r#"<img src="skip.gif"><link rel="stylesheet" href="styles/main.css">"#
    );
    assert_eq!(policy.saved.load(Ordering::SeqCst), 2);
}

struct KeepInMemory {
    urls: Mutex<Vec<String>>,
}

#[async_trait]
impl Plugin for KeepInMemory {
    async fn save_resource(&self, resource: &Resource) -> sumi_mirror::Result<bool> {
        self.urls.lock().unwrap().push(resource.url().to_string());
        Ok(true)
    }
}

#[tokio::test]
async fn test_plugin_can_take_over_persistence() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<img src="a.png">"#)
            .image("/a.png"),
    );
    let keeper = Arc::new(KeepInMemory {
        urls: Mutex::new(Vec::new()),
    });

    let reports = Mirror::builder(config(&["/"]))
        .fetcher(fetcher.clone())
        .storage(storage.clone())
        .plugin(keeper.clone())
        .build()
        .unwrap()
        .scrape()
        .await
        .unwrap();

    assert!(storage.is_empty());
    assert_eq!(keeper.urls.lock().unwrap().len(), 2);
    assert!(reports[0].saved);
}

#[tokio::test]
async fn test_file_and_directory_names_never_clash() {
    let dir = tempfile::tempdir().unwrap();
    let site = dir.path().join("site");

    let fetcher = Arc::new(
        MemoryFetcher::new()
            .html("/", r#"<img src="/feed"><img src="/feed/x.png">"#)
            .image("/feed")
            .image("/feed/x.png"),
    );

    let mut config = config(&["/"]);
    config.output.directory = site.clone();
    config.output.filename_generator = FilenameStrategy::BySiteStructure;

    Mirror::builder(config)
        .fetcher(fetcher.clone())
        .build()
        .unwrap()
        .scrape()
        .await
        .unwrap();

    let host_dir = site.join("example.com");
    let html = std::fs::read_to_string(host_dir.join("index.html")).unwrap();
    let sources: Vec<&str> = html
        .split(r#"src=""#)
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .collect();

    assert_eq!(sources.len(), 2);
    assert!(host_dir.join(sources[0]).is_file(), "{html}");
    assert!(host_dir.join(sources[1]).is_file(), "{html}");
    assert_eq!(
        std::fs::read(host_dir.join(sources[1])).unwrap(),
        b"image:/feed/x.png".to_vec()
    );
}

#[tokio::test]
async fn test_non_utf8_page_keeps_its_bytes() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .bytes(
                "/",
                Some("text/html; charset=iso-8859-1"),
                b"<p>caf\xE9</p><img src=\"a.png\">",
            )
            .image("/a.png"),
    );

    mirror(with_subdirectories(config(&["/"])), &fetcher, &storage)
        .scrape()
        .await
        .unwrap();

    assert_eq!(
        storage.get("index.html").unwrap(),
        b"<p>caf\xE9</p><img src=\"img/a.png\">".to_vec()
    );
}

#[tokio::test]
async fn test_noscript_references_followed() {
    let (fetcher, storage) = setup(
        MemoryFetcher::new()
            .html("/", r#"<noscript><img src="a.png"></noscript>"#)
            .image("/a.png"),
    );

    mirror(with_subdirectories(config(&["/"])), &fetcher, &storage)
        .scrape()
        .await
        .unwrap();

    assert_eq!(fetcher.fetch_count("/a.png"), 1);
    assert_eq!(
        storage.text("index.html").unwrap(),
        r#"<noscript><img src="img/a.png"></noscript>"#
    );
}

/// Serves one page linking six images and records peak fetch concurrency
#[derive(Default)]
struct PeakTracker {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
}

#[async_trait]
impl Fetcher for PeakTracker {
    async fn fetch(
        &self,
        url: &url::Url,
        _options: &RequestOptions,
    ) -> sumi_mirror::Result<FetchResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if url.path() == "/" {
            let body: String = (0..6).map(|i| format!(r#"<img src="{}.png">"#, i)).collect();
            Ok(FetchResponse::new(url.clone(), body.into_bytes(), Some("text/html")))
        } else {
            Ok(FetchResponse::new(url.clone(), b"png".to_vec(), Some("image/png")))
        }
    }
}

#[tokio::test]
async fn test_request_concurrency_limit() {
    let fetcher = Arc::new(PeakTracker::default());
    let storage = Arc::new(MemoryStorage::new());

    let mut config = config(&["/"]);
    config.crawler.request_concurrency = Some(2);

    Mirror::builder(config)
        .fetcher(fetcher.clone())
        .storage(storage.clone())
        .build()
        .unwrap()
        .scrape()
        .await
        .unwrap();

    assert_eq!(fetcher.total.load(Ordering::SeqCst), 7);
    assert!(fetcher.peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(storage.len(), 7);
}

/// Redirects `/x` to `/y` and `/y` to `/x` without following either
struct CrossRedirects;

#[async_trait]
impl Fetcher for CrossRedirects {
    async fn fetch(
        &self,
        url: &url::Url,
        _options: &RequestOptions,
    ) -> sumi_mirror::Result<FetchResponse> {
        tokio::task::yield_now().await;
        let target = if url.path() == "/x" { "/y" } else { "/x" };
        let final_url = url.join(target)?;
        Ok(FetchResponse::new(final_url, b"<p>".to_vec(), Some("text/html")))
    }
}

#[tokio::test]
async fn test_crossed_redirects_terminate() {
    let storage = Arc::new(MemoryStorage::new());
    let mirror = Mirror::builder(config(&["/x", "/y"]))
        .fetcher(Arc::new(CrossRedirects))
        .storage(storage.clone())
        .build()
        .unwrap();

    let reports = tokio::time::timeout(Duration::from_secs(5), mirror.scrape())
        .await
        .expect("crawl should not hang")
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|report| !report.saved));
    assert!(storage.is_empty());
}
