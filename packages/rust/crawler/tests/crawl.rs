//! End-to-end crawl tests against a mock HTTP server and local file trees.

use std::sync::Arc;

use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use docsweep_crawler::{CrawlEngine, ProgressReporter, ScrapeResult, SilentProgress};
use docsweep_shared::{DocsweepError, ScopeMode, ScrapeOptions};

fn options() -> ScrapeOptions {
    ScrapeOptions {
        concurrency: 2,
        ..ScrapeOptions::default()
    }
}

async fn serve_html(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.to_string(), "text/html"))
        .mount(server)
        .await;
}

async fn crawl(server: &MockServer, seed_path: &str, opts: &ScrapeOptions) -> ScrapeResult {
    let engine = CrawlEngine::new();
    let seed = Url::parse(&format!("{}{}", server.uri(), seed_path)).unwrap();
    engine.run(&seed, opts, &SilentProgress).await.unwrap()
}

fn fetched_paths(result: &ScrapeResult) -> Vec<String> {
    let mut paths: Vec<String> = result
        .pages
        .iter()
        .filter(|p| p.errors.is_empty())
        .map(|p| Url::parse(&p.url).unwrap().path().to_string())
        .collect();
    paths.sort();
    paths
}

const SEED_WITH_SCOPED_LINKS: &str = r#"<html><body><main>
    <h1>Docs Home</h1>
    <a href="/docs/page1">One</a>
    <a href="/other/page2">Two</a>
    <a href="/docs/page3/">Three</a>
    <a href="https://anothersite.com/">Elsewhere</a>
    <a href="/docs/relative">Relative</a>
    <a href="/other/relative">Other relative</a>
</main></body></html>"#;

async fn scoped_server() -> MockServer {
    let server = MockServer::start().await;
    serve_html(&server, "/docs/", SEED_WITH_SCOPED_LINKS).await;
    for route in [
        "/docs/page1",
        "/other/page2",
        "/docs/page3/",
        "/docs/relative",
        "/other/relative",
    ] {
        serve_html(
            &server,
            route,
            "<html><body><main><h1>Leaf</h1></main></body></html>",
        )
        .await;
    }
    server
}

#[tokio::test]
async fn subpages_scope_fetches_only_links_under_the_seed() {
    let server = scoped_server().await;
    let result = crawl(&server, "/docs/", &options()).await;

    assert_eq!(
        fetched_paths(&result),
        vec!["/docs/", "/docs/page1", "/docs/page3/", "/docs/relative"]
    );
    assert_eq!(result.pages_fetched, 4);
    assert_eq!(result.pages_failed, 0);
    // anothersite.com plus the two /other/ links were dropped.
    assert_eq!(result.links_skipped, 3);
}

#[tokio::test]
async fn hostname_scope_adds_sibling_paths_but_not_other_hosts() {
    let server = scoped_server().await;
    let opts = ScrapeOptions {
        scope: ScopeMode::Hostname,
        ..options()
    };
    let result = crawl(&server, "/docs/", &opts).await;

    assert_eq!(
        fetched_paths(&result),
        vec![
            "/docs/",
            "/docs/page1",
            "/docs/page3/",
            "/docs/relative",
            "/other/page2",
            "/other/relative",
        ]
    );
    // Only anothersite.com was dropped.
    assert_eq!(result.links_skipped, 1);
}

#[tokio::test]
async fn depth_limit_stops_the_traversal() {
    let server = MockServer::start().await;
    serve_html(
        &server,
        "/",
        r#"<html><body><main><h1>Root</h1><a href="/level1">L1</a></main></body></html>"#,
    )
    .await;
    serve_html(
        &server,
        "/level1",
        r#"<html><body><main><h1>L1</h1><a href="/level2">L2</a></main></body></html>"#,
    )
    .await;
    serve_html(
        &server,
        "/level2",
        "<html><body><main><h1>L2</h1></main></body></html>",
    )
    .await;

    let opts = ScrapeOptions {
        max_depth: 1,
        ..options()
    };
    let result = crawl(&server, "/", &opts).await;

    assert_eq!(fetched_paths(&result), vec!["/", "/level1"]);
    // /level2 was discovered but sits past the depth limit.
    assert_eq!(result.links_skipped, 1);
}

#[tokio::test]
async fn max_pages_caps_the_crawl() {
    let server = MockServer::start().await;
    let mut seed = String::from("<html><body><main><h1>Hub</h1>");
    for i in 0..10 {
        seed.push_str(&format!("<a href=\"/page{i}\">{i}</a>"));
        serve_html(
            &server,
            &format!("/page{i}"),
            "<html><body><main><h1>Leaf</h1></main></body></html>",
        )
        .await;
    }
    seed.push_str("</main></body></html>");
    serve_html(&server, "/", &seed).await;

    let opts = ScrapeOptions {
        max_pages: 3,
        ..options()
    };
    let result = crawl(&server, "/", &opts).await;

    assert_eq!(result.pages_fetched, 3);
    assert_eq!(result.pages.len(), 3);
}

#[tokio::test]
async fn concurrent_discovery_fetches_a_shared_link_once() {
    let server = MockServer::start().await;
    serve_html(
        &server,
        "/",
        r#"<html><body><main><h1>Root</h1>
            <a href="/a">A</a><a href="/b">B</a>
        </main></body></html>"#,
    )
    .await;
    for route in ["/a", "/b"] {
        serve_html(
            &server,
            route,
            r#"<html><body><main><h1>Mid</h1><a href="/shared">S</a></main></body></html>"#,
        )
        .await;
    }
    serve_html(
        &server,
        "/shared",
        "<html><body><main><h1>Shared</h1></main></body></html>",
    )
    .await;

    let result = crawl(&server, "/", &options()).await;

    assert_eq!(fetched_paths(&result), vec!["/", "/a", "/b", "/shared"]);
    assert_eq!(result.pages_fetched, 4);
}

#[tokio::test]
async fn fetch_failures_are_contained_per_page() {
    let server = MockServer::start().await;
    serve_html(
        &server,
        "/",
        r#"<html><body><main><h1>Root</h1>
            <a href="/ok">OK</a><a href="/missing">Missing</a>
        </main></body></html>"#,
    )
    .await;
    serve_html(
        &server,
        "/ok",
        "<html><body><main><h1>OK</h1></main></body></html>",
    )
    .await;
    // /missing has no mock and returns 404.

    let result = crawl(&server, "/", &options()).await;

    assert_eq!(result.pages_fetched, 2);
    assert_eq!(result.pages_failed, 1);

    let failed = result
        .pages
        .iter()
        .find(|p| p.url.ends_with("/missing"))
        .expect("failed page recorded");
    assert!(matches!(failed.errors[0], DocsweepError::Fetch(_)));
    assert!(failed.content.is_empty());
}

#[tokio::test]
async fn unsupported_content_type_is_recorded_not_fatal() {
    let server = MockServer::start().await;
    serve_html(
        &server,
        "/",
        r#"<html><body><main><h1>Root</h1><a href="/logo.png">Logo</a></main></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89, 0x50], "image/png"))
        .mount(&server)
        .await;

    let result = crawl(&server, "/", &options()).await;

    assert_eq!(result.pages_fetched, 2);
    assert_eq!(result.pages_failed, 0);

    let image = result
        .pages
        .iter()
        .find(|p| p.url.ends_with("/logo.png"))
        .expect("image page recorded");
    assert_eq!(
        image.errors,
        vec![DocsweepError::UnsupportedContent("image/png".into())]
    );
    assert!(image.links.is_empty());
}

#[tokio::test]
async fn exclude_patterns_prune_the_frontier() {
    let server = MockServer::start().await;
    serve_html(
        &server,
        "/docs/",
        r#"<html><body><main><h1>Root</h1>
            <a href="/docs/keep">Keep</a>
            <a href="/docs/archive/old">Old</a>
        </main></body></html>"#,
    )
    .await;
    serve_html(
        &server,
        "/docs/keep",
        "<html><body><main><h1>Keep</h1></main></body></html>",
    )
    .await;
    serve_html(
        &server,
        "/docs/archive/old",
        "<html><body><main><h1>Old</h1></main></body></html>",
    )
    .await;

    let opts = ScrapeOptions {
        exclude_patterns: vec!["/docs/archive/*".into()],
        ..options()
    };
    let result = crawl(&server, "/docs/", &opts).await;

    assert_eq!(fetched_paths(&result), vec!["/docs/", "/docs/keep"]);
    assert_eq!(result.links_skipped, 1);
}

#[tokio::test]
async fn invalid_pattern_fails_the_whole_run() {
    let server = MockServer::start().await;
    serve_html(&server, "/", "<html><body>x</body></html>").await;

    let engine = CrawlEngine::new();
    let seed = Url::parse(&server.uri()).unwrap();
    let opts = ScrapeOptions {
        include_patterns: vec!["/[unclosed/".into()],
        ..options()
    };

    let err = engine.run(&seed, &opts, &SilentProgress).await.unwrap_err();
    assert!(matches!(err, DocsweepError::InvalidPattern { .. }));
}

#[tokio::test]
async fn unreachable_seed_fails_the_whole_run() {
    let server = MockServer::start().await;
    // No mocks: the seed itself 404s.

    let engine = CrawlEngine::new();
    let seed = Url::parse(&server.uri()).unwrap();
    let err = engine
        .run(&seed, &options(), &SilentProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, DocsweepError::Fetch(_)));
}

#[tokio::test]
async fn cancellation_returns_partial_results() {
    let server = MockServer::start().await;
    serve_html(
        &server,
        "/",
        r#"<html><body><main><h1>Root</h1>
            <a href="/a">A</a><a href="/b">B</a>
        </main></body></html>"#,
    )
    .await;
    for route in ["/a", "/b"] {
        serve_html(
            &server,
            route,
            "<html><body><main><h1>Leaf</h1></main></body></html>",
        )
        .await;
    }

    struct CancelAfterFirst {
        token: tokio_util::sync::CancellationToken,
    }

    impl ProgressReporter for CancelAfterFirst {
        fn page_fetched(&self, _url: &str, completed: usize, _discovered: usize) {
            if completed == 1 {
                self.token.cancel();
            }
        }
        fn page_failed(
            &self,
            _url: &str,
            _error: &DocsweepError,
            _completed: usize,
            _discovered: usize,
        ) {
        }
    }

    let engine = CrawlEngine::new();
    let seed = Url::parse(&server.uri()).unwrap();
    let opts = ScrapeOptions {
        concurrency: 1,
        ..ScrapeOptions::default()
    };
    let progress = CancelAfterFirst {
        token: engine.cancel_token(),
    };

    let result = engine.run(&seed, &opts, &progress).await.unwrap();
    assert!(result.cancelled);
    assert_eq!(result.pages_fetched, 1);
}

#[tokio::test]
async fn page_results_carry_title_content_and_hash() {
    let server = MockServer::start().await;
    serve_html(
        &server,
        "/",
        "<html><body><main><h1>Welcome</h1><p>Hello there.</p></main></body></html>",
    )
    .await;

    let result = crawl(&server, "/", &options()).await;
    let page = &result.pages[0];

    assert_eq!(page.title.as_deref(), Some("Welcome"));
    assert!(page.content.contains("# Welcome"));
    assert!(page.content.contains("Hello there."));
    assert_eq!(page.content_hash.len(), 64);
    assert!(page.errors.is_empty());
}

// ---------------------------------------------------------------------------
// Local file trees
// ---------------------------------------------------------------------------

#[tokio::test]
async fn crawls_a_local_file_tree() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    std::fs::write(
        root.join("index.html"),
        r#"<html><body><main><h1>Local Docs</h1>
            <a href="a.md">A</a>
            <a href="b.md">B</a>
            <a href="sub/c.html">C</a>
            <a href="notes.txt">Notes</a>
        </main></body></html>"#,
    )
    .unwrap();
    std::fs::write(root.join("a.md"), "# Page A\n").unwrap();
    std::fs::write(root.join("b.md"), "# Page B\n").unwrap();
    std::fs::create_dir(root.join("sub")).unwrap();
    std::fs::write(
        root.join("sub/c.html"),
        "<html><body><main><h1>Page C</h1></main></body></html>",
    )
    .unwrap();
    std::fs::write(root.join("notes.txt"), "scratch notes\n").unwrap();

    let engine = CrawlEngine::new();
    let seed = Url::from_file_path(root.join("index.html")).unwrap();
    let opts = ScrapeOptions {
        // Basename globs work for file URLs.
        exclude_patterns: vec!["*.txt".into()],
        ..options()
    };

    let result = engine.run(&seed, &opts, &SilentProgress).await.unwrap();

    assert_eq!(result.pages_fetched, 4);
    assert_eq!(result.links_skipped, 1);

    let titles: Vec<Option<&str>> = {
        let mut pages: Vec<_> = result.pages.iter().collect();
        pages.sort_by(|a, b| a.url.cmp(&b.url));
        pages.iter().map(|p| p.title.as_deref()).collect()
    };
    assert!(titles.contains(&Some("Page A")));
    assert!(titles.contains(&Some("Page B")));
    assert!(titles.contains(&Some("Page C")));
    assert!(titles.contains(&Some("Local Docs")));
}

#[tokio::test]
async fn file_scheme_can_be_disallowed() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    std::fs::write(
        root.join("index.html"),
        r#"<html><body><main><h1>Root</h1><a href="a.md">A</a></main></body></html>"#,
    )
    .unwrap();
    std::fs::write(root.join("a.md"), "# A\n").unwrap();

    let engine = CrawlEngine::new();
    let seed = Url::from_file_path(root.join("index.html")).unwrap();
    let opts = ScrapeOptions {
        allowed_schemes: vec!["http".into(), "https".into()],
        ..options()
    };

    let result = engine.run(&seed, &opts, &SilentProgress).await.unwrap();

    // The seed is fetched, but its file: links are dropped.
    assert_eq!(result.pages_fetched, 1);
    assert_eq!(result.links_skipped, 1);
}
