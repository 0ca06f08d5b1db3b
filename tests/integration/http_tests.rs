//! End-to-end crawls of a wiremock server with the HTTP renderer

use snapcrawl::config::parse_config;
use snapcrawl::crawler::crawl;
use snapcrawl::output::{ArtifactWriter, CrawlReport};
use snapcrawl::{SnapError, UnitOutcome};
use std::fs;
use tempfile::TempDir;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html")
        .set_body_string(format!(
            r#"<html><body><div id="app" data-status="ready">{}</div></body></html>"#,
            body
        ))
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_writes_mirror_and_sitemap() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount(
        &server,
        "/",
        page(r#"<a href="/about">About</a> <a href="/people/">People</a> <a href="https://example.com/">Out</a>"#),
    )
    .await;
    mount(&server, "/about", page(r#"<a href="/">Home</a>"#)).await;
    mount(&server, "/people/", page(r#"<a href="/people/sam">Sam</a> <a href="/missing">?</a>"#)).await;
    mount(&server, "/people/sam", page("Sam")).await;
    mount(&server, "/missing", ResponseTemplate::new(404)).await;

    let dir = TempDir::new().unwrap();
    let toml = format!(
        r##"
[crawl]
base-url = "{base}"
depth = 3
ready-selector = "#app"
wait-delay = 2000
poll-interval = 50

[output]
content-dir = "{dir}/static"
sitemap = true
sitemap-dir = "{dir}"
change-frequency = "daily"
"##,
        base = base_url,
        dir = dir.path().display()
    );
    let config = parse_config(&toml).unwrap();

    let (_tx, rx) = watch::channel(false);
    let outcome = crawl(&config, rx).await.unwrap();

    assert_eq!(outcome.units.len(), 5);
    assert_eq!(outcome.captured().count(), 4);
    assert_eq!(outcome.count_outcome(UnitOutcome::OpenFailed), 1);

    let written = ArtifactWriter::new(&config).write(&outcome).unwrap();
    assert_eq!(written.content_files, 4);

    let root = dir.path().join("static");
    for file in ["index.html", "about.html", "people.html", "people/sam.html"] {
        assert!(root.join(file).exists(), "{} was not written", file);
    }
    assert!(!root.join("missing.html").exists());

    let about = fs::read_to_string(root.join("about.html")).unwrap();
    assert!(about.contains(r#"data-status="ready""#));

    let sitemap = fs::read_to_string(written.sitemap.unwrap()).unwrap();
    // Every finished page is listed, including the one that failed to open
    assert_eq!(sitemap.matches("<url>").count(), 5);
    assert!(sitemap.contains(&format!("<loc>{}/people/sam</loc>", base_url)));
    assert!(sitemap.contains(&format!("<loc>{}/missing</loc>", base_url)));
    assert!(sitemap.contains("<changefreq>daily</changefreq>"));
    assert!(!sitemap.contains("example.com"));

    let report = CrawlReport::from_outcome(&outcome, &base_url, None);
    assert_eq!(report.attempted, 5);
    assert_eq!(report.captured, 4);
    assert_eq!(report.depth_breakdown.get(&2), Some(&2));
}

#[tokio::test]
async fn test_crawl_fails_when_base_returns_error() {
    let server = MockServer::start().await;
    mount(&server, "/", ResponseTemplate::new(500)).await;

    let config = parse_config(&format!("[crawl]\nbase-url = \"{}\"\n", server.uri())).unwrap();

    let (_tx, rx) = watch::channel(false);
    let result = crawl(&config, rx).await;

    assert!(matches!(result, Err(SnapError::BaseUnreachable { .. })));
}

#[tokio::test]
async fn test_chrome_kind_without_feature() {
    if cfg!(feature = "chrome") {
        return;
    }

    let config = parse_config(
        "[crawl]\nbase-url = \"http://localhost:9000\"\n\n[renderer]\nkind = \"chrome\"\n",
    )
    .unwrap();

    let (_tx, rx) = watch::channel(false);
    let result = crawl(&config, rx).await;

    assert!(matches!(result, Err(SnapError::RendererInit(_))));
}
