//! In-memory site and renderer used by the engine tests

use async_trait::async_trait;
use parking_lot::Mutex;
use snapcrawl::config::{parse_config, Config};
use snapcrawl::render::{RenderError, Renderer, OPEN_OPERATION};
use snapcrawl::url::{normalize_url, to_absolute, RoutingMode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Parses a test configuration from the `[crawl]` table body
pub fn config(crawl_table: &str) -> Config {
    parse_config(&format!("[crawl]\n{}\n[output]\ncontent = false\n", crawl_table))
        .expect("test configuration is valid")
}

#[derive(Debug, Clone)]
pub struct MockPage {
    pub url: String,
    pub html: String,
    pub links: Vec<String>,
    pub ready: bool,
    pub open_delay: Duration,
    pub behavior: Behavior,
}

/// How a page misbehaves once it is ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Normal,
    /// Content extraction never returns
    HangOnExtract,
    /// Link extraction panics
    PanicOnLinks,
}

/// What the renderer saw during a crawl
#[derive(Debug, Default)]
pub struct MockStats {
    pub opened: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockStats {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }

    pub fn open_count(&self, url: &str) -> usize {
        self.opened.lock().iter().filter(|u| u.as_str() == url).count()
    }

    /// Most pages open at the same time
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// A site of pages keyed by canonical URL
pub struct MockSite {
    base: String,
    routing: RoutingMode,
    pages: HashMap<String, MockPage>,
}

impl MockSite {
    pub fn new(base: &str) -> Self {
        Self::with_routing(base, RoutingMode::PathBased)
    }

    pub fn with_routing(base: &str, routing: RoutingMode) -> Self {
        Self {
            base: base.to_string(),
            routing,
            pages: HashMap::new(),
        }
    }

    pub fn page(self, route: &str, links: &[&str]) -> Self {
        self.insert(route, links, true, Duration::ZERO, Behavior::Normal)
    }

    pub fn never_ready(self, route: &str, links: &[&str]) -> Self {
        self.insert(route, links, false, Duration::ZERO, Behavior::Normal)
    }

    pub fn slow(self, route: &str, links: &[&str], open_delay: Duration) -> Self {
        self.insert(route, links, true, open_delay, Behavior::Normal)
    }

    pub fn misbehaving(self, route: &str, links: &[&str], behavior: Behavior) -> Self {
        self.insert(route, links, true, Duration::ZERO, behavior)
    }

    fn insert(
        mut self,
        route: &str,
        links: &[&str],
        ready: bool,
        open_delay: Duration,
        behavior: Behavior,
    ) -> Self {
        let url = to_absolute(route, &self.base).expect("valid route");
        let key = canonical(&url, &self.routing).expect("valid route");
        let anchors: String = links
            .iter()
            .map(|href| format!("<a href=\"{}\">link</a>", href))
            .collect();

        self.pages.insert(
            key,
            MockPage {
                url,
                html: format!("<html><body><h1>{}</h1>{}</body></html>", route, anchors),
                links: links.iter().map(|l| l.to_string()).collect(),
                ready,
                open_delay,
                behavior,
            },
        );
        self
    }

    pub fn renderer(self) -> (MockRenderer, Arc<MockStats>) {
        let stats = Arc::new(MockStats::default());
        let renderer = MockRenderer {
            routing: self.routing,
            pages: self.pages,
            stats: Arc::clone(&stats),
        };
        (renderer, stats)
    }
}

fn canonical(url: &str, routing: &RoutingMode) -> Option<String> {
    normalize_url(url, routing).ok().map(|u| u.to_string())
}

pub struct MockRenderer {
    routing: RoutingMode,
    pages: HashMap<String, MockPage>,
    stats: Arc<MockStats>,
}

#[async_trait]
impl Renderer for MockRenderer {
    type Page = MockPage;

    async fn open(&self, url: &str, budget: Duration) -> Result<MockPage, RenderError> {
        self.stats.opened.lock().push(url.to_string());

        let page = canonical(url, &self.routing)
            .and_then(|key| self.pages.get(&key).cloned())
            .ok_or_else(|| RenderError::Open {
                url: url.to_string(),
                message: "connection refused".to_string(),
            })?;

        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(active, Ordering::SeqCst);

        if tokio::time::timeout(budget, tokio::time::sleep(page.open_delay))
            .await
            .is_err()
        {
            self.stats.active.fetch_sub(1, Ordering::SeqCst);
            return Err(RenderError::Timeout {
                operation: OPEN_OPERATION.to_string(),
                budget,
            });
        }

        Ok(page)
    }

    async fn probe_ready(&self, page: &mut MockPage, _selector: Option<&str>) -> Result<bool, RenderError> {
        Ok(page.ready)
    }

    async fn extract_content(&self, page: &MockPage) -> Result<String, RenderError> {
        if page.behavior == Behavior::HangOnExtract {
            std::future::pending::<()>().await;
        }
        Ok(page.html.clone())
    }

    async fn extract_links(&self, page: &MockPage) -> Result<Vec<String>, RenderError> {
        if page.behavior == Behavior::PanicOnLinks {
            panic!("link extraction crashed on {}", page.url);
        }
        Ok(page.links.clone())
    }

    async fn close(&self, _page: MockPage) {
        self.stats.active.fetch_sub(1, Ordering::SeqCst);
    }
}
