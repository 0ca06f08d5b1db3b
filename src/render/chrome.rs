//! Headless Chromium renderer
//!
//! Drives a browser over CDP with chromiumoxide. Readiness and link discovery
//! only read the DOM; no page state is modified.

use crate::config::RendererConfig;
use crate::render::{with_budget, RenderError, Renderer, OPEN_OPERATION, READY_ATTRIBUTE, READY_VALUE};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const LINKS_SCRIPT: &str =
    "Array.from(document.querySelectorAll('a[href]')).map(function (a) { return a.getAttribute('href'); })";

const BLANK_PAGE: &str = "about:blank";

const CONTENT_SCRIPT: &str =
    "document.documentElement ? document.documentElement.outerHTML : ''";

/// Renderer backed by a headless Chromium instance
pub struct ChromeRenderer {
    browser: Mutex<Option<Browser>>,
    handler: JoinHandle<()>,
}

impl ChromeRenderer {
    /// Launches the browser
    ///
    /// Uses the executable named by `CHROMIUM_PATH` when set, otherwise lets
    /// chromiumoxide locate one.
    pub async fn launch(config: &RendererConfig) -> Result<Self, RenderError> {
        let viewport = Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            ..Viewport::default()
        };

        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(viewport)
            .no_sandbox();

        if let Ok(path) = std::env::var("CHROMIUM_PATH") {
            builder = builder.chrome_executable(PathBuf::from(path));
        }

        let browser_config = builder
            .build()
            .map_err(|e| RenderError::Launch(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler error: {}", e);
                }
            }
            tracing::debug!("Browser handler finished");
        });

        tracing::info!(
            "Launched headless browser ({}x{})",
            config.viewport_width,
            config.viewport_height
        );

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler,
        })
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    type Page = Page;

    async fn open(&self, url: &str, budget: Duration) -> Result<Page, RenderError> {
        let deadline = Instant::now() + budget;
        let open_error = |message: String| RenderError::Open {
            url: url.to_string(),
            message,
        };

        // A blank tab first, so navigation can be abandoned with a page handle in hand
        let page = with_budget(
            async {
                let guard = self.browser.lock().await;
                match guard.as_ref() {
                    Some(browser) => browser
                        .new_page(BLANK_PAGE)
                        .await
                        .map_err(|e| open_error(e.to_string())),
                    None => Err(open_error("browser has shut down".to_string())),
                }
            },
            budget,
            OPEN_OPERATION,
        )
        .await?;

        let navigated = with_budget(
            async {
                page.goto(url).await.map_err(|e| open_error(e.to_string()))?;
                page.wait_for_navigation()
                    .await
                    .map_err(|e| open_error(e.to_string()))?;
                Ok::<(), RenderError>(())
            },
            deadline.saturating_duration_since(Instant::now()),
            OPEN_OPERATION,
        )
        .await;

        if let Err(e) = navigated {
            if let Err(close_error) = page.close().await {
                tracing::debug!("Failed to close abandoned page for {}: {}", url, close_error);
            }
            return Err(e);
        }

        Ok(page)
    }

    async fn probe_ready(&self, page: &mut Page, selector: Option<&str>) -> Result<bool, RenderError> {
        let Some(selector) = selector else {
            return Ok(true);
        };

        // A missing element is not an error, the view may not be mounted yet
        let element = match page.find_element(selector).await {
            Ok(element) => element,
            Err(_) => return Ok(false),
        };

        let status = element
            .attribute(READY_ATTRIBUTE)
            .await
            .map_err(|e| RenderError::Script(e.to_string()))?;

        Ok(status.as_deref() == Some(READY_VALUE))
    }

    async fn extract_content(&self, page: &Page) -> Result<String, RenderError> {
        page.evaluate(CONTENT_SCRIPT)
            .await
            .map_err(|e| RenderError::Extract(e.to_string()))?
            .into_value::<String>()
            .map_err(|e| RenderError::Extract(e.to_string()))
    }

    async fn extract_links(&self, page: &Page) -> Result<Vec<String>, RenderError> {
        let hrefs = page
            .evaluate(LINKS_SCRIPT)
            .await
            .map_err(|e| RenderError::Script(e.to_string()))?
            .into_value::<Vec<Option<String>>>()
            .map_err(|e| RenderError::Script(e.to_string()))?;

        Ok(hrefs
            .into_iter()
            .flatten()
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
            .collect())
    }

    async fn capture_snapshot(&self, page: &Page) -> Result<Option<Vec<u8>>, RenderError> {
        let params = CaptureScreenshotParams {
            format: Some(CaptureScreenshotFormat::Png),
            capture_beyond_viewport: Some(true),
            ..Default::default()
        };

        page.screenshot(params)
            .await
            .map(Some)
            .map_err(|e| RenderError::Snapshot(e.to_string()))
    }

    async fn close(&self, page: Page) {
        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close page: {}", e);
        }
    }

    async fn shutdown(&self) {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!("Failed to close browser: {}", e);
            }
            let _ = browser.wait().await;
        }
        self.handler.abort();
    }
}
