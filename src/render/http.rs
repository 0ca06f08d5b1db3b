//! HTTP renderer
//!
//! Fetches pages with reqwest and inspects the returned markup with scraper.
//! No script runs, so readiness is re-checked by fetching the page again.

use crate::config::RendererConfig;
use crate::render::html::{extract_hrefs, is_ready};
use crate::render::{with_budget, RenderError, Renderer, OPEN_OPERATION};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// A fetched page
#[derive(Debug, Clone)]
pub struct HttpPage {
    url: String,
    html: String,
}

impl HttpPage {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

/// Renderer backed by plain HTTP requests
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    /// Builds the HTTP client
    ///
    /// # Returns
    ///
    /// * `Ok(HttpRenderer)` - Ready to fetch
    /// * `Err(RenderError::Launch)` - The client could not be built
    pub fn new(config: &RendererConfig) -> Result<Self, RenderError> {
        let user_agent = format!("snapcrawl/{}", env!("CARGO_PKG_VERSION"));

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(config.request_timeout))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| RenderError::Launch(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<String, RenderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RenderError::Open {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| RenderError::Open {
            url: url.to_string(),
            message: format!("Failed to read body: {}", e),
        })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    type Page = HttpPage;

    async fn open(&self, url: &str, budget: Duration) -> Result<HttpPage, RenderError> {
        let html = with_budget(self.fetch(url), budget, OPEN_OPERATION).await?;
        tracing::trace!("Fetched {} ({} bytes)", url, html.len());

        Ok(HttpPage {
            url: url.to_string(),
            html,
        })
    }

    async fn probe_ready(
        &self,
        page: &mut HttpPage,
        selector: Option<&str>,
    ) -> Result<bool, RenderError> {
        let Some(selector) = selector else {
            return Ok(true);
        };

        if is_ready(&page.html, selector)? {
            return Ok(true);
        }

        page.html = self.fetch(&page.url).await?;
        is_ready(&page.html, selector)
    }

    async fn extract_content(&self, page: &HttpPage) -> Result<String, RenderError> {
        Ok(page.html.clone())
    }

    async fn extract_links(&self, page: &HttpPage) -> Result<Vec<String>, RenderError> {
        Ok(extract_hrefs(&page.html))
    }

    async fn close(&self, page: HttpPage) {
        tracing::trace!("Closed {}", page.url);
    }
}
