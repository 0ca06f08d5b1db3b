//! Renderer adapters
//!
//! A renderer loads a URL, reports when the page is ready for capture and
//! hands back the page's HTML, links and optionally a snapshot image.
//!
//! # Components
//!
//! - `Renderer`: The adapter trait the crawl engine drives
//! - `HttpRenderer`: Plain HTTP fetch with static HTML parsing
//! - `ChromeRenderer`: Headless Chromium (feature `chrome`)

#[cfg(feature = "chrome")]
mod chrome;
mod html;
mod http;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "chrome")]
pub use chrome::ChromeRenderer;
pub use html::{extract_hrefs, is_ready, READY_ATTRIBUTE, READY_VALUE};
pub use http::{HttpPage, HttpRenderer};

/// Operation name of timeouts raised while opening a page
pub const OPEN_OPERATION: &str = "open";

/// Renderer-specific errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to launch renderer: {0}")]
    Launch(String),

    #[error("Failed to open {url}: {message}")]
    Open { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{operation} timed out after {budget:?}")]
    Timeout {
        operation: String,
        budget: Duration,
    },

    #[error("Invalid ready selector '{0}'")]
    Selector(String),

    #[error("Page script failed: {0}")]
    Script(String),

    #[error("Failed to extract content: {0}")]
    Extract(String),

    #[error("Failed to capture snapshot: {0}")]
    Snapshot(String),

    #[error("Render task aborted: {0}")]
    Aborted(String),
}

impl RenderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result of waiting for a page to become ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

/// Adapter between the crawl engine and a page-rendering backend
///
/// Pages are opened, probed, read and closed through the renderer that opened
/// them. Implementations must be shareable across fetch tasks.
#[async_trait]
pub trait Renderer: Send + Sync + 'static {
    /// An open page
    type Page: Send + Sync + 'static;

    /// Opens an absolute URL
    ///
    /// Gives up once `budget` has elapsed, releasing anything created so far,
    /// and returns `RenderError::Timeout` for [`OPEN_OPERATION`].
    async fn open(&self, url: &str, budget: Duration) -> Result<Self::Page, RenderError>;

    /// Checks once whether the page is ready for capture
    ///
    /// With a selector, the page is ready when the first element matching it
    /// carries `data-status="ready"`. Without one, the page is ready as soon as
    /// it has loaded.
    async fn probe_ready(
        &self,
        page: &mut Self::Page,
        selector: Option<&str>,
    ) -> Result<bool, RenderError>;

    /// Probes readiness every `interval` until the page is ready or `budget` runs out
    ///
    /// A failing probe counts as not ready. Without a selector the page is
    /// ready immediately.
    async fn wait_until_ready(
        &self,
        page: &mut Self::Page,
        selector: Option<&str>,
        budget: Duration,
        interval: Duration,
    ) -> Readiness {
        if selector.is_none() {
            return Readiness::Ready;
        }

        let poll = async {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match self.probe_ready(page, selector).await {
                    Ok(true) => return Readiness::Ready,
                    Ok(false) => {}
                    Err(e) => tracing::debug!("Readiness probe failed: {}", e),
                }
            }
        };

        match tokio::time::timeout(budget, poll).await {
            Ok(readiness) => readiness,
            Err(_) => Readiness::TimedOut,
        }
    }

    /// Returns the page's serialized HTML
    async fn extract_content(&self, page: &Self::Page) -> Result<String, RenderError>;

    /// Returns the literal `href` of every anchor on the page
    async fn extract_links(&self, page: &Self::Page) -> Result<Vec<String>, RenderError>;

    /// Captures a PNG image of the page, if the backend can
    async fn capture_snapshot(&self, _page: &Self::Page) -> Result<Option<Vec<u8>>, RenderError> {
        Ok(None)
    }

    /// Closes a page, releasing its resources
    async fn close(&self, page: Self::Page);

    /// Closes every open page and shuts the backend down
    async fn shutdown(&self) {}
}

/// Runs a renderer operation under a time budget
///
/// # Arguments
///
/// * `operation` - The future to run
/// * `budget` - Maximum time the operation may take
/// * `operation_name` - Name used in the timeout error
///
/// # Returns
///
/// * `Ok(T)` - The operation completed within the budget
/// * `Err(RenderError)` - The operation failed, or `RenderError::Timeout`
pub async fn with_budget<F, T>(
    operation: F,
    budget: Duration,
    operation_name: &str,
) -> Result<T, RenderError>
where
    F: Future<Output = Result<T, RenderError>>,
{
    match tokio::time::timeout(budget, operation).await {
        Ok(result) => result,
        Err(_) => Err(RenderError::Timeout {
            operation: operation_name.to_string(),
            budget,
        }),
    }
}
