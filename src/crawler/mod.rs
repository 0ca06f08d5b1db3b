//! Crawler module
//!
//! This module contains the crawl engine and the entry point that picks a
//! renderer from the configuration and runs one crawl with it.

mod engine;

pub use engine::{CrawlEngine, CrawlOutcome, EngineState, Snapshot};

use crate::config::{Config, RendererKind};
use crate::render::HttpRenderer;
use crate::{Result, SnapError};
use tokio::sync::watch;

/// Runs a complete crawl with the renderer named in the configuration
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `shutdown` - Cancels the crawl when `true` is sent
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - The crawl completed
/// * `Err(SnapError)` - The renderer failed to start, the base URL was
///   unreachable or the crawl was cancelled
pub async fn crawl(config: &Config, shutdown: watch::Receiver<bool>) -> Result<CrawlOutcome> {
    match config.renderer.kind {
        RendererKind::Http => {
            let renderer = HttpRenderer::new(&config.renderer)
                .map_err(|e| SnapError::RendererInit(e.to_string()))?;
            CrawlEngine::new(config, renderer)?
                .with_shutdown(shutdown)
                .run()
                .await
        }
        RendererKind::Chrome => crawl_with_chrome(config, shutdown).await,
    }
}

#[cfg(feature = "chrome")]
async fn crawl_with_chrome(config: &Config, shutdown: watch::Receiver<bool>) -> Result<CrawlOutcome> {
    let renderer = crate::render::ChromeRenderer::launch(&config.renderer)
        .await
        .map_err(|e| SnapError::RendererInit(e.to_string()))?;
    CrawlEngine::new(config, renderer)?
        .with_shutdown(shutdown)
        .run()
        .await
}

#[cfg(not(feature = "chrome"))]
async fn crawl_with_chrome(_config: &Config, _shutdown: watch::Receiver<bool>) -> Result<CrawlOutcome> {
    Err(SnapError::RendererInit(
        "renderer kind \"chrome\" requires building with the `chrome` feature".to_string(),
    ))
}
