//! snapcrawl: a snapshot crawler for web applications
//!
//! This crate crawls a web application from a base URL, follows same-origin links
//! (including `#!/route` style fragment routes used by single-page applications),
//! captures the fully rendered HTML of every page and emits a static content mirror
//! together with a sitemap document.

pub mod config;
pub mod crawler;
pub mod output;
pub mod render;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for snapcrawl operations
#[derive(Debug, Error)]
pub enum SnapError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Renderer failed to initialize: {0}")]
    RendererInit(String),

    #[error("Base URL {url} could not be opened: {source}")]
    BaseUnreachable {
        url: String,
        source: render::RenderError,
    },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Invalid state transition for {url}: {from} -> {to}")]
    InvalidTransition {
        url: String,
        from: state::UnitState,
        to: state::UnitState,
    },

    #[error("Fetch task for {url} failed: {message}")]
    TaskFailed { url: String, message: String },

    #[error("Crawl stopped with unfinished units ({in_flight} in flight, {discovered} waiting)")]
    Incomplete { in_flight: usize, discovered: usize },

    #[error("Unknown crawl unit: {0}")]
    UnknownUnit(String),

    #[error("Crawl was cancelled")]
    Cancelled,

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid exclude pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for snapcrawl operations
pub type Result<T> = std::result::Result<T, SnapError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, CrawlOutcome, EngineState};
pub use state::{CrawlUnit, Frontier, UnitOutcome, UnitState};
pub use url::{Classification, RejectReason, RoutingMode, UrlClassifier};
