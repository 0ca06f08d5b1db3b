//! Configuration module for snapcrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use snapcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("snapcrawl.toml")).unwrap();
//! println!("Crawling {} to depth {}", config.crawl.base_url, config.crawl.depth);
//! ```

mod parser;
mod types;
mod validation;

use crate::url::RoutingMode;
use std::time::Duration;

// Re-export types
pub use types::{
    ChangeFrequency, Config, CrawlConfig, OutputConfig, RendererConfig, RendererKind,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub use validation::validate;

impl CrawlConfig {
    /// Routing mode implied by `follow-fragment` and `fragment-prefix`
    pub fn routing_mode(&self) -> RoutingMode {
        if self.follow_fragment {
            RoutingMode::FragmentBased {
                prefix: self.fragment_prefix.clone(),
            }
        } else {
            RoutingMode::PathBased
        }
    }

    pub fn wait_budget(&self) -> Duration {
        Duration::from_millis(self.wait_delay)
    }

    pub fn poll_every(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }
}

impl Config {
    /// Builds a configuration with every default and the given base URL
    ///
    /// Used by the CLI when no configuration file is given. The result is
    /// validated like a loaded file.
    pub fn with_base_url(base_url: &str) -> Result<Self, crate::ConfigError> {
        let content = format!("[crawl]\nbase-url = {}\n", toml_string(base_url));
        parse_config(&content)
    }
}

fn toml_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}
