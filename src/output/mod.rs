//! Output module for crawl artifacts and reports
//!
//! This module handles:
//! - Building and serializing the sitemap
//! - Writing the content mirror, snapshots and sitemap to disk
//! - Summarizing a finished crawl

pub mod sitemap;
pub mod stats;
mod writer;

pub use sitemap::{priority_for_depth, to_xml, SitemapBuilder, SitemapEntry};
pub use stats::{print_report, CrawlReport};
pub use writer::{ArtifactWriter, WrittenArtifacts, SITEMAP_FILE};

use crate::UrlError;
use std::path::PathBuf;
use thiserror::Error;

/// Output-specific errors
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize sitemap: {0}")]
    Xml(String),

    #[error("Cannot derive output path: {0}")]
    Path(#[from] UrlError),
}
