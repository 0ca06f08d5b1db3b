//! URL handling module for snapcrawl
//!
//! This module splits discovered links into their components, computes the
//! canonical form used for deduplication, classifies links against the crawl's
//! base URL and maps crawled URLs to fetchable addresses and output paths.

mod classify;
mod mapper;
mod normalize;
mod route;

// Re-export main types and functions
pub use classify::{Classification, RejectReason, UrlClassifier};
pub use mapper::{to_absolute, to_output_path, to_snapshot_path};
pub use normalize::normalize_url;
pub use route::{extract_route, split_url, RoutingMode, UrlParts};
