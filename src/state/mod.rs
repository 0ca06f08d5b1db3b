//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `UnitState`: Lifecycle of a single crawl unit (discovered, in flight, done)
//! - `UnitOutcome`: How a finished unit ended
//! - `Frontier`: Every admitted unit, keyed by canonical URL

mod frontier;
mod unit_state;

// Re-export main types
pub use frontier::{CrawlUnit, Dispatch, Frontier, FrontierCounts};
pub use unit_state::{UnitOutcome, UnitState};
