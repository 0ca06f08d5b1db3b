//! Crawl report
//!
//! Summarizes a finished crawl: how many pages were attempted, captured and
//! lost, how deep the crawl went and what was written.

use crate::crawler::CrawlOutcome;
use crate::output::WrittenArtifacts;
use crate::state::UnitOutcome;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

/// Crawl report summary
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub base_url: String,

    /// SHA-256 of the configuration file, when the crawl was configured by file
    pub config_hash: Option<String>,

    pub started_at: DateTime<Utc>,
    pub duration: Duration,

    /// Units fetched (every unit that reached Done)
    pub attempted: usize,
    pub captured: usize,
    pub open_failed: usize,
    pub timed_out: usize,
    pub extract_failed: usize,
    pub task_failed: usize,

    /// Units per depth
    pub depth_breakdown: BTreeMap<u32, usize>,

    pub artifacts: Option<WrittenArtifacts>,
}

impl CrawlReport {
    /// Builds the report of a finished crawl
    ///
    /// # Arguments
    ///
    /// * `outcome` - The finished crawl
    /// * `base_url` - Base URL of the crawl
    /// * `config_hash` - Hash of the configuration file, if any
    pub fn from_outcome(outcome: &CrawlOutcome, base_url: &str, config_hash: Option<String>) -> Self {
        let mut depth_breakdown = BTreeMap::new();
        for unit in &outcome.units {
            *depth_breakdown.entry(unit.depth).or_insert(0) += 1;
        }

        Self {
            base_url: base_url.to_string(),
            config_hash,
            started_at: outcome.started_at,
            duration: outcome.duration,
            attempted: outcome.counts.done,
            captured: outcome.count_outcome(UnitOutcome::Captured),
            open_failed: outcome.count_outcome(UnitOutcome::OpenFailed),
            timed_out: outcome.count_outcome(UnitOutcome::TimedOut),
            extract_failed: outcome.count_outcome(UnitOutcome::ExtractFailed),
            task_failed: outcome.count_outcome(UnitOutcome::TaskFailed),
            depth_breakdown,
            artifacts: None,
        }
    }

    pub fn with_artifacts(mut self, artifacts: WrittenArtifacts) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    pub fn failed(&self) -> usize {
        self.open_failed + self.timed_out + self.extract_failed + self.task_failed
    }

    /// Percentage of attempted pages that were captured
    pub fn success_rate(&self) -> f64 {
        if self.attempted > 0 {
            (self.captured as f64 / self.attempted as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Logs the report as a single structured event
    pub fn log(&self) {
        tracing::info!(
            base_url = %self.base_url,
            attempted = self.attempted,
            captured = self.captured,
            failed = self.failed(),
            timed_out = self.timed_out,
            duration_secs = self.duration.as_secs_f64(),
            "Crawl report"
        );
    }
}

/// Prints the report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("Overview:");
    println!("  Base URL: {}", report.base_url);
    println!("  Started: {}", report.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Duration: {:.2}s", report.duration.as_secs_f64());
    if let Some(hash) = &report.config_hash {
        println!("  Config hash: {}", hash);
    }
    println!();

    println!("Pages:");
    println!("  Attempted: {}", report.attempted);
    println!("  Captured: {}", report.captured);
    println!("  Failed to open: {}", report.open_failed);
    println!("  Timed out: {}", report.timed_out);
    println!("  Extraction failed: {}", report.extract_failed);
    println!("  Task failures: {}", report.task_failed);
    println!();

    if !report.depth_breakdown.is_empty() {
        println!("Pages by Depth:");
        for (depth, count) in &report.depth_breakdown {
            println!("  {}: {}", depth, count);
        }
        println!();
    }

    if let Some(artifacts) = &report.artifacts {
        println!("Artifacts:");
        println!("  Content files: {}", artifacts.content_files);
        println!("  Snapshots: {}", artifacts.snapshot_files);
        if artifacts.collisions > 0 {
            println!("  Overwritten output paths: {}", artifacts.collisions);
        }
        if let Some(sitemap) = &artifacts.sitemap {
            println!("  Sitemap: {}", sitemap.display());
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages captured)",
        report.success_rate(),
        report.captured,
        report.attempted
    );
}
