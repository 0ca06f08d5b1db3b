//! Writes crawl artifacts to disk
//!
//! Artifacts are only written for a completed crawl: the content mirror, PNG
//! snapshots and `sitemap.xml`, each when enabled in the output configuration.

use crate::config::{Config, OutputConfig};
use crate::crawler::CrawlOutcome;
use crate::output::sitemap::{to_xml, SitemapBuilder};
use crate::output::OutputError;
use crate::url::{to_output_path, to_snapshot_path, RoutingMode};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the sitemap inside the sitemap directory
pub const SITEMAP_FILE: &str = "sitemap.xml";

/// What was written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenArtifacts {
    pub content_files: usize,
    pub snapshot_files: usize,
    /// Content files written more than once, by units that map to the same path
    pub collisions: usize,
    pub sitemap: Option<PathBuf>,
}

/// Writes the artifacts of a crawl
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output: OutputConfig,
    base_url: String,
    routing: RoutingMode,
}

impl ArtifactWriter {
    pub fn new(config: &Config) -> Self {
        Self {
            output: config.output.clone(),
            base_url: config.crawl.base_url.clone(),
            routing: config.crawl.routing_mode(),
        }
    }

    /// Writes every enabled artifact
    ///
    /// # Returns
    ///
    /// * `Ok(WrittenArtifacts)` - Counts of written files and the sitemap path
    /// * `Err(OutputError)` - A file could not be written
    pub fn write(&self, outcome: &CrawlOutcome) -> Result<WrittenArtifacts, OutputError> {
        let mut written = WrittenArtifacts::default();

        if self.output.content {
            let (files, collisions) = self.write_content(outcome)?;
            written.content_files = files;
            written.collisions = collisions;
        }

        if self.output.render {
            written.snapshot_files = self.write_snapshots(outcome)?;
        }

        if self.output.sitemap {
            written.sitemap = Some(self.write_sitemap(outcome)?);
        }

        Ok(written)
    }

    /// Returns the number of distinct files written and the number of overwrites
    fn write_content(&self, outcome: &CrawlOutcome) -> Result<(usize, usize), OutputError> {
        let root = Path::new(&self.output.content_dir);
        let mut owners: HashMap<PathBuf, &str> = HashMap::new();
        let mut collisions = 0;

        for unit in outcome.captured() {
            let Some(content) = &unit.content else {
                continue;
            };

            let relative = to_output_path(&unit.url, &self.base_url, &self.routing)?;
            let path = join_relative(root, &relative);

            if let Some(previous) = owners.insert(path.clone(), &unit.url) {
                tracing::warn!(
                    "{} and {} both map to {}; keeping the later page",
                    previous,
                    unit.url,
                    path.display()
                );
                collisions += 1;
            }

            write_file(&path, content.as_bytes())?;
            tracing::debug!("Wrote {}", path.display());
        }

        tracing::info!("Wrote {} pages to {}", owners.len(), root.display());
        Ok((owners.len(), collisions))
    }

    fn write_snapshots(&self, outcome: &CrawlOutcome) -> Result<usize, OutputError> {
        let root = Path::new(&self.output.render_dir);

        for snapshot in &outcome.snapshots {
            let relative = to_snapshot_path(&snapshot.url, &self.base_url, &self.routing)?;
            let path = join_relative(root, &relative);
            write_file(&path, &snapshot.png)?;
        }

        if !outcome.snapshots.is_empty() {
            tracing::info!(
                "Wrote {} snapshots to {}",
                outcome.snapshots.len(),
                root.display()
            );
        }

        Ok(outcome.snapshots.len())
    }

    fn write_sitemap(&self, outcome: &CrawlOutcome) -> Result<PathBuf, OutputError> {
        let builder = SitemapBuilder::new(
            &self.base_url,
            self.output.change_frequency,
            outcome.started_at.date_naive(),
        );
        let entries = builder.build(&outcome.units)?;
        let xml = to_xml(&entries)?;

        let path = Path::new(&self.output.sitemap_dir).join(SITEMAP_FILE);
        write_file(&path, xml.as_bytes())?;

        tracing::info!("Wrote sitemap with {} entries to {}", entries.len(), path.display());
        Ok(path)
    }
}

/// Joins an output path (always starting with `/`) under a root directory
fn join_relative(root: &Path, relative: &str) -> PathBuf {
    root.join(relative.trim_start_matches('/'))
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), OutputError> {
    let to_error = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(to_error)?;
    }
    fs::write(path, contents).map_err(to_error)
}
