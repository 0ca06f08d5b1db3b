//! Sitemap generation
//!
//! Builds one entry per finished unit, in discovery order, and serializes the
//! entries as a sitemaps.org `urlset` document.

use crate::config::ChangeFrequency;
use crate::output::OutputError;
use crate::state::{CrawlUnit, UnitState};
use crate::url::to_absolute;
use chrono::NaiveDate;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Namespace of the sitemap protocol
pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// One `<url>` element of the sitemap
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    /// Absolute URL of the page
    pub location: String,
    pub last_modified: NaiveDate,
    /// In `[0.1, 1.0]`, one decimal
    pub priority: f64,
    pub change_frequency: ChangeFrequency,
}

/// Priority of a page at the given depth
///
/// `1 / depth`, rounded half-up to one decimal and clamped to `[0.1, 1.0]`.
/// The base URL (depth 0) counts as depth 1.
///
/// # Examples
///
/// ```
/// use snapcrawl::output::priority_for_depth;
///
/// assert_eq!(priority_for_depth(1), 1.0);
/// assert_eq!(priority_for_depth(2), 0.5);
/// assert_eq!(priority_for_depth(3), 0.3);
/// ```
pub fn priority_for_depth(depth: u32) -> f64 {
    let depth = depth.max(1) as f64;
    let tenths = (10.0 / depth + 0.5).floor().clamp(1.0, 10.0);
    tenths / 10.0
}

/// Builds sitemap entries from crawl units
#[derive(Debug, Clone)]
pub struct SitemapBuilder {
    base_url: String,
    change_frequency: ChangeFrequency,
    last_modified: NaiveDate,
}

impl SitemapBuilder {
    /// Creates a builder
    ///
    /// # Arguments
    ///
    /// * `base_url` - Relative unit URLs are resolved against it
    /// * `change_frequency` - `changefreq` of every entry
    /// * `last_modified` - `lastmod` of every entry, normally the crawl date
    pub fn new(base_url: &str, change_frequency: ChangeFrequency, last_modified: NaiveDate) -> Self {
        Self {
            base_url: base_url.to_string(),
            change_frequency,
            last_modified,
        }
    }

    /// One entry per Done unit, in discovery order
    ///
    /// Units that timed out or failed are still listed; only rejected links,
    /// which never became units, are absent.
    pub fn build(&self, units: &[CrawlUnit]) -> Result<Vec<SitemapEntry>, OutputError> {
        let mut done: Vec<&CrawlUnit> = units
            .iter()
            .filter(|unit| unit.state == UnitState::Done)
            .collect();
        done.sort_by_key(|unit| unit.order);

        done
            .into_iter()
            .map(|unit| -> Result<SitemapEntry, OutputError> {
                Ok(SitemapEntry {
                    location: to_absolute(&unit.url, &self.base_url)?,
                    last_modified: self.last_modified,
                    priority: priority_for_depth(unit.depth),
                    change_frequency: self.change_frequency,
                })
            })
            .collect()
    }
}

/// Serializes entries as a sitemap XML document
pub fn to_xml(entries: &[SitemapEntry]) -> Result<String, OutputError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    write_event(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_event(
        &mut writer,
        Event::Start(BytesStart::new("urlset").with_attributes([("xmlns", SITEMAP_NAMESPACE)])),
    )?;

    for entry in entries {
        let last_modified = entry.last_modified.format("%Y-%m-%d").to_string();
        let priority = format!("{:.1}", entry.priority);

        write_event(&mut writer, Event::Start(BytesStart::new("url")))?;
        write_text_element(&mut writer, "loc", &entry.location)?;
        write_text_element(&mut writer, "lastmod", &last_modified)?;
        write_text_element(&mut writer, "priority", &priority)?;
        write_text_element(&mut writer, "changefreq", entry.change_frequency.as_str())?;
        write_event(&mut writer, Event::End(BytesEnd::new("url")))?;
    }

    write_event(&mut writer, Event::End(BytesEnd::new("urlset")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| OutputError::Xml(e.to_string()))
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), OutputError> {
    write_event(writer, Event::Start(BytesStart::new(name)))?;
    write_event(writer, Event::Text(BytesText::new(text)))?;
    write_event(writer, Event::End(BytesEnd::new(name)))
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), OutputError> {
    writer
        .write_event(event)
        .map_err(|e| OutputError::Xml(e.to_string()))
}
