//! Static HTML inspection for renderers that work on fetched markup
//!
//! `scraper::Html` is not `Send`, so every helper parses and drops the document
//! synchronously; none of them can be held across an await point.

use crate::render::RenderError;
use scraper::{Html, Selector};

/// Attribute a page sets on its ready-selector element once rendering is done
pub const READY_ATTRIBUTE: &str = "data-status";

/// Value of [`READY_ATTRIBUTE`] that marks the page ready
pub const READY_VALUE: &str = "ready";

/// Returns the literal `href` of every `<a>` element, in document order
///
/// Hrefs are not resolved, trimmed of whitespace only. Empty hrefs are
/// skipped; everything else is left for the classifier to judge.
///
/// # Example
///
/// ```
/// use snapcrawl::render::extract_hrefs;
///
/// let html = r#"<a href="/people">People</a><a href="http://example.com">Out</a><a>none</a>"#;
/// assert_eq!(extract_hrefs(html), vec!["/people", "http://example.com"]);
/// ```
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                let href = href.trim();
                if !href.is_empty() {
                    links.push(href.to_string());
                }
            }
        }
    }

    links
}

/// Checks whether the first element matching `selector` is marked ready
///
/// # Arguments
///
/// * `html` - The page markup
/// * `selector` - CSS selector of the element carrying `data-status`
///
/// # Returns
///
/// * `Ok(true)` - The element exists and has `data-status="ready"`
/// * `Ok(false)` - No such element, or it is not ready yet
/// * `Err(RenderError::Selector)` - The selector does not parse
pub fn is_ready(html: &str, selector: &str) -> Result<bool, RenderError> {
    let selector =
        Selector::parse(selector).map_err(|_| RenderError::Selector(selector.to_string()))?;
    let document = Html::parse_document(html);

    let ready = document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr(READY_ATTRIBUTE))
        .map_or(false, |status| status == READY_VALUE);

    Ok(ready)
}
