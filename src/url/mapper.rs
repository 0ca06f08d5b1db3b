//! Mapping crawled URLs to fetchable addresses and output file paths

use crate::url::normalize::{normalize_path, normalize_url};
use crate::url::route::{extract_route, split_url, RoutingMode};
use crate::UrlError;
use url::Url;

/// Resolves a discovered URL against the base URL
///
/// Absolute URLs are returned as serialized by the URL parser. Scheme-relative
/// URLs take the base's scheme. Anything else is appended to the base URL as a
/// string, with exactly one `/` between them when the URL names a path.
///
/// # Examples
///
/// ```
/// use snapcrawl::url::to_absolute;
///
/// assert_eq!(to_absolute("http://example.com", "http://localhost:9000").unwrap(), "http://example.com/");
/// assert_eq!(to_absolute("/person", "http://localhost:9000").unwrap(), "http://localhost:9000/person");
/// assert_eq!(to_absolute("#!/person", "http://localhost:9000").unwrap(), "http://localhost:9000#!/person");
/// ```
pub fn to_absolute(url: &str, base: &str) -> Result<String, UrlError> {
    let parts = split_url(url);

    if parts.scheme.is_some() {
        let parsed = Url::parse(url).map_err(|e| UrlError::Parse(e.to_string()))?;
        return Ok(parsed.to_string());
    }

    if parts.authority.is_some() {
        let base = Url::parse(base).map_err(|e| UrlError::Parse(e.to_string()))?;
        let joined = format!("{}:{}", base.scheme(), url);
        let parsed = Url::parse(&joined).map_err(|e| UrlError::Parse(e.to_string()))?;
        return Ok(parsed.to_string());
    }

    let absolute = match (base.ends_with('/'), url.starts_with('/')) {
        (true, true) => format!("{}{}", base, &url[1..]),
        (false, false) if !url.is_empty() && !url.starts_with(['?', '#']) => {
            format!("{}/{}", base, url)
        }
        _ => format!("{}{}", base, url),
    };

    Ok(absolute)
}

/// Derives the relative output path for a crawled URL
///
/// The route (path or fragment route, per the routing mode) is cleaned of dot
/// segments and repeated slashes. Routes ending in a file name pass through;
/// the base URL maps to `/index.html`; any other route gets `.html` appended in
/// place of a trailing slash. Under fragment routing a URL without a route falls
/// back to its path.
///
/// # Arguments
///
/// * `url` - The URL as discovered (absolute or relative)
/// * `base` - The crawl's base URL
/// * `routing` - The routing mode of the crawl
///
/// # Examples
///
/// ```
/// use snapcrawl::url::{to_output_path, RoutingMode};
///
/// let base = "http://localhost:9000";
/// let routing = RoutingMode::PathBased;
/// assert_eq!(to_output_path(base, base, &routing).unwrap(), "/index.html");
/// assert_eq!(to_output_path("/people/", base, &routing).unwrap(), "/people.html");
/// assert_eq!(to_output_path("/logo.png", base, &routing).unwrap(), "/logo.png");
/// ```
pub fn to_output_path(url: &str, base: &str, routing: &RoutingMode) -> Result<String, UrlError> {
    let absolute = to_absolute(url, base)?;
    let parsed = Url::parse(&absolute).map_err(|e| UrlError::Parse(e.to_string()))?;

    let mut route = extract_route(parsed.path(), parsed.fragment(), routing);
    if route.is_empty() {
        route = parsed.path();
    }
    let route = normalize_path(route);

    if has_file_name(&route) {
        return Ok(route);
    }

    if route == "/" || normalize_url(&absolute, routing)? == normalize_url(base, routing)? {
        return Ok("/index.html".to_string());
    }

    Ok(format!("{}.html", route))
}

/// Output path of the PNG snapshot for a crawled URL
pub fn to_snapshot_path(url: &str, base: &str, routing: &RoutingMode) -> Result<String, UrlError> {
    Ok(format!("{}.png", to_output_path(url, base, routing)?))
}

/// Returns true if the last segment of a cleaned route carries an extension
fn has_file_name(route: &str) -> bool {
    let segment = route.rsplit('/').next().unwrap_or("");
    match segment.rfind('.') {
        Some(dot) => dot + 1 < segment.len(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:9000";

    fn fragment_mode() -> RoutingMode {
        RoutingMode::FragmentBased {
            prefix: "!".to_string(),
        }
    }

    #[test]
    fn test_to_absolute_absolute_urls() {
        assert_eq!(to_absolute("http://example.com", BASE).unwrap(), "http://example.com/");
        assert_eq!(
            to_absolute("https://localhost:9000/a?b=1", BASE).unwrap(),
            "https://localhost:9000/a?b=1"
        );
    }

    #[test]
    fn test_to_absolute_relative_urls() {
        assert_eq!(to_absolute("/person", BASE).unwrap(), "http://localhost:9000/person");
        assert_eq!(to_absolute("person", BASE).unwrap(), "http://localhost:9000/person");
        assert_eq!(
            to_absolute("/person", "http://localhost:9000/").unwrap(),
            "http://localhost:9000/person"
        );
        assert_eq!(to_absolute("?page=2", BASE).unwrap(), "http://localhost:9000?page=2");
        assert_eq!(to_absolute("", BASE).unwrap(), BASE);
    }

    #[test]
    fn test_to_absolute_scheme_relative() {
        assert_eq!(
            to_absolute("//example.com/x", "https://localhost:9000").unwrap(),
            "https://example.com/x"
        );
    }

    #[test]
    fn test_to_absolute_malformed() {
        assert!(to_absolute("http://", BASE).is_err());
    }

    #[test]
    fn test_output_path_base_is_index() {
        let routing = RoutingMode::PathBased;
        assert_eq!(to_output_path(BASE, BASE, &routing).unwrap(), "/index.html");
        assert_eq!(to_output_path("http://localhost:9000/", BASE, &routing).unwrap(), "/index.html");
    }

    #[test]
    fn test_output_path_base_with_path_is_index() {
        let base = "http://localhost:9000/app";
        let routing = RoutingMode::PathBased;
        assert_eq!(to_output_path(base, base, &routing).unwrap(), "/index.html");
        assert_eq!(to_output_path("about", base, &routing).unwrap(), "/app/about.html");
    }

    #[test]
    fn test_output_path_pages() {
        let routing = RoutingMode::PathBased;
        assert_eq!(to_output_path("/about", BASE, &routing).unwrap(), "/about.html");
        assert_eq!(to_output_path("/people/", BASE, &routing).unwrap(), "/people.html");
        assert_eq!(to_output_path("/people/me", BASE, &routing).unwrap(), "/people/me.html");
        assert_eq!(
            to_output_path("http://localhost:9000/a/./b//c", BASE, &routing).unwrap(),
            "/a/b/c.html"
        );
    }

    #[test]
    fn test_output_path_file_passthrough() {
        let routing = RoutingMode::PathBased;
        assert_eq!(to_output_path("/logo.png", BASE, &routing).unwrap(), "/logo.png");
        assert_eq!(to_output_path("/docs/guide.pdf", BASE, &routing).unwrap(), "/docs/guide.pdf");
    }

    #[test]
    fn test_output_path_fragment_mode() {
        let routing = fragment_mode();
        assert_eq!(to_output_path("#!/people", BASE, &routing).unwrap(), "/people.html");
        assert_eq!(to_output_path("#!/people/sam/", BASE, &routing).unwrap(), "/people/sam.html");
        assert_eq!(to_output_path(BASE, BASE, &routing).unwrap(), "/index.html");
        assert_eq!(to_output_path("#!/", BASE, &routing).unwrap(), "/index.html");
    }

    #[test]
    fn test_output_path_fragment_mode_without_route() {
        let routing = fragment_mode();
        assert_eq!(to_output_path("/legal", BASE, &routing).unwrap(), "/legal.html");
    }

    #[test]
    fn test_snapshot_path() {
        let routing = RoutingMode::PathBased;
        assert_eq!(to_snapshot_path("/about", BASE, &routing).unwrap(), "/about.html.png");
        assert_eq!(to_snapshot_path(BASE, BASE, &routing).unwrap(), "/index.html.png");
    }
}
