use crate::url::route::{extract_route, RoutingMode};
use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Normalizes an absolute URL into the canonical form used as a dedup key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an http or https scheme and a host
/// 3. Lowercase the host and drop the scheme's default port
/// 4. Normalize path:
///    - Remove dot segments (. and ..) and repeated slashes
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove tracking query parameters and sort the rest
/// 6. Fragment:
///    - path routing: removed
///    - fragment routing: kept as `<prefix><route>` with the route normalized
///      like a path, removed when the route is empty or the root route
///
/// # Arguments
///
/// * `url_str` - The absolute URL string to normalize
/// * `routing` - The routing mode of the crawl
///
/// # Examples
///
/// ```
/// use snapcrawl::url::{normalize_url, RoutingMode};
///
/// let url = normalize_url("http://LOCALHOST:80/people/", &RoutingMode::PathBased).unwrap();
/// assert_eq!(url.as_str(), "http://localhost/people");
/// ```
pub fn normalize_url(url_str: &str, routing: &RoutingMode) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    // The url crate lowercases special-scheme hosts and strips default ports
    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    let fragment = canonical_fragment(url.path(), url.fragment(), routing);
    url.set_fragment(fragment.as_deref());

    Ok(url)
}

/// Canonical fragment of a URL under the routing mode
fn canonical_fragment(path: &str, fragment: Option<&str>, routing: &RoutingMode) -> Option<String> {
    let prefix = routing.prefix()?;
    fragment?.strip_prefix(prefix)?;

    let route = extract_route(path, fragment, routing);
    if route.is_empty() {
        return None;
    }

    let route = normalize_path(route);
    if route == "/" {
        None
    } else {
        Some(format!("{}{}", prefix, route))
    }
}

/// Normalizes a URL path by removing dot segments and trailing slashes
pub(crate) fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    // Joining without a trailing separator drops any trailing slash
    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
