//! Splitting discovered hrefs into their components and extracting routes

/// Which part of a URL addresses a logical page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoutingMode {
    /// Pages are addressed by the URL path
    PathBased,
    /// Pages are addressed by a `#<prefix>/route` fragment
    FragmentBased { prefix: String },
}

impl RoutingMode {
    /// Returns the fragment prefix under fragment routing
    pub fn prefix(&self) -> Option<&str> {
        match self {
            Self::PathBased => None,
            Self::FragmentBased { prefix } => Some(prefix.as_str()),
        }
    }

    /// Returns the fragment that addresses the root route (`!/` for prefix `!`)
    pub fn root_fragment(&self) -> Option<String> {
        self.prefix().map(|prefix| format!("{}/", prefix))
    }
}

/// Components of a URL reference as written in a document
///
/// Nothing is decoded or validated; every component borrows from the input.
/// A reference is relative when it carries neither a scheme nor an authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlParts<'a> {
    pub scheme: Option<&'a str>,
    pub authority: Option<&'a str>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

impl<'a> UrlParts<'a> {
    pub fn is_relative(&self) -> bool {
        self.scheme.is_none() && self.authority.is_none()
    }

    /// Returns the logical route of this reference under the given routing mode
    pub fn route(&self, routing: &RoutingMode) -> &'a str {
        extract_route(self.path, self.fragment, routing)
    }
}

/// Splits a URL reference into scheme, authority, path, query and fragment
///
/// # Examples
///
/// ```
/// use snapcrawl::url::split_url;
///
/// let parts = split_url("/people?page=2#!/sam");
/// assert!(parts.is_relative());
/// assert_eq!(parts.path, "/people");
/// assert_eq!(parts.query, Some("page=2"));
/// assert_eq!(parts.fragment, Some("!/sam"));
/// ```
pub fn split_url(candidate: &str) -> UrlParts<'_> {
    let (rest, fragment) = match candidate.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (candidate, None),
    };

    let (rest, query) = match rest.split_once('?') {
        Some((rest, query)) => (rest, Some(query)),
        None => (rest, None),
    };

    let (scheme, rest) = match scheme_end(rest) {
        Some(colon) => (Some(&rest[..colon]), &rest[colon + 1..]),
        None => (None, rest),
    };

    let (authority, path) = match rest.strip_prefix("//") {
        Some(after) => match after.find('/') {
            Some(slash) => (Some(&after[..slash]), &after[slash..]),
            None => (Some(after), ""),
        },
        None => (None, rest),
    };

    UrlParts {
        scheme,
        authority,
        path,
        query,
        fragment,
    }
}

/// Position of the `:` terminating a scheme, if the input starts with one
fn scheme_end(input: &str) -> Option<usize> {
    let colon = input.find(':')?;
    let scheme = &input[..colon];

    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }

    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(colon)
    } else {
        None
    }
}

/// Extracts the route from a path and fragment
///
/// Under path routing the route is the path. Under fragment routing it is the
/// fragment with the prefix removed, up to any `?`; a fragment without the
/// prefix yields an empty route.
pub fn extract_route<'a>(path: &'a str, fragment: Option<&'a str>, routing: &RoutingMode) -> &'a str {
    match routing {
        RoutingMode::PathBased => path,
        RoutingMode::FragmentBased { prefix } => fragment
            .and_then(|f| f.strip_prefix(prefix.as_str()))
            .map(|route| route.split('?').next().unwrap_or(""))
            .unwrap_or(""),
    }
}
