use crate::config::CrawlConfig;
use crate::url::mapper::to_absolute;
use crate::url::normalize::normalize_url;
use crate::url::route::{extract_route, split_url, RoutingMode};
use crate::{ConfigError, UrlError};
use regex::{Regex, RegexBuilder};
use std::fmt;
use url::Url;

/// Result of classifying a discovered link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The link should be crawled; `canonical` is its dedup key
    Admit { canonical: String },
    /// The link is not crawled
    Reject(RejectReason),
}

impl Classification {
    pub fn is_admit(&self) -> bool {
        matches!(self, Self::Admit { .. })
    }
}

/// Why a link was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Already tracked by the frontier
    Duplicate,
    /// Canonicalizes to the base URL
    BaseUrl,
    /// Fragment route equal to the root route
    RootRoute,
    /// Relative reference that names no route
    NoRoute,
    /// Different scheme, host or port than the base URL
    CrossOrigin,
    /// Matched an exclude pattern
    Excluded,
    /// Could not be parsed
    Malformed,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Duplicate => "duplicate",
            Self::BaseUrl => "base url",
            Self::RootRoute => "root route",
            Self::NoRoute => "no route",
            Self::CrossOrigin => "cross origin",
            Self::Excluded => "excluded",
            Self::Malformed => "malformed",
        };
        write!(f, "{}", s)
    }
}

/// Decides which discovered links belong to the crawl
///
/// Built once per crawl from the base URL, routing mode and exclude patterns.
/// Classification never fails: links that cannot be parsed are rejected.
#[derive(Debug, Clone)]
pub struct UrlClassifier {
    base_url: String,
    base: Url,
    base_canonical: String,
    routing: RoutingMode,
    excludes: Vec<Regex>,
}

impl UrlClassifier {
    /// Creates a classifier
    ///
    /// # Arguments
    ///
    /// * `base_url` - Absolute http(s) URL the crawl starts from
    /// * `routing` - Routing mode of the crawl
    /// * `exclude` - Regex patterns, matched case-insensitively against path and route
    ///
    /// # Returns
    ///
    /// * `Ok(UrlClassifier)` - Ready to classify
    /// * `Err(ConfigError)` - The base URL is invalid or a pattern does not compile
    pub fn new(base_url: &str, routing: RoutingMode, exclude: &[String]) -> Result<Self, ConfigError> {
        let canonical = normalize_url(base_url, &routing)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let base = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let excludes = exclude
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            base_url: base_url.to_string(),
            base,
            base_canonical: canonical.to_string(),
            routing,
            excludes,
        })
    }

    /// Creates a classifier from the crawl section of the configuration
    pub fn from_config(config: &CrawlConfig) -> Result<Self, ConfigError> {
        Self::new(&config.base_url, config.routing_mode(), &config.exclude)
    }

    /// The base URL exactly as configured
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Canonical form of the base URL
    pub fn base_canonical(&self) -> &str {
        &self.base_canonical
    }

    pub fn routing(&self) -> &RoutingMode {
        &self.routing
    }

    /// Resolves a link against the base URL and returns its canonical form
    pub fn canonicalize(&self, candidate: &str) -> Result<String, UrlError> {
        let absolute = to_absolute(candidate, &self.base_url)?;
        Ok(normalize_url(&absolute, &self.routing)?.to_string())
    }

    /// Classifies a discovered link
    ///
    /// Rules are applied in order:
    /// 1. Reject if `is_tracked` reports the canonical form as already tracked
    /// 2. Reject if it canonicalizes to the base URL
    /// 3. Under fragment routing, reject the root route (`#<prefix>/`)
    /// 4. Relative links are admitted when they name a route
    /// 5. Absolute links are admitted when they share the base URL's origin
    /// 6. Admitted links whose path or route matches an exclude pattern are rejected
    ///
    /// # Arguments
    ///
    /// * `candidate` - The href as found on the page
    /// * `is_tracked` - Dedup check against the frontier, given a canonical URL
    pub fn classify<F>(&self, candidate: &str, is_tracked: F) -> Classification
    where
        F: Fn(&str) -> bool,
    {
        let parts = split_url(candidate);

        if let Some(scheme) = parts.scheme {
            if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
                return Classification::Reject(RejectReason::CrossOrigin);
            }
        }

        let absolute = match to_absolute(candidate, &self.base_url) {
            Ok(absolute) => absolute,
            Err(_) => return Classification::Reject(RejectReason::Malformed),
        };

        let canonical = match normalize_url(&absolute, &self.routing) {
            Ok(url) => url.to_string(),
            Err(_) => return Classification::Reject(RejectReason::Malformed),
        };

        if is_tracked(&canonical) {
            return Classification::Reject(RejectReason::Duplicate);
        }

        if canonical == self.base_canonical {
            return Classification::Reject(RejectReason::BaseUrl);
        }

        if let Some(root) = self.routing.root_fragment() {
            if parts.fragment == Some(root.as_str()) {
                return Classification::Reject(RejectReason::RootRoute);
            }
        }

        if parts.is_relative() {
            let route = parts.route(&self.routing);
            let names_route = match self.routing {
                RoutingMode::PathBased => !route.is_empty(),
                RoutingMode::FragmentBased { .. } => !route.is_empty() && route != "/",
            };
            if !names_route {
                return Classification::Reject(RejectReason::NoRoute);
            }
        } else {
            match Url::parse(&absolute) {
                Ok(url) if self.is_same_origin(&url) => {}
                Ok(_) => return Classification::Reject(RejectReason::CrossOrigin),
                Err(_) => return Classification::Reject(RejectReason::Malformed),
            }
        }

        if self.is_excluded(&absolute) {
            return Classification::Reject(RejectReason::Excluded);
        }

        Classification::Admit { canonical }
    }

    /// Frontier-less form of [`classify`](Self::classify)
    ///
    /// # Examples
    ///
    /// ```
    /// use snapcrawl::url::{RoutingMode, UrlClassifier};
    ///
    /// let classifier = UrlClassifier::new("http://localhost:9000", RoutingMode::PathBased, &[]).unwrap();
    /// assert!(classifier.filter_url("/people"));
    /// assert!(!classifier.filter_url("http://example.com"));
    /// ```
    pub fn filter_url(&self, candidate: &str) -> bool {
        self.classify(candidate, |_| false).is_admit()
    }

    /// Scheme, host and effective port equal the base URL's
    fn is_same_origin(&self, url: &Url) -> bool {
        url.scheme() == self.base.scheme()
            && url.host_str().map(str::to_lowercase) == self.base.host_str().map(str::to_lowercase)
            && url.port_or_known_default() == self.base.port_or_known_default()
    }

    fn is_excluded(&self, absolute: &str) -> bool {
        if self.excludes.is_empty() {
            return false;
        }

        let (path, route) = match Url::parse(absolute) {
            Ok(url) => {
                let path = url.path().to_string();
                let route = extract_route(url.path(), url.fragment(), &self.routing).to_string();
                (path, route)
            }
            Err(_) => return false,
        };

        self.excludes
            .iter()
            .any(|regex| regex.is_match(&path) || regex.is_match(&route))
    }
}
