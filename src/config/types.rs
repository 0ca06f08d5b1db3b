use serde::Deserialize;

/// Main configuration structure for snapcrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// URL the crawl starts from; the origin every admitted link must share
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum link-hop distance from the base URL
    #[serde(default = "default_depth")]
    pub depth: u32,

    /// Treat `#<prefix>/route` fragments as pages
    #[serde(rename = "follow-fragment", default)]
    pub follow_fragment: bool,

    /// Prefix that marks a fragment as a route (`!` for `#!/route`)
    #[serde(rename = "fragment-prefix", default = "default_fragment_prefix")]
    pub fragment_prefix: String,

    /// Selector whose `data-status="ready"` attribute gates capture
    #[serde(rename = "ready-selector", default)]
    pub ready_selector: Option<String>,

    /// Case-insensitive regex patterns; matching paths are never crawled
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Per-page budget for opening and readiness (milliseconds)
    #[serde(rename = "wait-delay", default = "default_wait_delay")]
    pub wait_delay: u64,

    /// Interval between readiness probes (milliseconds)
    #[serde(rename = "poll-interval", default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Maximum number of pages being fetched at once
    #[serde(
        rename = "max-concurrent-pages",
        default = "default_max_concurrent_pages"
    )]
    pub max_concurrent_pages: u32,
}

/// Which renderer backs the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Plain HTTP fetch with static HTML parsing
    #[default]
    Http,
    /// Headless Chromium (requires the `chrome` feature)
    Chrome,
}

/// Renderer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    #[serde(default)]
    pub kind: RendererKind,

    #[serde(rename = "viewport-width", default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(rename = "viewport-height", default = "default_viewport_height")]
    pub viewport_height: u32,

    /// HTTP request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            kind: RendererKind::default(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Write captured HTML to the content directory
    #[serde(default = "default_true")]
    pub content: bool,

    #[serde(rename = "content-dir", default = "default_content_dir")]
    pub content_dir: String,

    /// Write `sitemap.xml` to the sitemap directory
    #[serde(default)]
    pub sitemap: bool,

    #[serde(rename = "sitemap-dir", default = "default_sitemap_dir")]
    pub sitemap_dir: String,

    #[serde(rename = "change-frequency", default)]
    pub change_frequency: ChangeFrequency,

    /// Save a PNG snapshot per page (renderers that support it)
    #[serde(default)]
    pub render: bool,

    #[serde(rename = "render-dir", default = "default_render_dir")]
    pub render_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            content: true,
            content_dir: default_content_dir(),
            sitemap: false,
            sitemap_dir: default_sitemap_dir(),
            change_frequency: ChangeFrequency::default(),
            render: false,
            render_dir: default_render_dir(),
        }
    }
}

/// Sitemap `changefreq` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    #[default]
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }
}

fn default_depth() -> u32 {
    4
}

fn default_fragment_prefix() -> String {
    "!".to_string()
}

fn default_wait_delay() -> u64 {
    5000
}

fn default_poll_interval() -> u64 {
    250
}

fn default_max_concurrent_pages() -> u32 {
    4
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    1024
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_content_dir() -> String {
    "www/static".to_string()
}

fn default_sitemap_dir() -> String {
    "www".to_string()
}

fn default_render_dir() -> String {
    "www/snapshots".to_string()
}
