use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default basename used when a URL carries no usable file name
pub const DEFAULT_FILENAME: &str = "index.html";

/// Default number of seeds processed at the same time
pub const DEFAULT_ROOT_CONCURRENCY: usize = 4;

/// Main configuration structure for Sumi-Mirror
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Seed URLs, each optionally with a preferred local file name
    pub seeds: Vec<SeedEntry>,

    pub output: OutputConfig,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub request: RequestConfig,

    #[serde(default)]
    pub user_agent: UserAgentConfig,

    /// Ordered rules locating references inside HTML documents
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceRule>,

    /// Hyperlink-type rules, only followed when `crawler.recursive` is set
    #[serde(default = "default_recursive_sources")]
    pub recursive_sources: Vec<SourceRule>,
}

impl Config {
    /// Creates a configuration with defaults for everything but seeds and directory
    pub fn new<I, S>(seeds: I, directory: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            seeds: seeds
                .into_iter()
                .map(|url| SeedEntry::Url(url.into()))
                .collect(),
            output: OutputConfig {
                directory: directory.into(),
                default_filename: default_filename(),
                filename_generator: FilenameStrategy::default(),
                prettify_urls: false,
                subdirectories: Vec::new(),
            },
            crawler: CrawlerConfig::default(),
            request: RequestConfig::default(),
            user_agent: UserAgentConfig::default(),
            sources: default_sources(),
            recursive_sources: default_recursive_sources(),
        }
    }

    /// Returns the rules to apply to HTML documents, in application order
    ///
    /// Recursive rules come last and only when recursion is enabled.
    pub fn active_sources(&self) -> Vec<ActiveSource> {
        let mut active: Vec<ActiveSource> = self
            .sources
            .iter()
            .cloned()
            .map(|rule| ActiveSource {
                rule,
                recursive: false,
            })
            .collect();

        if self.crawler.recursive {
            active.extend(self.recursive_sources.iter().cloned().map(|rule| ActiveSource {
                rule,
                recursive: true,
            }));
        }

        active
    }
}

/// A seed URL, either bare or with a preferred file name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SeedEntry {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        filename: Option<String>,
    },
}

impl SeedEntry {
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Detailed { url, .. } => url,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::Url(_) => None,
            Self::Detailed { filename, .. } => filename.as_deref(),
        }
    }
}

/// A selector plus the attribute holding the reference
///
/// Without an attribute the element's text content is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct SourceRule {
    pub selector: String,
    #[serde(default)]
    pub attr: Option<String>,
}

impl SourceRule {
    pub fn attr(selector: &str, attr: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attr: Some(attr.to_string()),
        }
    }

    pub fn text(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attr: None,
        }
    }
}

/// A source rule tagged with whether it is a hyperlink-type rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSource {
    pub rule: SourceRule,
    pub recursive: bool,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory the mirror is written to; must not exist yet
    pub directory: PathBuf,

    /// Basename used when the URL does not provide one
    #[serde(default = "default_filename")]
    pub default_filename: String,

    #[serde(default)]
    pub filename_generator: FilenameStrategy,

    /// Strip the default file name from rewritten links
    #[serde(default)]
    pub prettify_urls: bool,

    /// Extension to subdirectory table, first match wins
    #[serde(default)]
    pub subdirectories: Vec<SubdirectoryRule>,
}

/// Which built-in filename strategy to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilenameStrategy {
    #[default]
    ByType,
    BySiteStructure,
}

/// Files with one of `extensions` are stored under `directory`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubdirectoryRule {
    pub directory: String,
    pub extensions: Vec<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum depth of any resource; unlimited when unset
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Maximum depth of resources reached through recursive rules
    #[serde(default)]
    pub max_recursive_depth: Option<u32>,

    /// Follow hyperlink-type rules
    #[serde(default)]
    pub recursive: bool,

    /// Maximum number of simultaneous fetches; unlimited when unset
    #[serde(default)]
    pub request_concurrency: Option<usize>,

    /// Maximum number of seeds resolved at the same time
    #[serde(default = "default_root_concurrency")]
    pub root_concurrency: usize,

    /// Tolerate per-resource failures instead of aborting the crawl
    #[serde(default)]
    pub ignore_errors: bool,

    #[serde(default)]
    pub update_missing_sources: MissingSourcesPolicy,

    /// Host patterns (e.g. "example.com", "*.example.com") allowed to be fetched
    #[serde(default)]
    pub url_filter: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_recursive_depth: None,
            recursive: false,
            request_concurrency: None,
            root_concurrency: DEFAULT_ROOT_CONCURRENCY,
            ignore_errors: false,
            update_missing_sources: MissingSourcesPolicy::default(),
            url_filter: Vec::new(),
        }
    }
}

/// How references that never became local resources are rewritten
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MissingSourcesPolicy {
    /// `true` rewrites every missing reference to its absolute URL
    All(bool),
    /// Only references found by these rules are rewritten
    Rules(Vec<SourceRule>),
}

impl Default for MissingSourcesPolicy {
    fn default() -> Self {
        Self::All(false)
    }
}

impl MissingSourcesPolicy {
    /// Returns true if missing references found by `rule` become absolute URLs
    pub fn applies_to(&self, rule: &SourceRule) -> bool {
        match self {
            Self::All(enabled) => *enabled,
            Self::Rules(rules) => rules.contains(rule),
        }
    }
}

/// Transport options applied to every request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RequestConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            headers: BTreeMap::new(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    #[serde(default = "default_crawler_name")]
    pub crawler_name: String,

    #[serde(default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the mirror operator
    #[serde(default)]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

fn default_filename() -> String {
    DEFAULT_FILENAME.to_string()
}

fn default_root_concurrency() -> usize {
    DEFAULT_ROOT_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    10
}

fn default_crawler_name() -> String {
    "sumi-mirror".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Reference locations scanned in every HTML document
pub fn default_sources() -> Vec<SourceRule> {
    vec![
        SourceRule::text("style"),
        SourceRule::attr("[style]", "style"),
        SourceRule::attr("img", "src"),
        SourceRule::attr("img", "srcset"),
        SourceRule::attr("input", "src"),
        SourceRule::attr("object", "data"),
        SourceRule::attr("embed", "src"),
        SourceRule::attr("param[name=\"movie\"]", "value"),
        SourceRule::attr("script", "src"),
        SourceRule::attr("link[rel=\"stylesheet\"]", "href"),
        SourceRule::attr("link[rel*=\"icon\"]", "href"),
        SourceRule::attr("svg [href]", "href"),
        SourceRule::attr("picture source", "srcset"),
        SourceRule::attr("meta[property=\"og:image\"]", "content"),
        SourceRule::attr("meta[property=\"og:image:url\"]", "content"),
        SourceRule::attr("meta[property=\"og:image:secure_url\"]", "content"),
        SourceRule::attr("video", "src"),
        SourceRule::attr("video", "poster"),
        SourceRule::attr("video source", "src"),
        SourceRule::attr("audio", "src"),
        SourceRule::attr("audio source", "src"),
        SourceRule::attr("track", "src"),
    ]
}

/// Hyperlink-type rules
pub fn default_recursive_sources() -> Vec<SourceRule> {
    vec![SourceRule::attr("a", "href")]
}
