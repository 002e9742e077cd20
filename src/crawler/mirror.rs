use crate::config::{validate, Config};
use crate::crawler::coordinator::{Coordinator, CrawlParts};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::filename::{generator_from_config, FilenameGenerator};
use crate::output::{log_statistics, CrawlStatistics, CrawlSummary, ResourceReport};
use crate::plugins::{Hooks, Plugin};
use crate::storage::{FsStorage, Storage};
use crate::url::UrlFilter;
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use url::Url;

/// A configured mirror
///
/// Holds the configuration and every pluggable policy. Each call to
/// [`scrape`](Mirror::scrape) runs an independent crawl with fresh state.
pub struct Mirror {
    config: Arc<Config>,
    config_hash: Option<String>,
    fetcher: Arc<dyn Fetcher>,
    storage: Arc<dyn Storage>,
    plugins: Vec<Arc<dyn Plugin>>,
    url_filter: UrlFilter,
    filename_generator: Arc<dyn FilenameGenerator>,
}

impl std::fmt::Debug for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mirror")
            .field("seeds", &self.config.seeds.len())
            .field("directory", &self.config.output.directory)
            .field("plugins", &self.plugins.len())
            .finish()
    }
}

impl Mirror {
    /// Creates a mirror with the default fetcher, storage and policies
    pub fn new(config: Config) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: Config) -> MirrorBuilder {
        MirrorBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn coordinator(&self) -> Arc<Coordinator> {
        Coordinator::new(CrawlParts {
            config: self.config.clone(),
            fetcher: self.fetcher.clone(),
            storage: self.storage.clone(),
            hooks: Hooks::new(self.plugins.clone()),
            url_filter: self.url_filter.clone(),
            filename_generator: self.filename_generator.clone(),
        })
    }

    /// Runs the crawl and returns one report per seed, in seed order
    pub async fn scrape(&self) -> Result<Vec<ResourceReport>> {
        Ok(self.scrape_with_summary().await?.roots)
    }

    /// Runs the crawl and returns the reports along with statistics and timings
    pub async fn scrape_with_summary(&self) -> Result<CrawlSummary> {
        let started_at = Utc::now();
        let coordinator = self.coordinator();
        let roots = coordinator.run().await?;

        let statistics = CrawlStatistics::collect(&roots);
        log_statistics(&statistics);

        Ok(CrawlSummary {
            started_at,
            finished_at: Utc::now(),
            config_hash: self.config_hash.clone(),
            output_directory: self.config.output.directory.display().to_string(),
            roots: roots.iter().map(ResourceReport::from_resource).collect(),
            statistics,
        })
    }
}

/// Assembles a [`Mirror`]
///
/// Anything not set falls back to what the configuration describes: an
/// HTTP fetcher, a filesystem storage rooted at the output directory, the
/// configured filename strategy and the configured host filter.
pub struct MirrorBuilder {
    config: Config,
    config_hash: Option<String>,
    fetcher: Option<Arc<dyn Fetcher>>,
    storage: Option<Arc<dyn Storage>>,
    plugins: Vec<Arc<dyn Plugin>>,
    url_filter: Option<UrlFilter>,
    filename_generator: Option<Arc<dyn FilenameGenerator>>,
}

impl MirrorBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            config_hash: None,
            fetcher: None,
            storage: None,
            plugins: Vec::new(),
            url_filter: None,
            filename_generator: None,
        }
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Registers a plugin; plugins run in registration order
    pub fn plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Replaces the configured host filter with a predicate
    pub fn url_filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Url) -> bool + Send + Sync + 'static,
    {
        self.url_filter = Some(UrlFilter::new(predicate));
        self
    }

    pub fn filename_generator<G>(mut self, generator: G) -> Self
    where
        G: FilenameGenerator + 'static,
    {
        self.filename_generator = Some(Arc::new(generator));
        self
    }

    /// Fingerprint of the configuration file, carried into the report
    pub fn config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Validates the configuration and builds the mirror
    pub fn build(self) -> Result<Mirror> {
        validate(&self.config)?;

        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new(&self.config)?),
        };
        let storage: Arc<dyn Storage> = match self.storage {
            Some(storage) => storage,
            None => Arc::new(FsStorage::new(&self.config.output.directory)),
        };
        let url_filter = self
            .url_filter
            .unwrap_or_else(|| UrlFilter::hosts(self.config.crawler.url_filter.clone()));
        let filename_generator = self
            .filename_generator
            .unwrap_or_else(|| generator_from_config(&self.config.output));

        Ok(Mirror {
            config: Arc::new(self.config),
            config_hash: self.config_hash,
            fetcher,
            storage,
            plugins: self.plugins,
            url_filter,
            filename_generator,
        })
    }
}
