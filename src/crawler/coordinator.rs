//! Crawler coordinator - resource graph resolution
//!
//! This module contains the logic that turns seeds into a mirrored
//! resource graph, including:
//! - Single-flight deduplication of every discovered URL
//! - Filter and depth ceilings applied before fetching
//! - Fetching, redirect aliasing and local path assignment (phase 1)
//! - Handler dispatch and persistence as tracked tasks (phase 2)
//! - Fail-fast abort and rollback

use crate::config::{ActiveSource, Config};
use crate::crawler::fetcher::{Fetcher, RequestOptions};
use crate::crawler::scheduler::Scheduler;
use crate::filename::{FilenameGenerator, FilenameRequest};
use crate::handlers::handler_for;
use crate::plugins::Hooks;
use crate::state::{CrawlState, Registration, Resolution, Resource, ResourceKind, ResourceStatus};
use crate::storage::Storage;
use crate::url::{dedup_key, relative_link, UrlFilter};
use crate::{MirrorError, Result};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use std::io;
use std::sync::Arc;
use url::Url;

/// Everything a crawl is assembled from
pub(crate) struct CrawlParts {
    pub config: Arc<Config>,
    pub fetcher: Arc<dyn Fetcher>,
    pub storage: Arc<dyn Storage>,
    pub hooks: Hooks,
    pub url_filter: UrlFilter,
    pub filename_generator: Arc<dyn FilenameGenerator>,
}

/// Drives one crawl
///
/// A coordinator owns the [`CrawlState`] of a single `scrape` call and is
/// shared by every task of that crawl.
pub struct Coordinator {
    config: Arc<Config>,
    sources: Vec<ActiveSource>,
    state: CrawlState,
    scheduler: Scheduler,
    fetcher: Arc<dyn Fetcher>,
    storage: Arc<dyn Storage>,
    hooks: Hooks,
    url_filter: UrlFilter,
    filename_generator: Arc<dyn FilenameGenerator>,
    request_options: RequestOptions,
}

impl Coordinator {
    pub(crate) fn new(parts: CrawlParts) -> Arc<Self> {
        let config = parts.config;
        Arc::new(Self {
            sources: config.active_sources(),
            state: CrawlState::new(),
            scheduler: Scheduler::new(config.crawler.request_concurrency),
            request_options: RequestOptions::from_config(&config),
            fetcher: parts.fetcher,
            storage: parts.storage,
            hooks: parts.hooks,
            url_filter: parts.url_filter,
            filename_generator: parts.filename_generator,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Source rules applied to HTML documents, in order
    pub fn active_sources(&self) -> &[ActiveSource] {
        &self.sources
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Runs the crawl and returns the root resource of every seed, in seed order
    ///
    /// On a fatal error the `on_error` hooks run, everything persisted is
    /// rolled back, and the original error is returned.
    pub async fn run(self: &Arc<Self>) -> Result<Vec<Arc<Resource>>> {
        self.storage.prepare().await?;
        self.hooks.before_start(&self.config).await?;

        self.state.reserve_names(
            self.config
                .output
                .subdirectories
                .iter()
                .map(|rule| rule.directory.clone()),
        );

        let mut seeds = Vec::with_capacity(self.config.seeds.len());
        for seed in &self.config.seeds {
            let mut url = Url::parse(seed.url())?;
            url.set_fragment(None);
            seeds.push(Resource::new_root(url, seed.filename().map(str::to_string)));
        }

        tracing::info!("Mirroring {} seed(s)", seeds.len());
        let roots: Vec<Arc<Resource>> = stream::iter(seeds)
            .map(|root| self.request_root(root))
            .buffered(self.config.crawler.root_concurrency.max(1))
            .collect()
            .await;

        self.scheduler.wait_idle().await;

        if let Some(error) = self.state.take_failure() {
            tracing::error!("Crawl failed: {}", error);
            self.hooks.on_error(&error).await;
            if let Err(rollback_error) = self.storage.rollback().await {
                tracing::warn!("Rollback failed: {}", rollback_error);
            }
            return Err(error);
        }

        tracing::info!(
            "Mirror complete: {} resource(s) saved",
            self.state.persisted().len()
        );
        Ok(roots)
    }

    /// Resolves a seed; returns the canonical resource for its URL
    async fn request_root(self: &Arc<Self>, root: Arc<Resource>) -> Arc<Resource> {
        if let Some(reason) = self.veto(&root, false) {
            tracing::info!("Skipping seed {} ({})", root.url(), reason);
            self.mark_skipped(&root);
            return root;
        }

        let canonical = match dedup_key(root.source_url()) {
            Ok(key) => match self.state.register(key, &root) {
                Registration::Inserted => root,
                Registration::Existing(existing) => existing,
            },
            Err(e) => {
                self.handle_failure(&root, e.into()).await;
                return root;
            }
        };

        self.await_resolution(&canonical).await;
        canonical
    }

    /// Requests a resource referenced by `parent`
    ///
    /// Returns the canonical, fetched resource, or `None` when the reference
    /// is missing: filtered, beyond a ceiling, vetoed, failed, or the crawl
    /// is aborting. A URL is fetched at most once per crawl; a URL that
    /// failed is never fetched again.
    pub async fn request_child(
        self: &Arc<Self>,
        parent: &Arc<Resource>,
        url: Url,
        recursive: bool,
    ) -> Option<Arc<Resource>> {
        if self.state.is_aborted() {
            return None;
        }

        let key = match dedup_key(&url) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!("Ignoring reference {}: {}", url, e);
                return None;
            }
        };

        let child = parent.create_child(url, None);

        if let Some(existing) = self.state.get_by_key(&key) {
            parent.update_child(&child, existing.clone());
            return self.await_resolution(&existing).await;
        }

        if let Some(reason) = self.veto(&child, recursive) {
            tracing::debug!("Skipping {} ({})", child.url(), reason);
            self.mark_skipped(&child);
            return None;
        }

        match self.state.register(key, &child) {
            Registration::Inserted => self.await_resolution(&child).await,
            Registration::Existing(existing) => {
                parent.update_child(&child, existing.clone());
                self.await_resolution(&existing).await
            }
        }
    }

    /// Link written into `parent` for `child`, relative to the parent's path
    pub fn link_between(
        &self,
        parent: &Resource,
        child: &Resource,
        fragment: Option<&str>,
    ) -> Option<String> {
        let from = parent.assigned_path()?;
        let to = child.assigned_path()?;
        let output = &self.config.output;
        let prettify = output
            .prettify_urls
            .then_some(output.default_filename.as_str());

        let mut link = relative_link(from, to, prettify);
        if let Some(fragment) = fragment {
            link.push('#');
            link.push_str(fragment);
        }
        Some(link)
    }

    /// Policy reasons not to fetch a resource
    fn veto(&self, resource: &Resource, recursive: bool) -> Option<&'static str> {
        let crawler = &self.config.crawler;
        if !self.url_filter.allows(resource.source_url()) {
            return Some("filtered");
        }
        if crawler.max_depth.map_or(false, |max| resource.depth() > max) {
            return Some("max depth");
        }
        if recursive
            && crawler
                .max_recursive_depth
                .map_or(false, |max| resource.depth() > max)
        {
            return Some("max recursive depth");
        }
        None
    }

    fn mark_skipped(&self, resource: &Resource) {
        if let Err(e) = resource.set_status(ResourceStatus::Skipped) {
            tracing::debug!("{}", e);
        }
    }

    /// Waits for phase 1 of `resource`, starting it if nobody has
    async fn await_resolution(self: &Arc<Self>, resource: &Arc<Resource>) -> Option<Arc<Resource>> {
        let coordinator = self.clone();
        let target = resource.clone();
        resource
            .resolution()
            .get_or_init(|| coordinator.load(target))
            .await;
        resource.resolved()
    }

    /// Phase 1: fetch and path assignment
    ///
    /// Never waits on another resource's processing, only (for redirect
    /// aliases) on another resource's phase 1.
    fn load(self: Arc<Self>, resource: Arc<Resource>) -> BoxFuture<'static, Resolution> {
        async move {
            match self.fetch_and_assign(&resource).await {
                Ok(resolution) => resolution,
                Err(error) => {
                    self.handle_failure(&resource, error).await;
                    Resolution::Failed
                }
            }
        }
        .boxed()
    }

    async fn fetch_and_assign(self: &Arc<Self>, resource: &Arc<Resource>) -> Result<Resolution> {
        if self.state.is_aborted() {
            resource.set_status(ResourceStatus::Skipped)?;
            return Ok(Resolution::Missing);
        }
        resource.set_status(ResourceStatus::Fetching)?;

        let response = {
            let _permit = self.scheduler.acquire().await;
            if self.state.is_aborted() {
                resource.set_status(ResourceStatus::Skipped)?;
                return Ok(Resolution::Missing);
            }

            let options = self
                .hooks
                .before_request(resource, self.request_options.clone())
                .await?;
            let url = resource.url();
            tracing::debug!("Fetching {}", url);
            let response = self.fetcher.fetch(&url, &options).await?;
            self.hooks.after_response(resource, response).await?
        };

        let Some(response) = response else {
            resource.set_status(ResourceStatus::Skipped)?;
            return Ok(Resolution::Missing);
        };

        if response.final_url != resource.url() {
            let mut final_url = response.final_url.clone();
            final_url.set_fragment(None);
            let final_key = dedup_key(&final_url)?;

            if final_key != dedup_key(&resource.url())? {
                if let Registration::Existing(target) = self.state.register(final_key, resource) {
                    tracing::debug!("{} redirects to known {}", resource.url(), target.url());
                    resource.set_status(ResourceStatus::Skipped)?;
                    if !self.state.begin_redirect_wait(resource, &target) {
                        tracing::warn!(
                            "Redirect loop between {} and {}",
                            resource.url(),
                            target.url()
                        );
                        return Ok(Resolution::Missing);
                    }
                    self.await_resolution(&target).await;
                    self.state.end_redirect_wait(resource);
                    return Ok(Resolution::Alias(target));
                }
            }
            tracing::debug!("{} redirected to {}", resource.url(), final_url);
            resource.set_url(final_url);
        }

        let kind = ResourceKind::classify(response.content_type.as_deref(), &resource.url());
        resource.set_kind(kind);
        resource.set_body(response.body);
        resource.set_metadata(response.metadata);

        let path = self.assign_path(resource, kind);
        tracing::debug!("{} -> {} ({})", resource.url(), path, kind);

        let coordinator = self.clone();
        let task_resource = resource.clone();
        self.scheduler
            .spawn(async move { coordinator.process(task_resource).await });

        Ok(Resolution::Ready)
    }

    /// Claims a unique local path: plugins first, then the configured strategy
    fn assign_path(&self, resource: &Resource, kind: ResourceKind) -> String {
        let url = resource.url();
        let path = self.state.claim_path(|occupied| {
            self.hooks
                .generate_filename(resource, occupied.as_slice())
                .unwrap_or_else(|| {
                    let request = FilenameRequest {
                        url: &url,
                        preferred: resource.filename_hint(),
                        kind,
                    };
                    self.filename_generator.generate(&request, occupied)
                })
        });
        resource.set_assigned_path(path.clone());
        path
    }

    /// Phase 2: handler and persistence, run as a tracked task
    async fn process(self: Arc<Self>, resource: Arc<Resource>) {
        if let Err(error) = self.process_resource(&resource).await {
            self.handle_failure(&resource, error).await;
        }
    }

    async fn process_resource(self: &Arc<Self>, resource: &Arc<Resource>) -> Result<()> {
        resource.set_status(ResourceStatus::Processing)?;

        let kind = resource.kind().unwrap_or(ResourceKind::Opaque);
        handler_for(kind).handle(self, resource).await?;

        if self.state.is_aborted() {
            tracing::debug!("Not saving {}: crawl aborted", resource.url());
            return Ok(());
        }

        if !self.hooks.save_resource(resource).await? {
            let path = resource.assigned_path().ok_or_else(|| MirrorError::Persist {
                path: resource.url().to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no local path assigned"),
            })?;
            self.storage.save(path, &resource.body()).await?;
        }

        resource.set_status(ResourceStatus::Saved)?;
        self.state.record_persisted(resource);
        self.hooks.on_resource_saved(resource).await;
        Ok(())
    }

    /// Marks the resource failed and, unless errors are tolerated, aborts
    async fn handle_failure(&self, resource: &Arc<Resource>, error: MirrorError) {
        if let Err(e) = resource.set_status(ResourceStatus::Failed) {
            tracing::debug!("{}", e);
        }
        self.hooks.on_resource_error(resource, &error).await;

        if self.config.crawler.ignore_errors {
            tracing::warn!("Skipping {}: {}", resource.url(), error);
        } else {
            tracing::error!("Error processing {}: {}", resource.url(), error);
            if self.state.record_failure(error) {
                tracing::info!("Aborting crawl");
            }
        }
    }
}
