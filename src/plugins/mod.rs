//! Extension hooks
//!
//! A [`Plugin`] can adjust requests, veto responses, choose file names,
//! take over persistence and observe outcomes. Plugins run in registration
//! order; hooks returning a value fold over the previous plugin's result.

use crate::config::Config;
use crate::crawler::{FetchResponse, RequestOptions};
use crate::state::Resource;
use crate::{MirrorError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Crawl extension point
///
/// Every hook has a default that leaves the crawl unchanged.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str {
        "plugin"
    }

    /// Runs once before any fetch; an error fails the crawl
    async fn before_start(&self, _config: &Config) -> Result<()> {
        Ok(())
    }

    async fn before_request(
        &self,
        _resource: &Resource,
        options: RequestOptions,
    ) -> Result<RequestOptions> {
        Ok(options)
    }

    /// Returning `None` drops the resource; references to it are treated as missing
    async fn after_response(
        &self,
        _resource: &Resource,
        response: FetchResponse,
    ) -> Result<Option<FetchResponse>> {
        Ok(Some(response))
    }

    /// Chooses the local path; `occupied` lists every path already taken
    ///
    /// The result still goes through collision resolution.
    fn generate_filename(&self, _resource: &Resource, _occupied: &[String]) -> Option<String> {
        None
    }

    /// Persists the resource; return true when it was saved here
    async fn save_resource(&self, _resource: &Resource) -> Result<bool> {
        Ok(false)
    }

    async fn on_resource_saved(&self, _resource: &Resource) {}

    async fn on_resource_error(&self, _resource: &Resource, _error: &MirrorError) {}

    /// Runs once when the crawl fails, before rollback
    async fn on_error(&self, _error: &MirrorError) {}
}

/// Attributes a hook failure to the plugin that raised it
fn wrap(plugin: &dyn Plugin, hook: &'static str, error: MirrorError) -> MirrorError {
    match error {
        MirrorError::Plugin { .. } => error,
        other => MirrorError::Plugin {
            plugin: plugin.name().to_string(),
            hook,
            message: other.to_string(),
        },
    }
}

/// Registered plugins, dispatched in order
#[derive(Clone, Default)]
pub struct Hooks {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|plugin| plugin.name()))
            .finish()
    }
}

impl Hooks {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub async fn before_start(&self, config: &Config) -> Result<()> {
        for plugin in &self.plugins {
            plugin
                .before_start(config)
                .await
                .map_err(|e| wrap(plugin.as_ref(), "before_start", e))?;
        }
        Ok(())
    }

    pub async fn before_request(
        &self,
        resource: &Resource,
        mut options: RequestOptions,
    ) -> Result<RequestOptions> {
        for plugin in &self.plugins {
            options = plugin
                .before_request(resource, options)
                .await
                .map_err(|e| wrap(plugin.as_ref(), "before_request", e))?;
        }
        Ok(options)
    }

    /// Folds the response through every plugin; stops at the first veto
    pub async fn after_response(
        &self,
        resource: &Resource,
        response: FetchResponse,
    ) -> Result<Option<FetchResponse>> {
        let mut current = response;
        for plugin in &self.plugins {
            let next = plugin
                .after_response(resource, current)
                .await
                .map_err(|e| wrap(plugin.as_ref(), "after_response", e))?;
            match next {
                Some(next) => current = next,
                None => {
                    tracing::debug!("{} vetoed {}", plugin.name(), resource.url());
                    return Ok(None);
                }
            }
        }
        Ok(Some(current))
    }

    /// First plugin returning a name wins
    pub fn generate_filename(&self, resource: &Resource, occupied: &[String]) -> Option<String> {
        self.plugins
            .iter()
            .find_map(|plugin| plugin.generate_filename(resource, occupied))
    }

    /// Returns true once a plugin has persisted the resource
    pub async fn save_resource(&self, resource: &Resource) -> Result<bool> {
        for plugin in &self.plugins {
            let saved = plugin
                .save_resource(resource)
                .await
                .map_err(|e| wrap(plugin.as_ref(), "save_resource", e))?;
            if saved {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn on_resource_saved(&self, resource: &Resource) {
        for plugin in &self.plugins {
            plugin.on_resource_saved(resource).await;
        }
    }

    pub async fn on_resource_error(&self, resource: &Resource, error: &MirrorError) {
        for plugin in &self.plugins {
            plugin.on_resource_error(resource, error).await;
        }
    }

    pub async fn on_error(&self, error: &MirrorError) {
        for plugin in &self.plugins {
            plugin.on_error(error).await;
        }
    }
}
