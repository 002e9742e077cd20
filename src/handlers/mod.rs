//! Per-kind resource handlers
//!
//! A handler discovers the references inside a fetched resource, requests
//! each referenced resource through the coordinator, and rewrites the body
//! so those references point at the local copies.

mod css;
mod html;

pub use css::CssHandler;
pub use html::HtmlHandler;

use crate::crawler::Coordinator;
use crate::paths::{PathContainer, Replacement};
use crate::state::{Resource, ResourceKind};
use crate::url::resolve_reference;
use crate::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use url::Url;

#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Resolves the resource's references and rewrites its body
    async fn handle(&self, coordinator: &Arc<Coordinator>, resource: &Arc<Resource>) -> Result<()>;
}

/// Resources whose bytes are stored as fetched
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueHandler;

#[async_trait]
impl ResourceHandler for OpaqueHandler {
    async fn handle(&self, _coordinator: &Arc<Coordinator>, _resource: &Arc<Resource>) -> Result<()> {
        Ok(())
    }
}

/// Returns the handler for a resource kind
pub fn handler_for(kind: ResourceKind) -> &'static dyn ResourceHandler {
    match kind {
        ResourceKind::Html => &HtmlHandler,
        ResourceKind::Css => &CssHandler,
        ResourceKind::Opaque => &OpaqueHandler,
    }
}

/// How the references of one container are requested
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReferencePolicy {
    /// Found by a hyperlink rule
    pub recursive: bool,
    /// Missing references become absolute URLs
    pub rewrite_missing: bool,
}

/// Requests every reference of `container` and computes its replacement
///
/// All references are requested together and every outcome is awaited; a
/// failing child never cancels its siblings. References that resolved to a
/// local resource are replaced by a link relative to `parent`. Missing
/// ones are either left alone or replaced by their absolute URL.
pub(crate) async fn resolve_container(
    coordinator: &Arc<Coordinator>,
    parent: &Arc<Resource>,
    base: &Url,
    container: &PathContainer,
    policy: ReferencePolicy,
) -> Vec<Replacement> {
    let requests = container
        .paths()
        .into_iter()
        .filter_map(|raw| resolve_reference(base, &raw).map(|absolute| (raw, absolute)))
        .map(|(raw, absolute)| async move {
            let fragment = absolute.fragment().map(str::to_string);
            let mut target = absolute.clone();
            target.set_fragment(None);

            let local = match coordinator.request_child(parent, target, policy.recursive).await {
                Some(child) => {
                    // only documents keep their #fragment
                    let fragment = match child.kind() {
                        Some(ResourceKind::Html) => fragment.as_deref(),
                        _ => None,
                    };
                    coordinator.link_between(parent, &child, fragment)
                }
                None => None,
            };

            let new = match local {
                Some(link) => Some(link),
                None if policy.rewrite_missing => Some(absolute.to_string()),
                None => None,
            };
            new.filter(|new| *new != raw)
                .map(|new| Replacement { old: raw, new })
        });

    join_all(requests).await.into_iter().flatten().collect()
}
