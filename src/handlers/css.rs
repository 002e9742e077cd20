use crate::config::MissingSourcesPolicy;
use crate::crawler::Coordinator;
use crate::handlers::{resolve_container, ReferencePolicy, ResourceHandler};
use crate::paths::{CssText, PathContainer};
use crate::state::Resource;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Stylesheets: the whole text is one container, resolved against the
/// stylesheet's own URL
#[derive(Debug, Clone, Copy, Default)]
pub struct CssHandler;

/// Stylesheets are not found by any source rule, so only the blanket
/// setting rewrites their missing references
fn rewrite_missing(policy: &MissingSourcesPolicy) -> bool {
    matches!(policy, MissingSourcesPolicy::All(true))
}

#[async_trait]
impl ResourceHandler for CssHandler {
    async fn handle(&self, coordinator: &Arc<Coordinator>, resource: &Arc<Resource>) -> Result<()> {
        let text = resource.text();
        let url = resource.url();
        let container = PathContainer::Css(CssText::new(text.clone()));

        let policy = ReferencePolicy {
            recursive: false,
            rewrite_missing: rewrite_missing(&coordinator.config().crawler.update_missing_sources),
        };
        let replacements = resolve_container(coordinator, resource, &url, &container, policy).await;
        if replacements.is_empty() {
            return Ok(());
        }

        let updated = container.update_text(&replacements);
        if updated != text {
            resource.set_text(updated);
        }
        Ok(())
    }
}
