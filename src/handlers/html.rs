use crate::config::ActiveSource;
use crate::crawler::Coordinator;
use crate::handlers::{resolve_container, ReferencePolicy, ResourceHandler};
use crate::html::{splice, Edit, SourceDocument};
use crate::paths::PathContainer;
use crate::state::Resource;
use crate::url::html_unescape;
use crate::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// HTML documents
///
/// Source rules are applied one after another in declared order; within a
/// rule, the references of every matching element are requested together.
/// The document is rewritten by splicing new values into the original text,
/// and every `<base>` tag is removed since links become local.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlHandler;

/// A value located by a source rule
#[derive(Debug, Clone)]
struct Target {
    span: Range<usize>,
    element: String,
    /// Attribute quote; `None` for unquoted attributes and element text
    quote: Option<char>,
    is_attribute: bool,
}

#[derive(Debug)]
struct RulePlan {
    source: ActiveSource,
    targets: Vec<Target>,
}

/// Everything the handler needs from the parsed document
#[derive(Debug)]
struct DocumentPlan {
    base: Url,
    base_tags: Vec<Range<usize>>,
    rules: Vec<RulePlan>,
}

/// Parses the document and locates every value the rules select
///
/// Kept synchronous so the parsed tree never lives across an await.
fn plan_document(source: &str, url: &Url, sources: &[ActiveSource]) -> Result<DocumentPlan> {
    let document = SourceDocument::parse(source);

    let base = document
        .base_href()
        .and_then(|href| url.join(html_unescape(href).trim()).ok())
        .unwrap_or_else(|| url.clone());

    let mut rules = Vec::with_capacity(sources.len());
    for active in sources {
        let targets = document
            .select(&active.rule.selector)?
            .into_iter()
            .filter_map(|index| {
                let tag = &document.tags()[index];
                match active.rule.attr.as_deref() {
                    Some(attr) => tag.attribute(attr).map(|value| Target {
                        span: value.range.clone(),
                        element: tag.name.clone(),
                        quote: value.quote,
                        is_attribute: true,
                    }),
                    None => tag.content.clone().map(|span| Target {
                        span,
                        element: tag.name.clone(),
                        quote: None,
                        is_attribute: false,
                    }),
                }
            })
            .collect();
        rules.push(RulePlan {
            source: active.clone(),
            targets,
        });
    }

    Ok(DocumentPlan {
        base,
        base_tags: document.base_tags(),
        rules,
    })
}

/// Encodes a rewritten attribute value for its original quoting
///
/// Entities are only introduced when the original value used them.
fn encode_attribute(updated: &str, raw: &str, decoded: &str, quote: Option<char>) -> String {
    let mut value = if raw != decoded {
        updated.replace('&', "&amp;")
    } else {
        updated.to_string()
    };

    match quote {
        Some('"') => value = value.replace('"', "&quot;"),
        Some('\'') => value = value.replace('\'', "&#39;"),
        _ => {
            let needs_quotes = value
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '>' | '=' | '`' | '<'));
            if needs_quotes {
                value = format!("\"{}\"", value.replace('"', "&quot;"));
            }
        }
    }
    value
}

#[async_trait]
impl ResourceHandler for HtmlHandler {
    async fn handle(&self, coordinator: &Arc<Coordinator>, resource: &Arc<Resource>) -> Result<()> {
        let source = resource.text();
        let url = resource.url();
        let plan = plan_document(&source, &url, coordinator.active_sources())?;
        let policy = &coordinator.config().crawler.update_missing_sources;

        // current text of every rewritten span, so later rules see earlier edits
        let mut rewritten: HashMap<(usize, usize), String> = HashMap::new();

        for rule in &plan.rules {
            let reference_policy = ReferencePolicy {
                recursive: rule.source.recursive,
                rewrite_missing: policy.applies_to(&rule.source.rule),
            };

            let requests = rule.targets.iter().map(|target| {
                let key = (target.span.start, target.span.end);
                let raw = rewritten
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| source[target.span.clone()].to_string());
                let decoded = if target.is_attribute {
                    html_unescape(&raw).into_owned()
                } else {
                    raw.clone()
                };
                let container =
                    PathContainer::for_rule(&rule.source.rule, &target.element, decoded.clone());
                let base = &plan.base;

                async move {
                    let replacements =
                        resolve_container(coordinator, resource, base, &container, reference_policy)
                            .await;
                    (target, key, raw, decoded, container, replacements)
                }
            });

            for (target, key, raw, decoded, container, replacements) in join_all(requests).await {
                if replacements.is_empty() {
                    continue;
                }
                let updated = container.update_text(&replacements);
                if updated == decoded {
                    continue;
                }
                let encoded = if target.is_attribute {
                    encode_attribute(&updated, &raw, &decoded, target.quote)
                } else {
                    updated
                };
                rewritten.insert(key, encoded);
            }
        }

        if rewritten.is_empty() && plan.base_tags.is_empty() {
            debug!("No changes to {}", url);
            return Ok(());
        }

        let mut edits: Vec<Edit> = rewritten
            .into_iter()
            .map(|((start, end), text)| Edit {
                range: start..end,
                text,
            })
            .collect();
        edits.extend(plan.base_tags.into_iter().map(|range| Edit {
            range,
            text: String::new(),
        }));

        resource.set_text(splice(&source, edits));
        Ok(())
    }
}
