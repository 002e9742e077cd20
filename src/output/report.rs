use crate::state::Resource;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of one resource and, recursively, of what it references
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceReport {
    pub url: String,
    /// Local path relative to the output directory
    pub filename: Option<String>,
    pub saved: bool,
    pub status: String,
    pub children: Vec<ResourceReport>,
}

impl ResourceReport {
    /// Builds the report tree rooted at `resource`
    ///
    /// Redirect aliases are reported as the resource they resolved to. A
    /// resource reachable along several paths has its children listed only
    /// at its first occurrence, which also cuts reference cycles.
    pub fn from_resource(resource: &Arc<Resource>) -> Self {
        let mut visited = HashSet::new();
        Self::build(resource, &mut visited)
    }

    fn build(resource: &Arc<Resource>, visited: &mut HashSet<*const Resource>) -> Self {
        let node = resource.resolved().unwrap_or_else(|| resource.clone());
        let children = if visited.insert(Arc::as_ptr(&node)) {
            node.children()
                .iter()
                .map(|child| Self::build(child, visited))
                .collect()
        } else {
            Vec::new()
        };

        Self {
            url: node.url().to_string(),
            filename: node.assigned_path().map(str::to_string),
            saved: node.is_saved(),
            status: node.status().as_str().to_string(),
            children,
        }
    }

    /// Number of nodes in this tree, this one included
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ResourceReport::node_count)
            .sum::<usize>()
    }

    /// Finds the first node with the given URL, depth first
    pub fn find(&self, url: &str) -> Option<&ResourceReport> {
        if self.url == url {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(url))
    }
}
