//! The resource node of the crawl graph

use crate::state::{ResourceKind, ResourceStatus};
use crate::{MirrorError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use tokio::sync::OnceCell;
use url::Url;

/// Outcome of the first phase (fetch and path assignment) of a resource
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Fetched, classified and named; processing runs separately
    Ready,
    /// The fetch redirected onto a URL another resource already owns
    Alias(Arc<Resource>),
    /// Vetoed by a plugin; treated as a missing reference
    Missing,
    /// Fetch failed
    Failed,
}

/// One fetchable unit of the crawl graph
///
/// Resources are shared as `Arc<Resource>`; mutable parts sit behind short
/// lived locks that are never held across an await point.
pub struct Resource {
    source_url: Url,
    url: Mutex<Url>,
    filename_hint: Option<String>,
    depth: u32,
    parent: Option<Weak<Resource>>,
    children: Mutex<Vec<Arc<Resource>>>,
    kind: OnceLock<ResourceKind>,
    assigned_path: OnceLock<String>,
    body: Mutex<Vec<u8>>,
    metadata: Mutex<HashMap<String, String>>,
    status: Mutex<ResourceStatus>,
    resolution: OnceCell<Resolution>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("url", &self.source_url.as_str())
            .field("depth", &self.depth)
            .field("status", &self.status())
            .field("assigned_path", &self.assigned_path())
            .finish()
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Resource {
    fn new(url: Url, filename_hint: Option<String>, depth: u32, parent: Option<Weak<Resource>>) -> Self {
        Self {
            source_url: url.clone(),
            url: Mutex::new(url),
            filename_hint,
            depth,
            parent,
            children: Mutex::new(Vec::new()),
            kind: OnceLock::new(),
            assigned_path: OnceLock::new(),
            body: Mutex::new(Vec::new()),
            metadata: Mutex::new(HashMap::new()),
            status: Mutex::new(ResourceStatus::Pending),
            resolution: OnceCell::new(),
        }
    }

    /// Creates a seed resource at depth 0
    pub fn new_root(url: Url, filename_hint: Option<String>) -> Arc<Self> {
        Arc::new(Self::new(url, filename_hint, 0, None))
    }

    /// Creates a child one level deeper and appends it to `children`
    ///
    /// No dedup lookup happens here; the orchestrator reconciles the new
    /// node with the index through [`Resource::update_child`].
    pub fn create_child(self: &Arc<Self>, url: Url, filename_hint: Option<String>) -> Arc<Self> {
        let child = Arc::new(Self::new(
            url,
            filename_hint,
            self.depth + 1,
            Some(Arc::downgrade(self)),
        ));
        lock(&self.children).push(child.clone());
        child
    }

    /// Replaces `old` (matched by identity) with `new` in `children`
    ///
    /// Returns false if `old` is not a child of this resource.
    pub fn update_child(&self, old: &Arc<Resource>, new: Arc<Resource>) -> bool {
        let mut children = lock(&self.children);
        match children.iter_mut().find(|child| Arc::ptr_eq(child, old)) {
            Some(slot) => {
                *slot = new;
                true
            }
            None => false,
        }
    }

    /// URL the resource was discovered under
    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    /// Current URL; the final URL once a redirect has been followed
    pub fn url(&self) -> Url {
        lock(&self.url).clone()
    }

    pub(crate) fn set_url(&self, url: Url) {
        *lock(&self.url) = url;
    }

    pub fn filename_hint(&self) -> Option<&str> {
        self.filename_hint.as_deref()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn parent(&self) -> Option<Arc<Resource>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn children(&self) -> Vec<Arc<Resource>> {
        lock(&self.children).clone()
    }

    pub(crate) fn clear_children(&self) {
        lock(&self.children).clear();
    }

    pub fn kind(&self) -> Option<ResourceKind> {
        self.kind.get().copied()
    }

    pub(crate) fn set_kind(&self, kind: ResourceKind) -> bool {
        self.kind.set(kind).is_ok()
    }

    /// Local path relative to the output root, once assigned
    pub fn assigned_path(&self) -> Option<&str> {
        self.assigned_path.get().map(String::as_str)
    }

    pub(crate) fn set_assigned_path(&self, path: String) -> bool {
        self.assigned_path.set(path).is_ok()
    }

    pub fn body(&self) -> Vec<u8> {
        lock(&self.body).clone()
    }

    /// Body as text
    ///
    /// A body that is not valid UTF-8 is widened byte by byte (each byte
    /// becomes the char with the same value), so ASCII markup keeps its
    /// offsets and [`set_text`](Self::set_text) restores untouched bytes
    /// exactly.
    pub fn text(&self) -> String {
        let body = lock(&self.body);
        match std::str::from_utf8(&body) {
            Ok(text) => text.to_string(),
            Err(_) => body.iter().map(|&byte| char::from(byte)).collect(),
        }
    }

    pub fn set_body(&self, body: Vec<u8>) {
        *lock(&self.body) = body;
    }

    /// Replaces the body with text obtained from [`text`](Self::text)
    pub fn set_text(&self, text: String) {
        let mut body = lock(&self.body);
        *body = if std::str::from_utf8(&body).is_ok() {
            text.into_bytes()
        } else {
            narrow(&text)
        };
    }

    pub fn metadata(&self) -> HashMap<String, String> {
        lock(&self.metadata).clone()
    }

    pub fn set_metadata(&self, metadata: HashMap<String, String>) {
        *lock(&self.metadata) = metadata;
    }

    pub fn status(&self) -> ResourceStatus {
        *lock(&self.status)
    }

    /// Moves the resource to `next`, rejecting backward or illegal moves
    pub fn set_status(&self, next: ResourceStatus) -> Result<()> {
        let mut status = lock(&self.status);
        if !status.can_transition_to(next) {
            return Err(MirrorError::InvalidTransition {
                url: self.source_url.to_string(),
                from: *status,
                to: next,
            });
        }
        *status = next;
        Ok(())
    }

    pub fn is_saved(&self) -> bool {
        self.status().is_success()
    }

    pub(crate) fn resolution(&self) -> &OnceCell<Resolution> {
        &self.resolution
    }

    /// The canonical resource this one resolved to, if it resolved at all
    ///
    /// Follows redirect aliases. Returns `None` while unresolved and for
    /// missing or failed resources.
    pub fn resolved(self: &Arc<Self>) -> Option<Arc<Resource>> {
        let mut current = self.clone();
        loop {
            let next = match current.resolution.get() {
                Some(Resolution::Ready) => None,
                Some(Resolution::Alias(target)) => Some(target.clone()),
                _ => return None,
            };
            match next {
                None => return Some(current),
                Some(next) if Arc::ptr_eq(&next, &current) => return None,
                Some(next) => current = next,
            }
        }
    }
}

/// Inverse of the widening in [`Resource::text`]
///
/// Chars above U+00FF can only come from rewritten references and are
/// written as UTF-8.
fn narrow(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        match u8::try_from(u32::from(c)) {
            Ok(byte) => bytes.push(byte),
            Err(_) => {
                let mut buf = [0; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    bytes
}
