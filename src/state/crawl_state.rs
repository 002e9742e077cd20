//! Shared bookkeeping for one crawl

use crate::filename::OccupiedNames;
use crate::state::resource::lock;
use crate::state::Resource;
use crate::url::dedup_key;
use crate::MirrorError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

/// Result of inserting a resource into the dedup index
#[derive(Debug)]
pub enum Registration {
    /// The resource is now the canonical node for its URL
    Inserted,
    /// Another resource already owns the URL
    Existing(Arc<Resource>),
}

/// State of a single `scrape` call
///
/// Holds the dedup index, the occupied file names, the persisted resources
/// (for rollback) and the first fatal error. Every critical section is
/// short and never spans an await point.
#[derive(Debug, Default)]
pub struct CrawlState {
    index: Mutex<HashMap<String, Arc<Resource>>>,
    occupied: Mutex<OccupiedNames>,
    persisted: Mutex<Vec<Arc<Resource>>>,
    failure: Mutex<Option<MirrorError>>,
    aborted: AtomicBool,
    /// Redirecting resource (by address) -> the indexed resource it waits on
    redirect_waits: Mutex<HashMap<usize, Arc<Resource>>>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `resource` under `key` unless the key is already owned
    pub fn register(&self, key: String, resource: &Arc<Resource>) -> Registration {
        let mut index = lock(&self.index);
        match index.get(&key) {
            Some(existing) => Registration::Existing(existing.clone()),
            None => {
                index.insert(key, resource.clone());
                Registration::Inserted
            }
        }
    }

    /// Looks up a resource by normalized URL
    pub fn get_loaded_resource(&self, url: &Url) -> Option<Arc<Resource>> {
        let key = dedup_key(url).ok()?;
        self.get_by_key(&key)
    }

    pub fn get_by_key(&self, key: &str) -> Option<Arc<Resource>> {
        lock(&self.index).get(key).cloned()
    }

    /// Number of distinct URLs seen in this crawl
    pub fn len(&self) -> usize {
        lock(&self.index).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.index).is_empty()
    }

    /// Reserves names (configured subdirectories) before any path is assigned
    pub fn reserve_names<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.occupied).reserve(names);
    }

    /// Produces a candidate from the occupied names and claims a unique path
    ///
    /// Candidate generation and the claim happen under one lock, so two
    /// resources can never be handed the same path.
    pub fn claim_path<F>(&self, candidate: F) -> String
    where
        F: FnOnce(&OccupiedNames) -> String,
    {
        let mut occupied = lock(&self.occupied);
        let proposed = candidate(&occupied);
        occupied.claim(&proposed)
    }

    pub fn record_persisted(&self, resource: &Arc<Resource>) {
        lock(&self.persisted).push(resource.clone());
    }

    /// Resources written to storage so far, in save order
    pub fn persisted(&self) -> Vec<Arc<Resource>> {
        lock(&self.persisted).clone()
    }

    /// Records a fatal error and aborts the crawl
    ///
    /// Only the first error is kept. Returns true if this call recorded it.
    pub fn record_failure(&self, error: MirrorError) -> bool {
        self.aborted.store(true, Ordering::SeqCst);
        let mut failure = lock(&self.failure);
        if failure.is_some() {
            return false;
        }
        *failure = Some(error);
        true
    }

    pub fn take_failure(&self) -> Option<MirrorError> {
        lock(&self.failure).take()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Records that `resource` waits on `target` to become its redirect alias
    ///
    /// Returns false, recording nothing, when `target` already waits on
    /// `resource` directly or through other redirects.
    pub fn begin_redirect_wait(&self, resource: &Arc<Resource>, target: &Arc<Resource>) -> bool {
        let mut waits = lock(&self.redirect_waits);
        let mut current = target.clone();
        loop {
            if Arc::ptr_eq(&current, resource) {
                return false;
            }
            match waits.get(&address(&current)) {
                Some(next) => current = next.clone(),
                None => break,
            }
        }
        waits.insert(address(resource), target.clone());
        true
    }

    pub fn end_redirect_wait(&self, resource: &Arc<Resource>) {
        lock(&self.redirect_waits).remove(&address(resource));
    }

    /// Every indexed resource
    pub fn resources(&self) -> Vec<Arc<Resource>> {
        lock(&self.index).values().cloned().collect()
    }
}

fn address(resource: &Arc<Resource>) -> usize {
    Arc::as_ptr(resource) as usize
}

impl Drop for CrawlState {
    // Child lists form reference cycles (A links B, B links A); clearing them
    // lets the nodes be freed.
    fn drop(&mut self) {
        for resource in lock(&self.index).values() {
            resource.clear_children();
        }
    }
}
