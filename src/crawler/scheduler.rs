//! Concurrency control for a crawl
//!
//! Two concerns live here: the global limit on simultaneous fetches, and
//! the count of spawned processing tasks the crawl must wait for before it
//! can finish.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore, SemaphorePermit};

/// Fetch limiter and in-flight task tracker
#[derive(Debug)]
pub struct Scheduler {
    /// Permits for concurrent fetches
    fetch_permits: Semaphore,

    /// Spawned tasks that have not finished yet
    in_flight: Arc<AtomicUsize>,

    /// Signalled when `in_flight` drops to zero
    idle: Arc<Notify>,
}

/// Decrements the in-flight count when a task ends, even by panic
struct TaskGuard {
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

impl Scheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `max_concurrent_fetches` - Fetch limit, `None` for unlimited
    pub fn new(max_concurrent_fetches: Option<usize>) -> Self {
        let permits = max_concurrent_fetches
            .unwrap_or(Semaphore::MAX_PERMITS)
            .clamp(1, Semaphore::MAX_PERMITS);

        Self {
            fetch_permits: Semaphore::new(permits),
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    /// Waits for a fetch slot; the slot is released when the permit drops
    pub async fn acquire(&self) -> Option<SemaphorePermit<'_>> {
        self.fetch_permits.acquire().await.ok()
    }

    pub fn available_permits(&self) -> usize {
        self.fetch_permits.available_permits()
    }

    /// Spawns a tracked task
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = TaskGuard {
            in_flight: self.in_flight.clone(),
            idle: self.idle.clone(),
        };
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Resolves once no tracked task is running
    ///
    /// Tasks spawned by tracked tasks are counted before their parent ends,
    /// so the count only reaches zero when the whole tree is done.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}
