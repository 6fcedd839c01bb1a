//! Semaphores: timeline bound tracking and pending sync-op links (§3, §4.4, §11(c)).

use std::sync::atomic::{AtomicU64, Ordering};

use ash::vk;

use crate::pool::{Pool, Poolable, Pooled};

/// A pending signal or wait operation a semaphore is party to, kept so the submission tracker
/// can tell whether a wait is satisfiable without re-querying the driver (grounded on the
/// original's `SyncOp` links, §11(c)).
#[derive(Debug, Clone, Copy)]
pub enum SyncOp {
    Signal { value: Option<u64> },
    Wait { value: Option<u64>, stage: vk::PipelineStageFlags2 },
}

/// A tracked semaphore. Binary semaphores carry no timeline bounds (`lower_bound`/`upper_bound`
/// stay at 0 and are unused); timeline semaphores maintain a cached `[lowerBound, upperBound]`
/// per §3's invariant: `lowerBound` is monotonic, `upperBound` bounds the value the device can
/// observe for any not-yet-retired signal.
#[derive(Debug)]
pub struct Semaphore {
    handle: vk::Semaphore,
    timeline: bool,
    lower_bound: AtomicU64,
    upper_bound: AtomicU64,
    links: std::sync::Mutex<Vec<SyncOp>>,
}

impl Semaphore {
    pub fn new_binary(handle: vk::Semaphore) -> Self {
        Self {
            handle,
            timeline: false,
            lower_bound: AtomicU64::new(0),
            upper_bound: AtomicU64::new(0),
            links: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn new_timeline(handle: vk::Semaphore, initial_value: u64) -> Self {
        Self {
            handle,
            timeline: true,
            lower_bound: AtomicU64::new(initial_value),
            upper_bound: AtomicU64::new(initial_value),
            links: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn handle(&self) -> vk::Semaphore {
        self.handle
    }

    pub fn is_timeline(&self) -> bool {
        self.timeline
    }

    pub fn lower_bound(&self) -> u64 {
        self.lower_bound.load(Ordering::SeqCst)
    }

    pub fn upper_bound(&self) -> u64 {
        self.upper_bound.load(Ordering::SeqCst)
    }

    /// Observe a signal of `value` on this semaphore — app-side `vkSignalSemaphore`, a recorded
    /// signal about to be submitted, or a completed submission's signal (§4.4). Both bounds
    /// only ever move forward.
    pub fn observe_signal(&self, value: u64) {
        self.lower_bound.fetch_max(value, Ordering::SeqCst);
        self.upper_bound.fetch_max(value, Ordering::SeqCst);
    }

    /// Observe that a signal of `value` has been submitted but not yet retired: the device may
    /// come to observe this value, so it bounds `upperBound`, but `lowerBound` — values the
    /// semaphore is guaranteed to have already reached — does not advance yet.
    pub fn observe_pending_signal(&self, value: u64) {
        self.upper_bound.fetch_max(value, Ordering::SeqCst);
    }

    /// Whether a wait for `value` is already known-satisfiable without a driver round-trip.
    pub fn wait_is_satisfied(&self, value: u64) -> bool {
        self.lower_bound() >= value
    }

    pub fn push_link(&self, op: SyncOp) {
        self.links.lock().unwrap().push(op);
    }

    pub fn take_links(&self) -> Vec<SyncOp> {
        std::mem::take(&mut *self.links.lock().unwrap())
    }
}

impl Poolable for Semaphore {
    type Key = bool;

    fn on_release(&mut self) {
        self.links.lock().unwrap().clear();
        if !self.timeline {
            // Binary semaphores go back to the unsignaled state on release; the pool's create
            // closure is responsible for actually calling `vkResetFences`-equivalent handling
            // for whichever binary-reset strategy the embedding chooses (wait-then-reuse is the
            // common one and needs no explicit reset call).
        }
    }
}

/// Pool of reusable semaphores, keyed by whether a timeline semaphore was requested.
#[derive(Clone)]
pub struct SemaphorePool {
    pool: Pool<Semaphore>,
}

impl std::fmt::Debug for SemaphorePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemaphorePool").field("idle", &self.pool.idle_count()).finish()
    }
}

impl SemaphorePool {
    pub fn new() -> Self {
        Self {
            pool: Pool::new(|timeline| {
                Ok(if *timeline {
                    Semaphore::new_timeline(vk::Semaphore::null(), 0)
                } else {
                    Semaphore::new_binary(vk::Semaphore::null())
                })
            }),
        }
    }

    pub fn acquire(&self, timeline: bool) -> anyhow::Result<Pooled<Semaphore>> {
        self.pool.acquire(timeline)
    }
}

impl Default for SemaphorePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_only_move_forward() {
        let sem = Semaphore::new_timeline(vk::Semaphore::null(), 0);
        sem.observe_signal(5);
        sem.observe_signal(3);
        assert_eq!(sem.lower_bound(), 5);
        assert_eq!(sem.upper_bound(), 5);
    }

    #[test]
    fn pending_signal_only_advances_upper_bound() {
        let sem = Semaphore::new_timeline(vk::Semaphore::null(), 0);
        sem.observe_pending_signal(10);
        assert_eq!(sem.upper_bound(), 10);
        assert_eq!(sem.lower_bound(), 0);
        assert!(!sem.wait_is_satisfied(10));
        sem.observe_signal(10);
        assert!(sem.wait_is_satisfied(10));
    }
}
