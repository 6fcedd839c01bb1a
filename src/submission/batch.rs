//! `Submission` and `SubmissionBatch` (§3, §4.4).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ash::vk;

use crate::handle::Shared;
use crate::hook::submission::CommandHookSubmission;
use crate::pool::Pooled;
use crate::submission::fence::Fence;
use crate::submission::semaphore::Semaphore;

/// A single `{semaphore, value, stage}` wait or signal entry, matching the fields every
/// `VkSemaphoreSubmitInfo` carries regardless of whether the semaphore is binary or timeline
/// (`value` is `None` for binary).
#[derive(Clone)]
pub struct SemaphoreRef {
    pub semaphore: Shared<Semaphore>,
    pub value: Option<u64>,
    pub stage: vk::PipelineStageFlags2,
}

impl std::fmt::Debug for SemaphoreRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemaphoreRef")
            .field("handle", &self.semaphore.handle())
            .field("value", &self.value)
            .finish()
    }
}

/// One `VkSubmitInfo` worth of work (§3). Submissions are grouped into a [`SubmissionBatch`],
/// one per `vkQueueSubmit` call.
#[derive(Debug)]
pub struct Submission {
    pub waits: Vec<SemaphoreRef>,
    pub signals: Vec<SemaphoreRef>,
    pub command_buffers: Vec<u64>,
    pub hook_data: std::sync::Mutex<Option<Arc<CommandHookSubmission>>>,
    /// The layer's own semaphore used to chain dependencies across this submission and any
    /// hook-inserted work, signaled alongside the application's own signals. Held as the
    /// `Pooled` guard itself (not re-wrapped) so the pool cannot hand the same handle to
    /// another submission while this one is still in flight.
    pub our_semaphore: Pooled<Semaphore>,
    active: AtomicBool,
}

impl Submission {
    pub fn new(waits: Vec<SemaphoreRef>, signals: Vec<SemaphoreRef>, command_buffers: Vec<u64>, our_semaphore: Pooled<Semaphore>) -> Self {
        Self {
            waits,
            signals,
            command_buffers,
            hook_data: std::sync::Mutex::new(None),
            our_semaphore,
            active: AtomicBool::new(true),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn attach_hook(&self, hook: Arc<CommandHookSubmission>) {
        *self.hook_data.lock().unwrap() = Some(hook);
    }
}

/// Which fence a batch waits on for completion: the application's own, or one drawn from the
/// device's internal pool when the application submitted without one (§3, §4.4).
pub enum BatchFence {
    Application(vk::Fence),
    Pooled(Pooled<Fence>),
}

impl BatchFence {
    pub fn handle(&self) -> vk::Fence {
        match self {
            BatchFence::Application(f) => *f,
            BatchFence::Pooled(f) => f.handle(),
        }
    }
}

impl std::fmt::Debug for BatchFence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BatchFence({:?})", self.handle())
    }
}

/// All submissions from a single `vkQueueSubmit` call.
#[derive(Debug)]
pub struct SubmissionBatch {
    pub id: u64,
    pub queue_family_index: u32,
    pub submissions: Vec<Submission>,
    pub fence: BatchFence,
}

impl SubmissionBatch {
    pub fn new(id: u64, queue_family_index: u32, submissions: Vec<Submission>, fence: BatchFence) -> Self {
        Self {
            id,
            queue_family_index,
            submissions,
            fence,
        }
    }

    pub fn is_complete(&self, device: &ash::Device) -> bool {
        // SAFETY: `self.fence.handle()` is a valid fence for the lifetime of `device`.
        unsafe { device.get_fence_status(self.fence.handle()).unwrap_or(false) }
    }

    pub fn deactivate_all(&self) {
        for s in &self.submissions {
            s.deactivate();
        }
    }
}
