//! A pooled `VkFence` wrapper (§3, §4.4).

use ash::vk;
use derivative::Derivative;
use log::warn;

use crate::pool::{Pool, Poolable, Pooled};

/// A fence either owned by the application (via `vkQueueSubmit`'s `fence` argument) or drawn
/// from the device's internal pool when the application submitted without one (§3).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Fence {
    handle: vk::Fence,
    #[derivative(Debug = "ignore")]
    device: ash::Device,
}

impl Fence {
    pub fn new(handle: vk::Fence, device: ash::Device) -> Self {
        Self { handle, device }
    }

    pub fn handle(&self) -> vk::Fence {
        self.handle
    }
}

impl Poolable for Fence {
    type Key = ();

    /// Resets the underlying `VkFence` before it goes back on the idle list, per §5's
    /// "returned-to-pool fences are reset first".
    fn on_release(&mut self) {
        // SAFETY: `self.handle` is a valid fence created against `self.device`, and is only
        // released once its owning batch has been observed complete, so it is not in use by
        // any pending submission.
        if let Err(e) = unsafe { self.device.reset_fences(&[self.handle]) } {
            warn!("Failed to reset pooled fence: {e}");
        }
    }
}

/// Pool of reusable internal fences, used by [`QueueSubmitter`](crate::submission::tracker::QueueSubmitter)
/// batches the application submitted without its own fence.
#[derive(Clone)]
pub struct FencePool {
    pool: Pool<Fence>,
}

impl std::fmt::Debug for FencePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FencePool").field("idle", &self.pool.idle_count()).finish()
    }
}

impl FencePool {
    pub fn new(device: ash::Device) -> Self {
        Self {
            pool: Pool::new(move |_| {
                let info = vk::FenceCreateInfo::builder();
                // SAFETY: `device` is a valid, live VkDevice outliving this pool.
                let handle = unsafe { device.create_fence(&info, None)? };
                Ok(Fence::new(handle, device.clone()))
            }),
        }
    }

    pub fn acquire(&self) -> anyhow::Result<Pooled<Fence>> {
        self.pool.acquire(())
    }
}
