//! The tracked `VkQueue` wrapper.

use ash::vk;
use ash::vk::Handle;
use derivative::Derivative;

use crate::handle::{HandleMeta, ObjectType};

/// A tracked Vulkan queue. One of these exists per `VkQueue` handed back by
/// `vkGetDeviceQueue`/`vkGetDeviceQueue2` at device-creation time; queues are never created or
/// destroyed afterwards.
///
/// All `vkQueueSubmit`/`vkQueueWaitIdle`/`vkQueueBindSparse` calls for this queue must be made
/// while holding the device's queue mutex (§5) — this type does not serialize access itself,
/// since the mutex is shared across all queues to match the driver's requirement that
/// `vkDeviceWaitIdle` be externally synchronized against every queue at once.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Queue {
    meta: HandleMeta,
    #[derivative(Debug = "ignore")]
    handle: vk::Queue,
    family_index: u32,
    index_in_family: u32,
    flags: vk::QueueFlags,
}

impl Queue {
    pub fn new(handle: vk::Queue, family_index: u32, index_in_family: u32, flags: vk::QueueFlags) -> Self {
        Self {
            meta: HandleMeta::with_id(handle.as_raw(), ObjectType::Queue),
            handle,
            family_index,
            index_in_family,
            flags,
        }
    }

    pub fn meta(&self) -> &HandleMeta {
        &self.meta
    }

    pub fn handle(&self) -> vk::Queue {
        self.handle
    }

    pub fn family_index(&self) -> u32 {
        self.family_index
    }

    pub fn index_in_family(&self) -> u32 {
        self.index_in_family
    }

    /// Whether this queue family supports graphics commands.
    pub fn supports_graphics(&self) -> bool {
        self.flags.contains(vk::QueueFlags::GRAPHICS)
    }

    /// Whether this queue family supports compute commands.
    pub fn supports_compute(&self) -> bool {
        self.flags.contains(vk::QueueFlags::COMPUTE)
    }
}
