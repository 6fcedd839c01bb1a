//! The root of the tracked object model.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, RwLock};

use anyhow::Result;
use ash::vk;
use derivative::Derivative;

use crate::command::allocator::CommandAllocator;
use crate::command::CommandRecord;
use crate::config::Config;
use crate::descriptor::{DescriptorPool, DescriptorSet, DescriptorSetLayout};
use crate::error::Error;
use crate::handle::queue::Queue;
use crate::handle::registry::HandleMap;
use crate::handle::{HandleId, ObjectType, Shared};
use crate::hook::accel_structure::AccelerationStructure;
use crate::hook::CommandHook;
use crate::resource::memory::DeviceMemory;
use crate::resource::opaque::{BufferView, ImageView, Sampler};
use crate::resource::MemoryResource;
use crate::submission::fence::FencePool;
use crate::submission::frame::{Frame, FrameHistory};
use crate::submission::semaphore::SemaphorePool;
use crate::submission::SubmissionBatch;

/// Everything protected by the device's coarse state mutex: every handle registry plus the
/// bookkeeping that spans more than one object type. A single `RwLock` around this struct
/// plays the role of §3's "state mutex protecting all maps and cross-object invariants" more
/// directly than per-map locks would, at the cost of serializing unrelated object types'
/// insert/erase traffic against each other — acceptable since object creation/destruction is
/// rare compared to submission and recording traffic, which do not take this lock.
#[derive(Debug)]
pub struct DeviceState {
    pub buffers: HandleMap<MemoryResource>,
    pub images: HandleMap<MemoryResource>,
    pub device_memory: HandleMap<DeviceMemory>,
    pub samplers: HandleMap<Sampler>,
    pub image_views: HandleMap<ImageView>,
    pub buffer_views: HandleMap<BufferView>,
    pub accel_structures: HandleMap<AccelerationStructure>,
    pub descriptor_set_layouts: HandleMap<DescriptorSetLayout>,
    pub descriptor_pools: HandleMap<DescriptorPool>,
    pub descriptor_sets: HandleMap<DescriptorSet>,
    pub command_records: HandleMap<CommandRecord>,
    pub pending_submissions: Vec<Shared<SubmissionBatch>>,
    /// Batches submitted since the last [`Device::end_frame`] call, moved into a [`Frame`] and
    /// pushed onto frame history there (§3, §4.5).
    pub current_frame_batches: Vec<Shared<SubmissionBatch>>,
    pub device_lost: bool,
}

impl DeviceState {
    /// `pub(crate)` rather than private: builder/matcher unit tests construct an empty
    /// registry set directly, without a live `ash::Device`.
    pub(crate) fn new() -> Self {
        Self {
            buffers: HandleMap::new(ObjectType::Buffer),
            images: HandleMap::new(ObjectType::Image),
            device_memory: HandleMap::new(ObjectType::DeviceMemory),
            samplers: HandleMap::new(ObjectType::Sampler),
            image_views: HandleMap::new(ObjectType::ImageView),
            buffer_views: HandleMap::new(ObjectType::BufferView),
            accel_structures: HandleMap::new(ObjectType::AccelerationStructure),
            descriptor_set_layouts: HandleMap::new(ObjectType::DescriptorSetLayout),
            descriptor_pools: HandleMap::new(ObjectType::DescriptorPool),
            descriptor_sets: HandleMap::new(ObjectType::DescriptorSet),
            command_records: HandleMap::new(ObjectType::CommandBuffer),
            pending_submissions: Vec::new(),
            current_frame_batches: Vec::new(),
            device_lost: false,
        }
    }

    /// Every record that still references `id`, used to drive destroy-time invalidation
    /// (§4.1) without needing the intrusive cross-record linked list the spec's prose
    /// describes — this reverse scan serves the same purpose.
    fn records_using(&self, id: HandleId) -> Vec<Shared<CommandRecord>> {
        self.command_records.snapshot().into_iter().filter(|r| r.uses_handle(id)).collect()
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
struct DeviceInner {
    #[derivative(Debug = "ignore")]
    handle: ash::Device,
    queues: Vec<Shared<Queue>>,
    /// One internal command pool per queue family, used by the command hook to allocate the
    /// hook command buffers it submits alongside the application's own (§4.6). Guarded
    /// separately from `state` since pool allocation happens on the submission path, which
    /// must not contend with object creation/destruction.
    #[derivative(Debug = "ignore")]
    internal_command_pools: Mutex<HashMap<u32, vk::CommandPool>>,
    fence_pool: FencePool,
    semaphore_pool: SemaphorePool,
    command_allocator: CommandAllocator,
    config: Config,
    timeline_semaphores_supported: bool,
    state: RwLock<DeviceState>,
    /// Serializes every `vkQueueSubmit`/`vkQueueWaitIdle`/`vkDeviceWaitIdle` call made through
    /// this device, matching the driver's requirement that submissions to queues from the same
    /// device, and any `vkDeviceWaitIdle`, be externally synchronized against each other (§5).
    queue_mutex: Mutex<()>,
    /// The installed command hook, if any (§4.6). `None` until an embedding GUI/overlay selects
    /// a command to inspect.
    hook: RwLock<Option<CommandHook>>,
    /// 2-slot timestamp query pool the hook writes its begin/end timestamps into, created lazily
    /// on first use.
    #[derivative(Debug = "ignore")]
    hook_query_pool: Mutex<Option<vk::QueryPool>>,
    frame_history: Mutex<FrameHistory>,
}

/// Wrapper around a `VkDevice` that the application has created. Internal state lives behind
/// an `Arc`, so `Device` is cheap to clone and share across threads, matching the base crate's
/// `Device` wrapper.
#[derive(Debug, Clone)]
pub struct Device {
    inner: std::sync::Arc<DeviceInner>,
}

unsafe impl Send for Device {}
unsafe impl Sync for Device {}

impl Device {
    /// Wrap an already-created `VkDevice` and its queues. The layer never creates the device
    /// itself — it intercepts an application-driven `vkCreateDevice` and wraps the result.
    /// `timeline_semaphores_supported` mirrors whatever `VkPhysicalDeviceVulkan12Features` (or
    /// the `VK_KHR_timeline_semaphore` extension) the application enabled, queried once up
    /// front since it never changes for the device's lifetime.
    pub fn new(handle: ash::Device, queues: Vec<Shared<Queue>>, config: Config, timeline_semaphores_supported: bool) -> Result<Self> {
        Ok(Self {
            inner: std::sync::Arc::new(DeviceInner {
                fence_pool: FencePool::new(handle.clone()),
                semaphore_pool: SemaphorePool::new(),
                frame_history: Mutex::new(FrameHistory::new(config.frame_history_capacity)),
                handle,
                queues,
                internal_command_pools: Mutex::new(HashMap::new()),
                command_allocator: CommandAllocator::new(config.allocator_block_ttl_ms),
                config,
                timeline_semaphores_supported,
                state: RwLock::new(DeviceState::new()),
                queue_mutex: Mutex::new(()),
                hook: RwLock::new(None),
                hook_query_pool: Mutex::new(None),
            }),
        })
    }

    pub fn handle(&self) -> &ash::Device {
        &self.inner.handle
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn queues(&self) -> &[Shared<Queue>] {
        &self.inner.queues
    }

    pub fn queue(&self, family_index: u32, index_in_family: u32) -> Option<Shared<Queue>> {
        self.inner
            .queues
            .iter()
            .find(|q| q.family_index() == family_index && q.index_in_family() == index_in_family)
            .cloned()
    }

    pub fn fence_pool(&self) -> &FencePool {
        &self.inner.fence_pool
    }

    pub fn semaphore_pool(&self) -> &SemaphorePool {
        &self.inner.semaphore_pool
    }

    pub fn command_allocator(&self) -> &CommandAllocator {
        &self.inner.command_allocator
    }

    pub fn supports_timeline_semaphores(&self) -> bool {
        self.inner.timeline_semaphores_supported
    }

    /// Acquire a read lock on the shared handle-registry state.
    pub fn state(&self) -> std::sync::RwLockReadGuard<'_, DeviceState> {
        self.inner.state.read().unwrap_or_else(|p| p.into_inner())
    }

    /// Acquire a write lock on the shared handle-registry state.
    pub fn state_mut(&self) -> std::sync::RwLockWriteGuard<'_, DeviceState> {
        self.inner.state.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Acquire the queue mutex. Hold this guard for the duration of a `vkQueueSubmit`,
    /// `vkQueueWaitIdle`, or `vkDeviceWaitIdle` call.
    pub fn lock_queue(&self) -> MutexGuard<'_, ()> {
        self.inner.queue_mutex.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Fetch or lazily create the internal command pool for a queue family, used by the
    /// command hook to allocate hook command buffers.
    pub fn internal_command_pool(&self, family_index: u32) -> Result<vk::CommandPool> {
        let mut pools = self
            .inner
            .internal_command_pools
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        if let Some(pool) = pools.get(&family_index) {
            return Ok(*pool);
        }
        let info = vk::CommandPoolCreateInfo::builder()
            .queue_family_index(family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .build();
        // SAFETY: `self.inner.handle` is a valid, live VkDevice for the lifetime of `self`.
        let pool = unsafe { self.inner.handle.create_command_pool(&info, None)? };
        pools.insert(family_index, pool);
        Ok(pool)
    }

    /// Install (or replace) the command hook (§4.6), e.g. when an embedding GUI selects a new
    /// command to inspect.
    pub fn install_hook(&self, hook: CommandHook) {
        *self.inner.hook.write().unwrap_or_else(|p| p.into_inner()) = Some(hook);
    }

    /// Remove the installed hook, if any. Submissions stop being re-recorded until a new one is
    /// installed.
    pub fn clear_hook(&self) {
        *self.inner.hook.write().unwrap_or_else(|p| p.into_inner()) = None;
    }

    /// Run `f` against the installed hook, if any. Used by [`crate::submission::tracker`] to
    /// decide whether a submission's command buffers should be re-recorded (§4.6 step 1).
    pub fn with_hook<R>(&self, f: impl FnOnce(&CommandHook) -> R) -> Option<R> {
        self.inner.hook.read().unwrap_or_else(|p| p.into_inner()).as_ref().map(f)
    }

    /// Fetch or lazily create the 2-slot timestamp query pool the hook's re-recorded command
    /// buffers write their begin/end timestamps into (§4.6 step 3).
    pub fn internal_query_pool(&self) -> Result<vk::QueryPool> {
        let mut slot = self.inner.hook_query_pool.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(pool) = *slot {
            return Ok(pool);
        }
        let info = vk::QueryPoolCreateInfo::builder().query_type(vk::QueryType::TIMESTAMP).query_count(2).build();
        // SAFETY: `self.inner.handle` is a valid, live VkDevice for the lifetime of `self`.
        let pool = unsafe { self.inner.handle.create_query_pool(&info, None)? };
        *slot = Some(pool);
        Ok(pool)
    }

    /// `vkQueuePresentKHR`: close out the current frame, moving every batch submitted since the
    /// previous present into frame history (§3, §4.5). This crate intercepts no WSI entry points
    /// of its own (§2); an embedding layer that does call this once per present.
    pub fn end_frame(&self) {
        let frame = {
            let mut state = self.state_mut();
            let mut frame = Frame::default();
            for batch in state.current_frame_batches.drain(..) {
                frame.push(batch);
            }
            frame
        };
        self.inner
            .frame_history
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_completed_frame(frame);
    }

    /// Run `f` against the retained frame history, used by the matcher to re-locate a selection
    /// after a re-record (§4.5).
    pub fn with_frame_history<R>(&self, f: impl FnOnce(&FrameHistory) -> R) -> R {
        f(&self.inner.frame_history.lock().unwrap_or_else(|p| p.into_inner()))
    }

    /// Mark the device as lost following a `VK_ERROR_DEVICE_LOST` return from any call. No
    /// further command hooks are activated once this is set (§5).
    pub fn mark_device_lost(&self) {
        self.state_mut().device_lost = true;
    }

    pub fn is_device_lost(&self) -> bool {
        self.state().device_lost
    }

    /// Look up a handle id by raw value, returning the appropriate not-found error if absent.
    pub fn resolve_buffer(&self, id: HandleId) -> Result<Shared<MemoryResource>, Error> {
        self.state().buffers.get(id)
    }

    pub fn resolve_image(&self, id: HandleId) -> Result<Shared<MemoryResource>, Error> {
        self.state().images.get(id)
    }

    /// Every record that still references `id` learns it was destroyed (§4.1), so the matcher
    /// can keep aligning a record against its originally selected command even after the
    /// handle that command pointed at has since been torn down. Never called while holding
    /// `state`/`state_mut`'s lock, since `records_using` itself acquires a read guard.
    fn note_records_handle_destroyed(&self, id: HandleId) {
        for record in self.state().records_using(id) {
            record.note_handle_destroyed(id);
        }
    }

    /// `vkDestroyBuffer`: remove the buffer from the registry, flip its binding state, and
    /// propagate the destruction to every record that referenced it (§4.1). Destroying an
    /// unknown handle is a no-op rather than an error, matching the Vulkan spec's "`VK_NULL_HANDLE`
    /// is silently accepted" rule extended to already-removed handles.
    pub fn destroy_buffer(&self, id: HandleId) {
        let removed = self.state_mut().buffers.remove(id);
        if let Ok(buffer) = removed {
            buffer.mark_resource_destroyed();
            self.note_records_handle_destroyed(id);
        }
    }

    pub fn destroy_image(&self, id: HandleId) {
        let removed = self.state_mut().images.remove(id);
        if let Ok(image) = removed {
            image.mark_resource_destroyed();
            self.note_records_handle_destroyed(id);
        }
    }

    /// `vkFreeMemory`: remove the allocation and invalidate every resource still bound into it
    /// (§3) before propagating the destruction to referencing records.
    pub fn free_memory(&self, id: HandleId) {
        let removed = self.state_mut().device_memory.remove(id);
        if let Ok(memory) = removed {
            memory.mark_all_destroyed();
            self.note_records_handle_destroyed(id);
        }
    }

    /// `vkFreeDescriptorSets`/pool destruction: detach any outstanding COW snapshot so holders
    /// keep a private frozen view, then propagate to referencing records (§4.1, §4.8).
    pub fn destroy_descriptor_set(&self, id: HandleId) {
        let removed = self.state_mut().descriptor_sets.remove(id);
        if let Ok(set) = removed {
            set.on_destroy();
            self.note_records_handle_destroyed(id);
        }
    }

    /// `vkDestroySampler`/`vkDestroyImageView`/`vkDestroyBufferView`: these carry no state
    /// beyond identity (§4.1), so destruction is a plain registry removal. Any
    /// [`DescriptorContents`](crate::descriptor::set::DescriptorContents) that already resolved
    /// a strong reference keeps it alive regardless (§4.8).
    pub fn destroy_sampler(&self, id: HandleId) {
        let _ = self.state_mut().samplers.remove(id);
    }

    pub fn destroy_image_view(&self, id: HandleId) {
        let _ = self.state_mut().image_views.remove(id);
    }

    pub fn destroy_buffer_view(&self, id: HandleId) {
        let _ = self.state_mut().buffer_views.remove(id);
    }
}
