//! `DescriptorPool`: backing arena plus the set of sets allocated from it.

use std::sync::{Mutex, Weak};

use ash::vk;
use derivative::Derivative;

use crate::descriptor::set::DescriptorSet;
use crate::handle::{HandleMeta, ObjectType};

#[derive(Derivative)]
#[derivative(Debug)]
struct PoolState {
    /// Backing byte arena for binding data belonging to sets allocated from this pool. This
    /// core does not need to model the driver's own memory layout for the pool — only that
    /// writes into allocated sets are served from *some* arena owned here, matching §3's
    /// "a DescriptorPool owns its backing byte arena".
    #[derivative(Debug = "ignore")]
    arena: Vec<u8>,
    allocated: Vec<Weak<DescriptorSet>>,
}

/// A tracked `VkDescriptorPool`. Unwrapped handle type (§4.1).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DescriptorPool {
    meta: HandleMeta,
    flags: vk::DescriptorPoolCreateFlags,
    state: Mutex<PoolState>,
}

impl DescriptorPool {
    pub fn new(id: u64, flags: vk::DescriptorPoolCreateFlags) -> Self {
        Self {
            meta: HandleMeta::with_id(id, ObjectType::DescriptorPool),
            flags,
            state: Mutex::new(PoolState {
                arena: Vec::new(),
                allocated: Vec::new(),
            }),
        }
    }

    pub fn meta(&self) -> &HandleMeta {
        &self.meta
    }

    pub fn is_free_descriptor_set(&self) -> bool {
        self.flags.contains(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
    }

    /// Register a set freshly allocated from this pool and reserve its binding storage in the
    /// arena.
    pub fn track_allocation(&self, set: &std::sync::Arc<DescriptorSet>, binding_bytes: usize) {
        let mut state = self.state.lock().unwrap();
        state.arena.resize(state.arena.len() + binding_bytes, 0);
        state.allocated.push(std::sync::Arc::downgrade(set));
    }

    /// Drop any now-dead weak references, called opportunistically on reset/destroy.
    pub fn reap_freed(&self) {
        self.state.lock().unwrap().allocated.retain(|w| w.strong_count() > 0);
    }

    pub fn allocated_count(&self) -> usize {
        self.state.lock().unwrap().allocated.iter().filter(|w| w.strong_count() > 0).count()
    }

    /// `vkResetDescriptorPool`: every set allocated from this pool becomes implicitly freed.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.allocated.clear();
        state.arena.clear();
    }
}
