//! `DeviceMemory` and its reverse binding index.

use std::collections::BTreeSet;
use std::sync::{RwLock, Weak};

use ash::vk;

use crate::handle::{HandleMeta, ObjectType};
use crate::resource::MemoryResource;

/// A binding reference kept in a `DeviceMemory`'s reverse index: which resource is bound, and
/// at what offset into this allocation, so the set can be kept sorted by offset for diagnostics
/// and overlap queries.
#[derive(Debug, Clone)]
pub struct BoundResource {
    pub offset: vk::DeviceSize,
    pub resource: Weak<MemoryResource>,
    /// Disambiguates resources bound at the same offset (never happens validly, but keeps the
    /// `BTreeSet` ordering total without requiring `MemoryResource: Ord`).
    pub resource_id: u64,
}

impl PartialEq for BoundResource {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset && self.resource_id == other.resource_id
    }
}
impl Eq for BoundResource {}
impl PartialOrd for BoundResource {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for BoundResource {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.offset, self.resource_id).cmp(&(other.offset, other.resource_id))
    }
}

/// A tracked `VkDeviceMemory` allocation. Unwrapped handle type (§4.1).
///
/// Holds the reverse index of §3: a sorted set of every binding that currently points into
/// this allocation, so destroying the memory can walk and invalidate every bound resource
/// without needing to scan the device's full resource registry.
#[derive(Debug)]
pub struct DeviceMemory {
    meta: HandleMeta,
    size: vk::DeviceSize,
    memory_type_index: u32,
    bindings: RwLock<BTreeSet<BoundResource>>,
}

impl DeviceMemory {
    pub fn new(id: u64, size: vk::DeviceSize, memory_type_index: u32) -> Self {
        Self {
            meta: HandleMeta::with_id(id, ObjectType::DeviceMemory),
            size,
            memory_type_index,
            bindings: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn meta(&self) -> &HandleMeta {
        &self.meta
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    pub fn memory_type_index(&self) -> u32 {
        self.memory_type_index
    }

    /// Record that `resource` is now bound at `offset` into this allocation.
    pub fn record_binding(&self, resource_id: u64, offset: vk::DeviceSize, resource: Weak<MemoryResource>) {
        self.bindings.write().unwrap().insert(BoundResource {
            offset,
            resource,
            resource_id,
        });
    }

    /// Mutate every still-live bound resource into `MemoryDestroyed` without removing the
    /// reverse-index entries, mirroring `MemoryResource`'s own binding records surviving
    /// destruction (§3).
    pub fn mark_all_destroyed(&self) {
        for bound in self.bindings.read().unwrap().iter() {
            if let Some(resource) = bound.resource.upgrade() {
                resource.mark_memory_destroyed();
            }
        }
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn destroying_memory_marks_every_bound_resource() {
        let mem = Arc::new(DeviceMemory::new(1, 4096, 0));
        let res_a = Arc::new(MemoryResource::new_buffer(10, vk::Buffer::null(), 16, vk::BufferUsageFlags::UNIFORM_BUFFER, false));
        let res_b = Arc::new(MemoryResource::new_buffer(11, vk::Buffer::null(), 32, vk::BufferUsageFlags::UNIFORM_BUFFER, false));
        res_a.bind_full(Arc::downgrade(&mem), 0, 16);
        res_b.bind_full(Arc::downgrade(&mem), 16, 32);
        mem.record_binding(10, 0, Arc::downgrade(&res_a));
        mem.record_binding(11, 16, Arc::downgrade(&res_b));

        mem.mark_all_destroyed();

        assert_eq!(res_a.binding_state(), Some(crate::resource::BindState::MemoryDestroyed));
        assert_eq!(res_b.binding_state(), Some(crate::resource::BindState::MemoryDestroyed));
        assert_eq!(mem.binding_count(), 2);
    }
}
