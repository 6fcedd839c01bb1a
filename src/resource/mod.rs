//! Buffers and images: the two `MemoryResource` kinds and their binding state.

pub mod memory;
pub mod opaque;

use ash::vk;
use derivative::Derivative;

use crate::handle::{HandleMeta, ObjectType, WeakShared};
use crate::resource::memory::DeviceMemory;

/// The binding state of a single (non-sparse) `MemoryResource`.
///
/// Transitions are one-directional: `Unbound -> Bound -> {MemoryDestroyed, ResourceDestroyed}`,
/// or `Unbound -> ResourceDestroyed` directly if the application never binds memory before
/// destroying the resource. `MemoryDestroyed` does not imply `ResourceDestroyed` and vice
/// versa — both sides of a binding can be torn down independently and the binding record
/// survives as a degenerate entry so a COW/hook-state reference to it keeps resolving (§3).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BindState {
    Unbound,
    Bound,
    MemoryDestroyed,
    ResourceDestroyed,
}

/// One binding of a resource into a `DeviceMemory` allocation.
#[derive(Debug, Clone)]
pub struct MemoryBinding {
    pub memory: WeakShared<DeviceMemory>,
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
    pub state: BindState,
}

/// A single sparse binding, keyed either by resource-relative byte offset (buffers and opaque
/// image bindings) or by subresource + offset (image-sparse bindings).
#[derive(Debug, Clone)]
pub enum SparseBindKey {
    Opaque {
        resource_offset: vk::DeviceSize,
    },
    Image {
        aspect_mask: vk::ImageAspectFlags,
        mip_level: u32,
        array_layer: u32,
        offset: vk::Offset3D,
    },
}

#[derive(Debug, Clone)]
pub struct SparseBinding {
    pub key: SparseBindKey,
    pub memory: WeakShared<DeviceMemory>,
    pub memory_offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
}

/// Whether a `MemoryResource` is bound as a single full-resource binding or as a set of sparse
/// bindings (§3). A resource created with `VK_BUFFER_CREATE_SPARSE_*`/`VK_IMAGE_CREATE_SPARSE_*`
/// uses the latter; all other resources use the former and only ever hold at most one binding.
#[derive(Debug)]
pub enum Binding {
    Full(Option<MemoryBinding>),
    Sparse(Vec<SparseBinding>),
}

/// Distinguishes the two `MemoryResource` flavors the data model folds into one type, since
/// they share binding-state handling and differ only in a handful of type-specific fields.
#[derive(Debug)]
pub enum ResourceKind {
    Buffer {
        handle: vk::Buffer,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
    },
    Image {
        handle: vk::Image,
        extent: vk::Extent3D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        mip_levels: u32,
        array_layers: u32,
    },
}

/// A tracked `VkBuffer` or `VkImage`, unified because both share the same memory-binding model
/// (§3). Unwrapped handle type (§4.1): the id is the driver's raw handle value.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct MemoryResource {
    meta: HandleMeta,
    kind: ResourceKind,
    binding: std::sync::RwLock<Binding>,
}

impl MemoryResource {
    pub fn new_buffer(id: u64, handle: vk::Buffer, size: vk::DeviceSize, usage: vk::BufferUsageFlags, sparse: bool) -> Self {
        Self {
            meta: HandleMeta::with_id(id, ObjectType::Buffer),
            kind: ResourceKind::Buffer { handle, size, usage },
            binding: std::sync::RwLock::new(if sparse { Binding::Sparse(Vec::new()) } else { Binding::Full(None) }),
        }
    }

    pub fn new_image(
        id: u64,
        handle: vk::Image,
        extent: vk::Extent3D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        mip_levels: u32,
        array_layers: u32,
        sparse: bool,
    ) -> Self {
        Self {
            meta: HandleMeta::with_id(id, ObjectType::Image),
            kind: ResourceKind::Image {
                handle,
                extent,
                format,
                usage,
                mip_levels,
                array_layers,
            },
            binding: std::sync::RwLock::new(if sparse { Binding::Sparse(Vec::new()) } else { Binding::Full(None) }),
        }
    }

    pub fn meta(&self) -> &HandleMeta {
        &self.meta
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn is_sparse(&self) -> bool {
        matches!(&*self.binding.read().unwrap(), Binding::Sparse(_))
    }

    /// Bind `memory` to this (non-sparse) resource. Replaces any prior binding record; per the
    /// Vulkan spec a resource is bound to memory at most once in its lifetime, so this should
    /// only ever be called on an `Unbound` resource, but a second call does not panic — it
    /// simply overwrites, leaving diagnosis of the misuse to validation layers upstream.
    pub fn bind_full(&self, memory: WeakShared<DeviceMemory>, offset: vk::DeviceSize, size: vk::DeviceSize) {
        let mut binding = self.binding.write().unwrap();
        *binding = Binding::Full(Some(MemoryBinding {
            memory,
            offset,
            size,
            state: BindState::Bound,
        }));
    }

    pub fn add_sparse_binding(&self, binding: SparseBinding) {
        let mut guard = self.binding.write().unwrap();
        if let Binding::Sparse(bindings) = &mut *guard {
            bindings.push(binding);
        }
    }

    /// Mutate every binding that points into a just-destroyed `DeviceMemory` into
    /// `MemoryDestroyed`, without removing the binding record (§3, DeviceMemory destruction).
    pub fn mark_memory_destroyed(&self) {
        let mut guard = self.binding.write().unwrap();
        match &mut *guard {
            Binding::Full(Some(binding)) if binding.state == BindState::Bound => {
                binding.state = BindState::MemoryDestroyed;
            }
            Binding::Sparse(_) => {
                // Sparse bindings carry only a weak pointer; a destroyed DeviceMemory simply
                // fails to upgrade on the next lookup, so there is no per-binding state to flip.
            }
            _ => {}
        }
    }

    pub fn mark_resource_destroyed(&self) {
        let mut guard = self.binding.write().unwrap();
        if let Binding::Full(Some(binding)) = &mut *guard {
            if binding.state == BindState::Bound {
                binding.state = BindState::ResourceDestroyed;
            }
        }
    }

    pub fn binding_state(&self) -> Option<BindState> {
        match &*self.binding.read().unwrap() {
            Binding::Full(Some(b)) => Some(b.state),
            Binding::Full(None) => Some(BindState::Unbound),
            Binding::Sparse(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn dummy_memory() -> std::sync::Arc<DeviceMemory> {
        Arc::new(DeviceMemory::new(1, 1024, 0))
    }

    #[test]
    fn fresh_buffer_is_unbound() {
        let res = MemoryResource::new_buffer(1, vk::Buffer::null(), 16, vk::BufferUsageFlags::UNIFORM_BUFFER, false);
        assert_eq!(res.binding_state(), Some(BindState::Unbound));
    }

    #[test]
    fn binding_then_memory_destroy_transitions_state() {
        let res = MemoryResource::new_buffer(1, vk::Buffer::null(), 16, vk::BufferUsageFlags::UNIFORM_BUFFER, false);
        let mem = dummy_memory();
        res.bind_full(Arc::downgrade(&mem), 0, 16);
        assert_eq!(res.binding_state(), Some(BindState::Bound));
        res.mark_memory_destroyed();
        assert_eq!(res.binding_state(), Some(BindState::MemoryDestroyed));
    }

    #[test]
    fn resource_destroy_does_not_clear_binding_record() {
        let res = MemoryResource::new_buffer(1, vk::Buffer::null(), 16, vk::BufferUsageFlags::UNIFORM_BUFFER, false);
        let mem = dummy_memory();
        res.bind_full(Arc::downgrade(&mem), 0, 16);
        res.mark_resource_destroyed();
        assert_eq!(res.binding_state(), Some(BindState::ResourceDestroyed));
    }
}
