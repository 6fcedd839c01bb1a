//! Thin tracked handles for the Vulkan object types this core models only by identity —
//! samplers, image views, buffer views — which descriptor bindings reference but need no
//! richer state than the rest of the object model already provides (§4.1: unwrapped handle
//! types, the id is the driver's raw handle value).

use crate::handle::{HandleId, HandleMeta, ObjectType};

/// A tracked handle of raw Vulkan type `H` carrying nothing beyond identity and the handle
/// value itself.
#[derive(Debug)]
pub struct OpaqueHandle<H> {
    meta: HandleMeta,
    handle: H,
}

impl<H: Copy> OpaqueHandle<H> {
    pub fn new(id: u64, handle: H, object_type: ObjectType) -> Self {
        Self {
            meta: HandleMeta::with_id(id, object_type),
            handle,
        }
    }

    pub fn meta(&self) -> &HandleMeta {
        &self.meta
    }

    pub fn id(&self) -> HandleId {
        self.meta.id()
    }

    pub fn handle(&self) -> H {
        self.handle
    }
}

pub type Sampler = OpaqueHandle<ash::vk::Sampler>;
pub type ImageView = OpaqueHandle<ash::vk::ImageView>;
pub type BufferView = OpaqueHandle<ash::vk::BufferView>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_handle_keeps_its_id_and_raw_handle() {
        let sampler: Sampler = OpaqueHandle::new(7, ash::vk::Sampler::null(), ObjectType::Sampler);
        assert_eq!(sampler.id(), 7);
        assert_eq!(sampler.handle(), ash::vk::Sampler::null());
    }
}
