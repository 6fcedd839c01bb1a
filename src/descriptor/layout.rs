//! `DescriptorSetLayout`: binding list and flags.

use ash::vk;
use derivative::Derivative;

use crate::handle::{HandleMeta, ObjectType};

#[derive(Debug, Clone)]
pub struct LayoutBinding {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub descriptor_count: u32,
    pub stage_flags: vk::ShaderStageFlags,
    pub flags: vk::DescriptorBindingFlags,
}

/// A tracked `VkDescriptorSetLayout`. Unwrapped handle type (§4.1).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DescriptorSetLayout {
    meta: HandleMeta,
    bindings: Vec<LayoutBinding>,
    flags: vk::DescriptorSetLayoutCreateFlags,
}

impl DescriptorSetLayout {
    pub fn new(id: u64, bindings: Vec<LayoutBinding>, flags: vk::DescriptorSetLayoutCreateFlags) -> Self {
        Self {
            meta: HandleMeta::with_id(id, ObjectType::DescriptorSetLayout),
            bindings,
            flags,
        }
    }

    pub fn meta(&self) -> &HandleMeta {
        &self.meta
    }

    pub fn bindings(&self) -> &[LayoutBinding] {
        &self.bindings
    }

    pub fn binding(&self, index: u32) -> Option<&LayoutBinding> {
        self.bindings.iter().find(|b| b.binding == index)
    }

    pub fn is_update_after_bind(&self) -> bool {
        self.flags.contains(vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL)
    }
}
