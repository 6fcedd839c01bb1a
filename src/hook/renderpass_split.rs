//! Splitting a render pass into up to three compatible render passes so the hook can insert
//! non-render-pass commands (copies, timestamps) at a subpass boundary (§4.7).

use ash::vk;

/// One attachment's load/store behavior, the only fields a split needs to rewrite.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentDesc {
    pub format: vk::Format,
    pub samples: vk::SampleCountFlags,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub stencil_load_op: vk::AttachmentLoadOp,
    pub stencil_store_op: vk::AttachmentStoreOp,
    pub initial_layout: vk::ImageLayout,
    pub final_layout: vk::ImageLayout,
}

/// One subpass's attachment references, kept index-based into the owning
/// [`RenderPassDesc::attachments`].
#[derive(Debug, Clone, Default)]
pub struct SubpassDesc {
    pub input_attachments: Vec<u32>,
    pub color_attachments: Vec<u32>,
    pub resolve_attachments: Vec<u32>,
    pub depth_stencil_attachment: Option<u32>,
}

/// A render pass description kept alive independently of the `VkRenderPass` handle: framebuffers
/// and pipelines created against a render pass only need to remain *compatible* with it, which
/// Vulkan permits checking after the original handle is destroyed, so anything that must keep
/// reasoning about a render pass's attachments holds a [`std::sync::Arc`] of this rather than the
/// handle itself (§11(d), grounded on `examples/original_source/src/rp.hpp`).
#[derive(Debug, Clone, Default)]
pub struct RenderPassDesc {
    pub attachments: Vec<AttachmentDesc>,
    pub subpasses: Vec<SubpassDesc>,
}

/// The three render passes `splitInterruptable` produces (§4.7).
#[derive(Debug, Clone)]
pub struct RenderPassSplitDesc {
    /// Keeps the original load ops; ends at the split subpass, storing every attachment so the
    /// inserted commands can read/write them outside a render pass.
    pub rp0: RenderPassDesc,
    /// Loads every attachment, contains only the split subpass, stores every attachment.
    pub rp1: RenderPassDesc,
    /// Loads every attachment, contains every subpass after the split point, uses the original
    /// store ops.
    pub rp2: RenderPassDesc,
}

/// Whether `desc` can be split at `split_subpass` (§4.7): rejected when a resolve attachment is
/// also read as an input attachment by a later subpass, since forcing a store/load round-trip at
/// the split point would observe stale data that single-pass execution would not.
pub fn is_splittable(desc: &RenderPassDesc, split_subpass: usize) -> bool {
    if split_subpass >= desc.subpasses.len() {
        return false;
    }
    let resolved: std::collections::HashSet<u32> = desc.subpasses[..=split_subpass]
        .iter()
        .flat_map(|s| s.resolve_attachments.iter().copied())
        .collect();
    desc.subpasses[split_subpass + 1..]
        .iter()
        .all(|s| s.input_attachments.iter().all(|a| !resolved.contains(a)))
}

fn with_load_store(
    attachments: &[AttachmentDesc],
    load_op: Option<vk::AttachmentLoadOp>,
    store_op: Option<vk::AttachmentStoreOp>,
) -> Vec<AttachmentDesc> {
    attachments
        .iter()
        .map(|a| {
            let mut a = *a;
            if let Some(load) = load_op {
                a.load_op = load;
                a.stencil_load_op = load;
            }
            if let Some(store) = store_op {
                a.store_op = store;
                a.stencil_store_op = store;
            }
            a
        })
        .collect()
}

/// Derive `rp0`/`rp1`/`rp2` for a split at `split_subpass`. Callers must check
/// [`is_splittable`] first; this does not re-validate.
pub fn split_interruptable(desc: &RenderPassDesc, split_subpass: usize) -> RenderPassSplitDesc {
    let rp0 = RenderPassDesc {
        attachments: with_load_store(&desc.attachments, None, Some(vk::AttachmentStoreOp::STORE)),
        subpasses: desc.subpasses[..=split_subpass].to_vec(),
    };
    let rp1 = RenderPassDesc {
        attachments: with_load_store(&desc.attachments, Some(vk::AttachmentLoadOp::LOAD), Some(vk::AttachmentStoreOp::STORE)),
        subpasses: vec![desc.subpasses[split_subpass].clone()],
    };
    let rp2 = RenderPassDesc {
        attachments: with_load_store(&desc.attachments, Some(vk::AttachmentLoadOp::LOAD), None),
        subpasses: desc.subpasses[split_subpass + 1..].to_vec(),
    };
    RenderPassSplitDesc { rp0, rp1, rp2 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment() -> AttachmentDesc {
        AttachmentDesc {
            format: vk::Format::R8G8B8A8_UNORM,
            samples: vk::SampleCountFlags::TYPE_1,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::DONT_CARE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
        }
    }

    fn two_subpass_desc() -> RenderPassDesc {
        RenderPassDesc {
            attachments: vec![attachment()],
            subpasses: vec![
                SubpassDesc {
                    color_attachments: vec![0],
                    ..Default::default()
                },
                SubpassDesc {
                    input_attachments: vec![0],
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn split_rewrites_load_store_ops_at_the_boundary() {
        let desc = two_subpass_desc();
        let split = split_interruptable(&desc, 0);
        assert_eq!(split.rp0.attachments[0].store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(split.rp0.attachments[0].load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(split.rp1.attachments[0].load_op, vk::AttachmentLoadOp::LOAD);
        assert_eq!(split.rp1.subpasses.len(), 1);
        assert_eq!(split.rp2.attachments[0].load_op, vk::AttachmentLoadOp::LOAD);
        assert_eq!(split.rp2.attachments[0].store_op, vk::AttachmentStoreOp::DONT_CARE);
        assert_eq!(split.rp2.subpasses.len(), 1);
    }

    #[test]
    fn resolve_attachment_reused_as_later_input_is_unsplittable() {
        let mut desc = two_subpass_desc();
        desc.subpasses[0].resolve_attachments = vec![0];
        assert!(!is_splittable(&desc, 0));
    }

    #[test]
    fn ordinary_split_point_is_splittable() {
        let desc = two_subpass_desc();
        assert!(is_splittable(&desc, 0));
    }
}
