//! `CommandHookState`: what a completed, hooked submission captured (§4.6 step 5).

use ash::vk;

use crate::descriptor::set::SetBindings;
use crate::handle::HandleId;
use crate::hook::target::CommandPath;

/// One copied attachment (color or depth/stencil) from a split render pass (§4.7).
#[derive(Debug, Clone)]
pub struct CopiedAttachment {
    pub image: HandleId,
    pub data: Vec<u8>,
    pub extent: vk::Extent3D,
    pub format: vk::Format,
}

/// Indirect draw/dispatch/trace-rays argument counts read back from the copied indirect buffer,
/// when the target command reads its counts from a count buffer.
#[derive(Debug, Clone, Default)]
pub struct IndirectCounts {
    pub draw_count: Option<u32>,
    pub raw_args: Vec<u8>,
}

/// Everything a single hooked, completed submission captured for its target command (§4.6 step
/// 5). Appended to the owning hook's completed queue alongside the path and match score that
/// located the command.
#[derive(Debug, Clone, Default)]
pub struct CommandHookState {
    pub timestamp_begin: Option<u64>,
    pub timestamp_end: Option<u64>,
    pub copied_descriptors: Option<SetBindings>,
    pub copied_attachments: Vec<CopiedAttachment>,
    pub indirect_counts: Option<IndirectCounts>,
    pub copied_vertex_buffers: Vec<Vec<u8>>,
    pub copied_index_buffer: Option<Vec<u8>>,
    pub transfer_src: Option<Vec<u8>>,
    pub transfer_dst: Option<Vec<u8>>,
}

/// One entry in a hook's completed-state history: the capture plus where it came from.
#[derive(Debug, Clone)]
pub struct CompletedState {
    pub state: CommandHookState,
    pub path: CommandPath,
    pub match_score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_carries_no_captures() {
        let state = CommandHookState::default();
        assert!(state.timestamp_begin.is_none());
        assert!(state.copied_attachments.is_empty());
    }
}
