//! `CommandHookSubmission`: the per-submission data a hooked command buffer carries (§4.6
//! step 4).

use ash::vk;

use crate::descriptor::cow::DescriptorCow;
use crate::handle::{HandleId, Shared};
use crate::hook::record::CommandHookRecord;
use crate::hook::target::CommandPath;

/// Attached to a [`Submission`](crate::submission::batch::Submission) whenever its command
/// buffer was substituted by a hooked one. Carries everything the submission's completion
/// handler needs to populate a [`CommandHookState`](crate::hook::state::CommandHookState): the
/// query pool the re-recording wrote timestamps into, the record that produced this submission's
/// copy buffers/images, and the descriptor snapshot taken at capture time.
#[derive(Debug, Clone)]
pub struct CommandHookSubmission {
    pub query_pool: vk::QueryPool,
    /// Absent for a submission that only carries an always-on acceleration-structure build
    /// capture with no selected command re-recorded into it.
    pub record: Option<Shared<CommandHookRecord>>,
    pub descriptor_snapshot: Option<Shared<DescriptorCow>>,
    pub path: Option<CommandPath>,
    pub match_score: f32,
    /// The acceleration structure this submission's always-on build hook targeted, if any
    /// (§4.6 "Acceleration-structure support"). Independent of `record`/`path`/`match_score`,
    /// which describe the selected-command hook and are absent for an AS-only submission.
    pub accel_structure: Option<HandleId>,
}

impl CommandHookSubmission {
    pub fn for_selected_command(
        query_pool: vk::QueryPool,
        record: Shared<CommandHookRecord>,
        descriptor_snapshot: Option<Shared<DescriptorCow>>,
        path: CommandPath,
        match_score: f32,
    ) -> Self {
        Self {
            query_pool,
            record: Some(record),
            descriptor_snapshot,
            path: Some(path),
            match_score,
            accel_structure: None,
        }
    }

    pub fn for_accel_structure_build(query_pool: vk::QueryPool, accel_structure: HandleId) -> Self {
        Self {
            query_pool,
            record: None,
            descriptor_snapshot: None,
            path: None,
            match_score: 0.0,
            accel_structure: Some(accel_structure),
        }
    }
}
