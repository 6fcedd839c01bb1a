//! The command hook: rewrites submitted command buffers to capture GPU-side data for a
//! selected command (§4.6).

pub mod accel_structure;
pub mod record;
pub mod renderpass_split;
pub mod state;
pub mod submission;
pub mod target;

pub use record::CommandHookRecord;
pub use state::CommandHookState;
pub use submission::CommandHookSubmission;
pub use target::HookTarget;

use std::sync::{Mutex, RwLock};

use bitflags::bitflags;

use crate::hook::state::CompletedState;
use crate::hook::target::CommandPath;

bitflags! {
    /// Which combination of captures the hook performs for its current target (§4.6).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OperationSet: u32 {
        const COPY_VERTEX_BUFFERS   = 1 << 0;
        const COPY_INDEX_BUFFER     = 1 << 1;
        const COPY_INDIRECT_CMDS    = 1 << 2;
        const COPY_DESCRIPTORS      = 1 << 3;
        const COPY_ATTACHMENTS      = 1 << 4;
        const TIMESTAMPS            = 1 << 5;
        const TRANSFER_SRC_DST      = 1 << 6;
    }
}

/// How the hook behaves when a record is submitted concurrently in more than one queue
/// submission (§4.6). Chosen per [`OperationSet`] by the embedding application; the device's
/// [`Config`](crate::config::Config) carries one global default.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SimultaneousSubmitPolicy {
    /// Reuse the same hooked command buffer in every concurrent submission. Only correct when
    /// every active operation is safe to run simultaneously (no operation writes data the other
    /// submission also reads back, e.g. pure timestamp queries into disjoint query slots).
    Allow,
    /// Pass the original, unhooked command buffer to every submission after the first,
    /// sacrificing captured data for those but guaranteeing correctness.
    Skip,
    /// Allocate a fresh hooked command buffer per concurrent submission.
    Recreate,
}

/// A device-installed command hook (§4.6): what it is looking for, which operations to apply
/// once found, and the history of what past submissions captured.
#[derive(Debug)]
pub struct CommandHook {
    target: RwLock<HookTarget>,
    operations: RwLock<OperationSet>,
    simultaneous_submit: SimultaneousSubmitPolicy,
    completed: Mutex<Vec<CompletedState>>,
    /// Bound on `completed`'s length; oldest entries are dropped once exceeded, matching
    /// `FrameHistory`'s fixed-capacity ring rather than growing unboundedly for a long-running
    /// application.
    history_capacity: usize,
}

impl CommandHook {
    pub fn new(target: HookTarget, operations: OperationSet, simultaneous_submit: SimultaneousSubmitPolicy, history_capacity: usize) -> Self {
        Self {
            target: RwLock::new(target),
            operations: RwLock::new(operations),
            simultaneous_submit,
            completed: Mutex::new(Vec::new()),
            history_capacity,
        }
    }

    pub fn target(&self) -> HookTarget {
        self.target.read().unwrap().clone()
    }

    pub fn set_target(&self, target: HookTarget) {
        *self.target.write().unwrap() = target;
    }

    pub fn operations(&self) -> OperationSet {
        *self.operations.read().unwrap()
    }

    pub fn set_operations(&self, operations: OperationSet) {
        *self.operations.write().unwrap() = operations;
    }

    pub fn simultaneous_submit(&self) -> SimultaneousSubmitPolicy {
        self.simultaneous_submit
    }

    /// Append a finalized capture to the completed queue (§4.6 step 5), evicting the oldest
    /// entry first if already at capacity.
    pub fn push_completed(&self, state: CommandHookState, path: CommandPath, match_score: f32) {
        let mut completed = self.completed.lock().unwrap();
        if completed.len() >= self.history_capacity {
            completed.remove(0);
        }
        completed.push(CompletedState { state, path, match_score });
    }

    pub fn completed(&self) -> Vec<CompletedState> {
        self.completed.lock().unwrap().clone()
    }

    pub fn latest(&self) -> Option<CompletedState> {
        self.completed.lock().unwrap().last().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_set_combines_as_flags() {
        let ops = OperationSet::TIMESTAMPS | OperationSet::COPY_DESCRIPTORS;
        assert!(ops.contains(OperationSet::TIMESTAMPS));
        assert!(!ops.contains(OperationSet::COPY_VERTEX_BUFFERS));
    }

    #[test]
    fn completed_queue_evicts_oldest_past_capacity() {
        let hook = CommandHook::new(HookTarget::AnyMatchingInActiveFrame, OperationSet::TIMESTAMPS, SimultaneousSubmitPolicy::Skip, 2);
        hook.push_completed(CommandHookState::default(), CommandPath::root(0), 1.0);
        hook.push_completed(CommandHookState::default(), CommandPath::root(1), 0.9);
        hook.push_completed(CommandHookState::default(), CommandPath::root(2), 0.8);
        let completed = hook.completed();
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0].path, CommandPath::root(1));
        assert_eq!(completed[1].path, CommandPath::root(2));
    }
}
