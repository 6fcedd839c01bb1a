//! Trait contracts for the external collaborators this core hands data to and takes
//! configuration from (§2, §6): an overlay/GUI reads the current selection, match results, and
//! completed hook snapshots, and writes back hook target/operation configuration. Implementing
//! an actual overlay (input handling, rendering, the `vilOverlayShow`-style public ABI) is out
//! of scope for this core; these traits are the seam a richer embedding plugs into.

use crate::handle::HandleId;
use crate::hook::state::CompletedState;
use crate::hook::{HookTarget, OperationSet};

/// What an embedding overlay/GUI can read from the core without taking any lock itself beyond
/// what each accessor already manages internally.
pub trait OverlayDataSource {
    /// The command currently selected for hooking, if any.
    fn selected_target(&self) -> Option<HookTarget>;

    /// The most recent match result scoring a candidate record against the originally selected
    /// one, if a match has been attempted this frame.
    fn last_match_score(&self) -> Option<f32>;

    /// Every completed hook capture not yet acknowledged by the overlay.
    fn completed_states(&self) -> Vec<CompletedState>;

    /// Handles currently alive in the tracked object model, for a handle browser view.
    fn live_handles(&self) -> Vec<HandleId>;
}

/// What an embedding overlay/GUI can write back into the core to steer hooking.
pub trait OverlayController {
    fn set_target(&self, target: HookTarget);
    fn set_operations(&self, operations: OperationSet);
    /// Request the hook stop applying to any command (but keep its completed-state history).
    fn clear_target(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeOverlay {
        target: Mutex<Option<HookTarget>>,
        operations: Mutex<OperationSet>,
    }

    impl OverlayController for FakeOverlay {
        fn set_target(&self, target: HookTarget) {
            *self.target.lock().unwrap() = Some(target);
        }

        fn set_operations(&self, operations: OperationSet) {
            *self.operations.lock().unwrap() = operations;
        }

        fn clear_target(&self) {
            *self.target.lock().unwrap() = None;
        }
    }

    #[test]
    fn controller_trait_is_object_safe_and_callable() {
        let overlay = FakeOverlay {
            target: Mutex::new(None),
            operations: Mutex::new(OperationSet::empty()),
        };
        let controller: &dyn OverlayController = &overlay;
        controller.set_target(HookTarget::AnyMatchingInActiveFrame);
        controller.set_operations(OperationSet::TIMESTAMPS);
        assert!(overlay.target.lock().unwrap().is_some());
        controller.clear_target();
        assert!(overlay.target.lock().unwrap().is_none());
    }
}
