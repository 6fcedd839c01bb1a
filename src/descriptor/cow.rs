//! The descriptor copy-on-write snapshot (§4.8).

use std::sync::Mutex;

use crate::descriptor::set::SetBindings;

/// A stable snapshot of a `DescriptorSet`'s bindings, shared by reference count among every
/// caller that took a snapshot while the set was undisturbed.
///
/// `SetBindings` contains no pointers into the live set's own storage (each
/// [`DescriptorContents`](crate::descriptor::set::DescriptorContents) holds its own
/// `Shared<T>`/`Option<Shared<T>>` references to whatever it resolved against the registry), so
/// unlike a pointer-sharing COW, `DescriptorCow::new` already performs the private copy eagerly
/// rather than lazily on first write. This keeps §3's invariant ("a COW snapshot taken at time T
/// yields the exact set of bindings at time T") trivially true without a points-to-shared-storage
/// model, and it is exactly what makes the referenced handles outlive an application-side
/// `vkDestroy*`/overwrite of the live set (§4.8): cloning `SetBindings` clones the `Shared<T>`s
/// inside it, so each snapshot keeps its own strong references alive independent of the live
/// set's, until the snapshot itself drops. `detach` still exists so call sites read the same way
/// the spec describes the lifecycle, marking that this snapshot is now the only thing left
/// describing what the set used to contain.
#[derive(Debug)]
pub struct DescriptorCow {
    bindings: SetBindings,
    detached: Mutex<bool>,
}

impl DescriptorCow {
    pub fn new(bindings: SetBindings) -> Self {
        Self {
            bindings,
            detached: Mutex::new(false),
        }
    }

    pub fn bindings(&self) -> SetBindings {
        self.bindings.clone()
    }

    /// Mark this snapshot as detached from its originating set. Called on either a write to the
    /// set or the set's destruction (§4.8); idempotent.
    pub fn detach(&self) {
        *self.detached.lock().unwrap() = true;
    }

    pub fn is_detached(&self) -> bool {
        *self.detached.lock().unwrap()
    }
}
