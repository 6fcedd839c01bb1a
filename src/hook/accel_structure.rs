//! Always-on acceleration-structure build capture (§4.6 "Acceleration-structure support").
//!
//! Every `vkCmdBuildAccelerationStructures(Indirect)` is hooked regardless of whether a command
//! is selected, because the application's source geometry buffers may be reused or freed
//! immediately after submission — unlike the rest of the hook, this capture is unconditional.

use std::sync::{Mutex, RwLock, Weak};

use ash::vk;

use crate::handle::{HandleId, HandleMeta, ObjectType, Shared, WeakShared};

/// Which kind of geometry a build captured, mirroring `VkAccelerationStructureGeometryKHR`'s
/// three payload kinds.
#[derive(Debug, Clone)]
pub enum CapturedGeometry {
    Triangles { vertex_data: Vec<u8>, index_data: Option<Vec<u8>> },
    Aabbs { data: Vec<u8> },
    Instances { data: Vec<u8> },
}

/// One build's captured effective input data, copied into layer-owned buffers so it survives
/// past the application freeing or overwriting its source buffers (§4.6).
#[derive(Debug, Clone)]
pub struct AccelStructureBuildState {
    pub is_update: bool,
    pub geometries: Vec<CapturedGeometry>,
    /// For a TLAS build: the BLAS states each instance pointed to at build time, captured by
    /// value so later BLAS rebuilds don't retroactively change what this TLAS state describes.
    pub referenced_blas: Vec<Shared<AccelStructureBuildState>>,
}

/// A tracked `VkAccelerationStructureKHR`. Unwrapped handle type (§4.1).
///
/// Kept minimal relative to the full resource model (`MemoryResource`/`DeviceMemory`): an
/// acceleration structure's binding-to-memory lifecycle is identical to a buffer's and is not
/// duplicated here, only the build-history chain the hook needs.
#[derive(Debug)]
pub struct AccelerationStructure {
    meta: HandleMeta,
    handle: vk::AccelerationStructureKHR,
    is_tlas: bool,
    latest_build: Mutex<Option<Shared<AccelStructureBuildState>>>,
    /// Weak back-references to every TLAS currently pointing at this BLAS, so a BLAS rebuild
    /// can find TLASes that need to capture the new state on their own next hook state (§4.6).
    referencing_tlas: RwLock<Vec<WeakShared<AccelerationStructure>>>,
}

impl AccelerationStructure {
    pub fn new(id: u64, handle: vk::AccelerationStructureKHR, is_tlas: bool) -> Self {
        Self {
            meta: HandleMeta::with_id(id, ObjectType::AccelerationStructure),
            handle,
            is_tlas,
            latest_build: Mutex::new(None),
            referencing_tlas: RwLock::new(Vec::new()),
        }
    }

    pub fn meta(&self) -> &HandleMeta {
        &self.meta
    }

    pub fn handle(&self) -> vk::AccelerationStructureKHR {
        self.handle
    }

    pub fn is_tlas(&self) -> bool {
        self.is_tlas
    }

    pub fn id(&self) -> HandleId {
        self.meta.id()
    }

    /// Record a new build's captured state, replacing whatever the previous build captured.
    pub fn set_latest_build(&self, state: Shared<AccelStructureBuildState>) {
        *self.latest_build.lock().unwrap() = Some(state);
    }

    pub fn latest_build(&self) -> Option<Shared<AccelStructureBuildState>> {
        self.latest_build.lock().unwrap().clone()
    }

    pub fn add_referencing_tlas(&self, tlas: WeakShared<AccelerationStructure>) {
        self.referencing_tlas.write().unwrap().push(tlas);
    }

    /// Every currently-live TLAS that points at this BLAS, used to push a fresh build-state
    /// capture to each one after this BLAS is rebuilt.
    pub fn live_referencing_tlas(&self) -> Vec<Shared<AccelerationStructure>> {
        let mut guard = self.referencing_tlas.write().unwrap();
        guard.retain(|w| w.strong_count() > 0);
        guard.iter().filter_map(Weak::upgrade).collect()
    }
}

/// Build a TLAS's build-state snapshot, capturing by value the current build state of every
/// BLAS it instances so later BLAS rebuilds cannot retroactively change what this snapshot
/// describes (§4.6).
pub fn capture_tlas_build(instances_data: Vec<u8>, instanced_blas: &[Shared<AccelerationStructure>], is_update: bool) -> AccelStructureBuildState {
    let referenced_blas = instanced_blas.iter().filter_map(|blas| blas.latest_build()).collect();
    AccelStructureBuildState {
        is_update,
        geometries: vec![CapturedGeometry::Instances { data: instances_data }],
        referenced_blas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blas_rebuild_is_visible_to_its_referencing_tlas() {
        let blas = Shared::new(AccelerationStructure::new(1, vk::AccelerationStructureKHR::null(), false));
        let tlas = Shared::new(AccelerationStructure::new(2, vk::AccelerationStructureKHR::null(), true));
        blas.add_referencing_tlas(Shared::downgrade(&tlas));

        blas.set_latest_build(Shared::new(AccelStructureBuildState {
            is_update: false,
            geometries: vec![CapturedGeometry::Aabbs { data: vec![1, 2, 3] }],
            referenced_blas: vec![],
        }));

        let referencing = blas.live_referencing_tlas();
        assert_eq!(referencing.len(), 1);
        assert!(Shared::ptr_eq(&referencing[0], &tlas));
    }

    #[test]
    fn tlas_capture_copies_blas_state_by_value() {
        let blas = Shared::new(AccelerationStructure::new(1, vk::AccelerationStructureKHR::null(), false));
        blas.set_latest_build(Shared::new(AccelStructureBuildState {
            is_update: false,
            geometries: vec![],
            referenced_blas: vec![],
        }));
        let tlas_state = capture_tlas_build(vec![9, 9], &[blas.clone()], false);
        assert_eq!(tlas_state.referenced_blas.len(), 1);

        blas.set_latest_build(Shared::new(AccelStructureBuildState {
            is_update: true,
            geometries: vec![],
            referenced_blas: vec![],
        }));
        assert!(!tlas_state.referenced_blas[0].is_update, "captured snapshot must not see the later rebuild");
    }
}
