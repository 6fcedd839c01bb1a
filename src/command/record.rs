//! `CommandRecord`: the arena-backed owner of a command tree (§3).

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use ash::vk;

use crate::command::allocator::{Arena, CommandAllocator};
use crate::command::{Command, CommandCategory, CommandNode};
use crate::handle::{HandleId, HandleMeta, ObjectType};
use crate::hook::record::CommandHookRecord;

/// A `CommandRecord`'s view of why its debug-label push/pop counts don't balance (§4.3): labels
/// may straddle command-buffer boundaries.
#[derive(Debug, Default, Clone, Copy)]
pub struct LabelImbalance {
    pub unclosed_pushes: u32,
    pub unopened_pops: u32,
}

impl LabelImbalance {
    pub fn is_broken(&self) -> bool {
        self.unclosed_pushes > 0 || self.unopened_pops > 0
    }
}

/// Per-category append counters kept for each open section (§4.3).
#[derive(Debug, Default, Clone)]
pub struct SectionStats {
    pub counts: std::collections::HashMap<CommandCategory, u32>,
}

impl SectionStats {
    pub fn record(&mut self, category: CommandCategory) {
        *self.counts.entry(category).or_insert(0) += 1;
    }
}

/// Owns the private bump-allocator arena every command and owned span in the record is
/// allocated from (§3). Intrusively reference counted: wrap in [`Shared`](crate::handle::Shared)
/// at the storage site (the application's command buffer holds one reference; completed hooks
/// and the GUI may hold others).
#[derive(Debug)]
pub struct CommandRecord {
    meta: HandleMeta,
    arena: RwLock<Arena>,
    root: RwLock<Option<CommandNode>>,
    queue_family_index: u32,
    usage: vk::CommandBufferUsageFlags,
    name: RwLock<Option<String>>,
    label_imbalance: RwLock<LabelImbalance>,
    /// Handles this record references. A plain set rather than the intrusive cross-record
    /// linked list the spec's prose describes: `vkDestroyX`'s "walk every referrer record" (§4.1)
    /// is instead served by a reverse index kept alongside each handle's registry entry, which
    /// is simpler to express soundly in safe Rust and has the same observable behavior.
    used_handles: RwLock<BTreeSet<HandleId>>,
    /// Handles referenced by this record that have since been destroyed. Populated under the
    /// state mutex at destruction time; consulted by the matcher so invalidated records still
    /// match (§3).
    destroyed_handles: RwLock<BTreeSet<HandleId>>,
    hook_records: RwLock<Vec<Arc<CommandHookRecord>>>,
    open_sections: AtomicU32,
}

impl CommandRecord {
    pub fn new(id: u64, allocator: &Arc<CommandAllocator>, queue_family_index: u32, usage: vk::CommandBufferUsageFlags) -> Self {
        Self {
            meta: HandleMeta::with_id(id, ObjectType::CommandBuffer),
            arena: RwLock::new(allocator.new_arena()),
            root: RwLock::new(None),
            queue_family_index,
            usage,
            name: RwLock::new(None),
            label_imbalance: RwLock::new(LabelImbalance::default()),
            used_handles: RwLock::new(BTreeSet::new()),
            destroyed_handles: RwLock::new(BTreeSet::new()),
            hook_records: RwLock::new(Vec::new()),
            open_sections: AtomicU32::new(0),
        }
    }

    pub fn meta(&self) -> &HandleMeta {
        &self.meta
    }

    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    pub fn usage(&self) -> vk::CommandBufferUsageFlags {
        self.usage
    }

    pub fn set_root(&self, root: CommandNode) {
        *self.root.write().unwrap() = Some(root);
    }

    pub fn with_root<R>(&self, f: impl FnOnce(Option<&CommandNode>) -> R) -> R {
        f(self.root.read().unwrap().as_ref())
    }

    pub fn note_handle_use(&self, id: HandleId) {
        self.used_handles.write().unwrap().insert(id);
    }

    pub fn uses_handle(&self, id: HandleId) -> bool {
        self.used_handles.read().unwrap().contains(&id)
    }

    /// Move `id` into the destroyed set without removing it from `used_handles` (§4.1): usage
    /// entries must survive so matches against this record still work after the handle is gone.
    pub fn note_handle_destroyed(&self, id: HandleId) {
        if self.used_handles.read().unwrap().contains(&id) {
            self.destroyed_handles.write().unwrap().insert(id);
        }
    }

    pub fn is_handle_destroyed(&self, id: HandleId) -> bool {
        self.destroyed_handles.read().unwrap().contains(&id)
    }

    pub fn label_imbalance(&self) -> LabelImbalance {
        *self.label_imbalance.read().unwrap()
    }

    pub fn note_unclosed_push(&self) {
        self.label_imbalance.write().unwrap().unclosed_pushes += 1;
    }

    pub fn note_unopened_pop(&self) {
        self.label_imbalance.write().unwrap().unopened_pops += 1;
    }

    pub fn push_hook_record(&self, record: Arc<CommandHookRecord>) {
        self.hook_records.write().unwrap().push(record);
    }

    pub fn hook_records(&self) -> Vec<Arc<CommandHookRecord>> {
        self.hook_records.read().unwrap().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write().unwrap() = Some(name.into());
    }

    pub fn name(&self) -> Option<String> {
        self.name.read().unwrap().clone()
    }

    pub fn arena_block_count(&self) -> usize {
        self.arena.read().unwrap().block_count()
    }

    pub(crate) fn open_section_depth(&self) -> u32 {
        self.open_sections.load(Ordering::Relaxed)
    }

    pub(crate) fn enter_section(&self) {
        self.open_sections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn leave_section(&self) -> bool {
        self.open_sections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1))
            .is_ok()
    }
}
