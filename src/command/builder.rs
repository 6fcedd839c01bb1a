//! `RecordBuilder`: the section-stacking recording front-end (§4.3).

use ash::vk;

use crate::command::record::{CommandRecord, SectionStats};
use crate::command::{Command, CommandCategory, CommandNode};
use crate::handle::device::DeviceState;

/// One open section frame: its node (filled in once closed) plus the stats accumulated for
/// commands appended directly to it.
struct Frame {
    category: CommandCategory,
    payload: Command,
    handle_refs: Vec<crate::command::HandleRef>,
    children: Vec<CommandNode>,
    stats: SectionStats,
}

/// Builds a record's command tree by stacking section frames. `append` links into the current
/// section; `begin_section`/`end_section` push/pop. Debug-utils labels may straddle
/// command-buffer boundaries, so `end_label` on an empty stack and an unclosed `begin_label` at
/// `finish` both mark the record `broken_hierarchy_labels` rather than panicking (§4.3).
///
/// Holds `state` alongside `record` so each appended command's handle arguments can be
/// translated into [`HandleRef`](crate::command::HandleRef)s against the live registries as it
/// is recorded (§4.3(ii)).
pub struct RecordBuilder<'r> {
    record: &'r CommandRecord,
    state: &'r DeviceState,
    stack: Vec<Frame>,
    root_children: Vec<CommandNode>,
}

impl<'r> RecordBuilder<'r> {
    pub fn new(record: &'r CommandRecord, state: &'r DeviceState) -> Self {
        Self {
            record,
            state,
            stack: Vec::new(),
            root_children: Vec::new(),
        }
    }

    /// Append a non-section command into whatever section is currently open (or the record
    /// root if none is).
    pub fn append(&mut self, payload: Command) {
        let category = payload.category();
        let handle_refs = payload.resolve_handle_refs(self.state, self.record);
        let node = CommandNode {
            category,
            payload,
            handle_refs,
            children: Vec::new(),
        };
        match self.stack.last_mut() {
            Some(frame) => {
                frame.stats.record(category);
                frame.children.push(node);
            }
            None => self.root_children.push(node),
        }
    }

    /// Push a new section frame (render pass, label, subpass, `executeCommands`).
    pub fn begin_section(&mut self, payload: Command) {
        let category = payload.category();
        let handle_refs = payload.resolve_handle_refs(self.state, self.record);
        self.record.enter_section();
        self.stack.push(Frame {
            category,
            payload,
            handle_refs,
            children: Vec::new(),
            stats: SectionStats::default(),
        });
    }

    /// Pop the current section frame, attaching it as a child of whatever frame is now on top
    /// (or the record root). Returns `false` if there was nothing open (a stray `endLabel`,
    /// `endRenderPass`, ...), which the caller should treat as a label imbalance.
    pub fn end_section(&mut self) -> bool {
        if !self.record.leave_section() {
            return false;
        }
        let Some(frame) = self.stack.pop() else {
            return false;
        };
        let node = CommandNode {
            category: frame.category,
            payload: frame.payload,
            handle_refs: frame.handle_refs,
            children: frame.children,
        };
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root_children.push(node),
        }
        true
    }

    pub fn begin_label(&mut self, name: String) {
        self.begin_section(Command::BeginLabel { name });
    }

    /// Close a debug label. If no label (or section at all) is open, this is an unopened pop:
    /// recorded on the owning record and the call is otherwise a no-op.
    pub fn end_label(&mut self) {
        let is_label = matches!(self.stack.last().map(|f| &f.payload), Some(Command::BeginLabel { .. }));
        if !is_label {
            self.record.note_unopened_pop();
            return;
        }
        self.end_section();
    }

    /// Finish building: any section frames still open at this point (most commonly unbalanced
    /// debug labels) are flagged on the record rather than silently dropped or force-closed,
    /// matching the spec's "non-matching push/pop counts" handling, then folded into the tree
    /// as-is so their already-recorded children are not lost.
    pub fn finish(mut self, usage: vk::CommandBufferUsageFlags) {
        let _ = usage;
        while let Some(frame) = self.stack.pop() {
            self.record.note_unclosed_push();
            let node = CommandNode {
                category: frame.category,
                payload: frame.payload,
                handle_refs: frame.handle_refs,
                children: frame.children,
            };
            match self.stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => self.root_children.push(node),
            }
        }
        let root = CommandNode {
            category: CommandCategory::Section,
            payload: Command::BeginLabel { name: String::new() },
            handle_refs: Vec::new(),
            children: self.root_children,
        };
        self.record.set_root(root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::allocator::CommandAllocator;
    use std::sync::Arc;

    fn fresh_record() -> CommandRecord {
        let allocator = Arc::new(CommandAllocator::new(2_000));
        CommandRecord::new(1, &allocator, 0, vk::CommandBufferUsageFlags::empty())
    }

    #[test]
    fn balanced_sections_nest_correctly() {
        let record = fresh_record();
        let state = DeviceState::new();
        let mut builder = RecordBuilder::new(&record, &state);
        builder.begin_label("pass".into());
        builder.append(Command::Draw {
            vertex_count: 3,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        });
        builder.end_label();
        builder.finish(vk::CommandBufferUsageFlags::empty());

        assert!(!record.label_imbalance().is_broken());
        record.with_root(|root| {
            let root = root.unwrap();
            assert_eq!(root.children.len(), 1);
            assert_eq!(root.children[0].children.len(), 1);
        });
    }

    #[test]
    fn stray_end_label_is_recorded_as_imbalance() {
        let record = fresh_record();
        let state = DeviceState::new();
        let mut builder = RecordBuilder::new(&record, &state);
        builder.end_label();
        builder.finish(vk::CommandBufferUsageFlags::empty());
        assert_eq!(record.label_imbalance().unopened_pops, 1);
    }

    #[test]
    fn unclosed_label_at_finish_is_recorded_as_imbalance() {
        let record = fresh_record();
        let state = DeviceState::new();
        let mut builder = RecordBuilder::new(&record, &state);
        builder.begin_label("pass".into());
        builder.finish(vk::CommandBufferUsageFlags::empty());
        assert_eq!(record.label_imbalance().unclosed_pushes, 1);
    }
}
