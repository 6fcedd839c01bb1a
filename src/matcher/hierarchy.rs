//! Recursive matching across the command hierarchy (§4.5): frames by submission sets,
//! submissions by record-sets, records by top-level section sequences, sections by
//! child-section sequences, down to individual commands.

use crate::command::{CommandNode, CommandRecord};
use crate::handle::device::DeviceState;
use crate::handle::Shared;
use crate::matcher::command::match_commands;
use crate::matcher::flcs::{lazy_matrix_march, MatchResult};
use crate::submission::batch::Submission;
use crate::submission::frame::{Frame, FrameHistory};

/// Score a single pair of nodes, recursing into children when both are sections with children
/// (§4.5's "sections by child-section sequences"). Leaf commands fall back to
/// [`match_commands`].
pub fn score_node_pair(a: &CommandNode, b: &CommandNode, branch_threshold: f32) -> f32 {
    let own = match_commands(a, b, None).score();
    if a.is_section() && b.is_section() && !a.children.is_empty() && !b.children.is_empty() {
        let children = match_command_sequence(&a.children, &b.children, branch_threshold);
        let child_score = children.total_score / children.pairs.len().max(a.children.len()).max(b.children.len()).max(1) as f32;
        (own + child_score) / 2.0
    } else {
        own
    }
}

/// Match two sibling sequences (a record's top-level sections, or one section's children)
/// against each other, returning the best alignment and its score.
pub fn match_command_sequence(a: &[CommandNode], b: &[CommandNode], branch_threshold: f32) -> MatchResult {
    lazy_matrix_march(a.len(), b.len(), branch_threshold, |i, j| score_node_pair(&a[i], &b[j], branch_threshold))
}

/// Score two records by matching their top-level section sequences (§4.5's "records by
/// top-level section sequences"). An empty root on either side scores a full match only if
/// both are empty, so a record that failed to build a root (e.g. still mid-recording) does not
/// spuriously match everything.
pub fn match_records(a: &CommandRecord, b: &CommandRecord, branch_threshold: f32) -> f32 {
    a.with_root(|root_a| {
        b.with_root(|root_b| match (root_a, root_b) {
            (Some(root_a), Some(root_b)) => {
                if root_a.children.is_empty() && root_b.children.is_empty() {
                    return 1.0;
                }
                let result = match_command_sequence(&root_a.children, &root_b.children, branch_threshold);
                result.total_score / root_a.children.len().max(root_b.children.len()).max(1) as f32
            }
            (None, None) => 1.0,
            _ => 0.0,
        })
    })
}

/// Resolve a submission's `command_buffers` ids against `state`'s record registry, dropping any
/// that no longer resolve (the record was destroyed, or never existed — a stale id contributes
/// nothing rather than aborting the whole match).
fn resolve_records(state: &DeviceState, submission: &Submission) -> Vec<Shared<CommandRecord>> {
    submission.command_buffers.iter().filter_map(|&id| state.command_records.get(id).ok()).collect()
}

/// Score two submissions by matching their resolved record sets (§4.5's "submissions matched by
/// record-sets").
pub fn match_submissions(state: &DeviceState, a: &Submission, b: &Submission, branch_threshold: f32) -> f32 {
    let records_a = resolve_records(state, a);
    let records_b = resolve_records(state, b);
    if records_a.is_empty() && records_b.is_empty() {
        return 1.0;
    }
    let result = lazy_matrix_march(records_a.len(), records_b.len(), branch_threshold, |i, j| {
        match_records(&records_a[i], &records_b[j], branch_threshold)
    });
    result.total_score / records_a.len().max(records_b.len()).max(1) as f32
}

/// Score two frames by matching their flattened submission sequences (§4.5's top level: "frames
/// matched by submission sets" when navigating [`FrameHistory`]).
pub fn match_frame(state: &DeviceState, a: &Frame, b: &Frame, branch_threshold: f32) -> f32 {
    let submissions_a: Vec<&Submission> = a.batches.iter().flat_map(|batch| batch.submissions.iter()).collect();
    let submissions_b: Vec<&Submission> = b.batches.iter().flat_map(|batch| batch.submissions.iter()).collect();
    if submissions_a.is_empty() && submissions_b.is_empty() {
        return 1.0;
    }
    let result = lazy_matrix_march(submissions_a.len(), submissions_b.len(), branch_threshold, |i, j| {
        match_submissions(state, submissions_a[i], submissions_b[j], branch_threshold)
    });
    result.total_score / submissions_a.len().max(submissions_b.len()).max(1) as f32
}

/// Find the historical frame that best matches `target` (§4.5: re-locating a selection after a
/// re-recorded frame). Returns the winning frame and its score, or `None` if `history` is empty.
pub fn match_frames<'h>(state: &DeviceState, target: &Frame, history: &'h FrameHistory, branch_threshold: f32) -> Option<(&'h Frame, f32)> {
    history
        .iter()
        .map(|frame| (frame, match_frame(state, target, frame, branch_threshold)))
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandCategory};

    fn draw(n: u32) -> CommandNode {
        CommandNode::leaf(
            CommandCategory::Draw,
            Command::Draw {
                vertex_count: n,
                instance_count: 1,
                first_vertex: 0,
                first_instance: 0,
            },
        )
    }

    #[test]
    fn identical_flat_sequences_score_perfectly() {
        let a = vec![draw(3), draw(6), draw(9)];
        let b = vec![draw(3), draw(6), draw(9)];
        let result = match_command_sequence(&a, &b, 0.95);
        assert_eq!(result.total_score, 3.0);
    }

    #[test]
    fn section_with_matching_children_scores_above_a_bare_mismatch() {
        let section_a = CommandNode {
            category: CommandCategory::Section,
            payload: Command::BeginLabel { name: "pass".into() },
            handle_refs: vec![],
            children: vec![draw(1), draw(2)],
        };
        let section_b = CommandNode {
            category: CommandCategory::Section,
            payload: Command::BeginLabel { name: "pass".into() },
            handle_refs: vec![],
            children: vec![draw(1), draw(2)],
        };
        let different_section = CommandNode {
            category: CommandCategory::Section,
            payload: Command::BeginLabel { name: "pass".into() },
            handle_refs: vec![],
            children: vec![draw(99)],
        };
        let matching = score_node_pair(&section_a, &section_b, 0.95);
        let mismatching = score_node_pair(&section_a, &different_section, 0.95);
        assert!(matching > mismatching);
    }

    use crate::command::allocator::CommandAllocator;
    use crate::command::builder::RecordBuilder;
    use crate::handle::device::DeviceState;
    use crate::submission::batch::{BatchFence, SemaphoreRef, SubmissionBatch};
    use crate::submission::semaphore::SemaphorePool;
    use ash::vk;
    use std::sync::Arc;

    fn record_with_draws(id: u64, state: &DeviceState, counts: &[u32]) -> CommandRecord {
        let allocator = Arc::new(CommandAllocator::new(2_000));
        let record = CommandRecord::new(id, &allocator, 0, vk::CommandBufferUsageFlags::empty());
        let mut builder = RecordBuilder::new(&record, state);
        for &n in counts {
            builder.append(Command::Draw {
                vertex_count: n,
                instance_count: 1,
                first_vertex: 0,
                first_instance: 0,
            });
        }
        builder.finish(vk::CommandBufferUsageFlags::empty());
        record
    }

    fn fake_submission(command_buffers: Vec<u64>) -> Submission {
        let pool = SemaphorePool::new();
        Submission::new(Vec::<SemaphoreRef>::new(), Vec::<SemaphoreRef>::new(), command_buffers, pool.acquire(false).unwrap())
    }

    #[test]
    fn records_with_identical_draws_match_perfectly() {
        let state = DeviceState::new();
        let a = record_with_draws(1, &state, &[1, 2, 3]);
        let b = record_with_draws(2, &state, &[1, 2, 3]);
        assert_eq!(match_records(&a, &b, 0.95), 1.0);
    }

    #[test]
    fn records_with_different_draws_score_below_identical_ones() {
        let state = DeviceState::new();
        let a = record_with_draws(1, &state, &[1, 2, 3]);
        let b = record_with_draws(2, &state, &[1, 2, 3]);
        let c = record_with_draws(3, &state, &[9]);
        assert!(match_records(&a, &b, 0.95) > match_records(&a, &c, 0.95));
    }

    #[test]
    fn submissions_match_through_their_resolved_records() {
        let state = DeviceState::new();
        let a = record_with_draws(1, &state, &[1, 2]);
        let b = record_with_draws(2, &state, &[1, 2]);
        let id_a = state.command_records.insert(1, a).meta().id();
        let id_b = state.command_records.insert(2, b).meta().id();

        let sub_a = fake_submission(vec![id_a]);
        let sub_b = fake_submission(vec![id_b]);
        assert_eq!(match_submissions(&state, &sub_a, &sub_b, 0.95), 1.0);
    }

    #[test]
    fn submissions_with_unresolvable_records_still_score() {
        let state = DeviceState::new();
        let sub_a = fake_submission(vec![404]);
        let sub_b = fake_submission(vec![405]);
        // Neither id resolves against an empty registry, so both submissions reduce to an
        // empty record set, which is a full match by definition (nothing to disagree on).
        assert_eq!(match_submissions(&state, &sub_a, &sub_b, 0.95), 1.0);
    }

    #[test]
    fn frames_flatten_batches_before_matching() {
        let state = DeviceState::new();
        let sub_a = fake_submission(vec![]);
        let sub_b = fake_submission(vec![]);
        let batch_a = Arc::new(SubmissionBatch::new(1, 0, vec![sub_a], BatchFence::Application(vk::Fence::null())));
        let batch_b = Arc::new(SubmissionBatch::new(2, 0, vec![sub_b], BatchFence::Application(vk::Fence::null())));
        let frame_a = Frame { batches: vec![batch_a] };
        let frame_b = Frame { batches: vec![batch_b] };
        assert_eq!(match_frame(&state, &frame_a, &frame_b, 0.95), 1.0);
    }

    #[test]
    fn match_frames_picks_the_best_scoring_history_entry() {
        let state = DeviceState::new();
        let target = Frame {
            batches: vec![Arc::new(SubmissionBatch::new(
                1,
                0,
                vec![fake_submission(vec![])],
                BatchFence::Application(vk::Fence::null()),
            ))],
        };
        let mut history = FrameHistory::new(4);
        history.push_completed_frame(Frame::default());
        history.push_completed_frame(Frame {
            batches: vec![Arc::new(SubmissionBatch::new(
                2,
                0,
                vec![fake_submission(vec![])],
                BatchFence::Application(vk::Fence::null()),
            ))],
        });
        let (_, score) = match_frames(&state, &target, &history, 0.95).unwrap();
        assert_eq!(score, 1.0);
    }
}
