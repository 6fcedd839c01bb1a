use vil_core::command::{Command, CommandCategory, CommandNode};
use vil_core::matcher::hierarchy::match_command_sequence;

fn label(name: &str, children: Vec<CommandNode>) -> CommandNode {
    CommandNode {
        category: CommandCategory::Section,
        payload: Command::BeginLabel { name: name.into() },
        handle_refs: vec![],
        children,
    }
}

fn draw(vertex_count: u32) -> CommandNode {
    CommandNode::leaf(
        CommandCategory::Draw,
        Command::Draw {
            vertex_count,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        },
    )
}

// Mirrors S2 from the matcher's end-to-end scenarios: record A has one labelled section with a
// single draw, record B has the same section with two draws. The sections should pair up and
// the shared draw should score a correspondence.
#[test]
fn records_with_an_inserted_draw_still_match_above_half() {
    let a = vec![label("frame", vec![draw(3)])];
    let b = vec![label("frame", vec![draw(3), draw(3)])];

    let result = match_command_sequence(&a, &b, 0.95);

    assert_eq!(result.pairs.len(), 1);
    assert!(result.total_score > 0.5);
}

#[test]
fn unrelated_sequences_score_far_below_identical_ones() {
    let a = vec![label("frame", vec![draw(3), draw(6)])];
    let b = vec![label("frame", vec![draw(3), draw(6)])];
    let c = vec![label("other", vec![draw(999)])];

    let identical = match_command_sequence(&a, &b, 0.95);
    let unrelated = match_command_sequence(&a, &c, 0.95);

    assert!(identical.total_score > unrelated.total_score);
}
