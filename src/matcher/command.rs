//! Command-specific similarity, the base case of the matcher's recursion (§4.5).

use crate::command::{Command, CommandNode};
use crate::descriptor::set::SetBindings;
use crate::matcher::MatchVal;

/// Compare two commands for similarity, weighing handle identity, argument equality, and (for
/// draw/dispatch) bound descriptor similarity via the supplied COW snapshots.
///
/// Commands of different categories never match (`MatchVal::no_match()`): a `draw` is never
/// considered similar to a `dispatch` regardless of argument overlap.
pub fn match_commands(a: &CommandNode, b: &CommandNode, descriptors: Option<(&SetBindings, &SetBindings)>) -> MatchVal {
    if a.category != b.category {
        return MatchVal::no_match();
    }

    let mut val = match (&a.payload, &b.payload) {
        (
            Command::Draw {
                vertex_count: vc_a,
                instance_count: ic_a,
                first_vertex: fv_a,
                first_instance: fi_a,
            },
            Command::Draw {
                vertex_count: vc_b,
                instance_count: ic_b,
                first_vertex: fv_b,
                first_instance: fi_b,
            },
        ) => {
            let mut v = MatchVal::default();
            v.add_memcmp(vc_a, vc_b);
            v.add_memcmp(ic_a, ic_b);
            v.add_memcmp(fv_a, fv_b);
            v.add_memcmp(fi_a, fi_b);
            v
        }
        (
            Command::DrawIndexed {
                index_count: ic_a,
                instance_count: inst_a,
                first_index: first_a,
                vertex_offset: vo_a,
                first_instance: fi_a,
            },
            Command::DrawIndexed {
                index_count: ic_b,
                instance_count: inst_b,
                first_index: first_b,
                vertex_offset: vo_b,
                first_instance: fi_b,
            },
        ) => {
            let mut v = MatchVal::default();
            v.add_memcmp(ic_a, ic_b);
            v.add_memcmp(inst_a, inst_b);
            v.add_memcmp(first_a, first_b);
            v.add_memcmp(vo_a, vo_b);
            v.add_memcmp(fi_a, fi_b);
            v
        }
        (Command::Dispatch { x: xa, y: ya, z: za }, Command::Dispatch { x: xb, y: yb, z: zb }) => {
            let mut v = MatchVal::default();
            v.add_memcmp(xa, xb);
            v.add_memcmp(ya, yb);
            v.add_memcmp(za, zb);
            v
        }
        (Command::BindPipeline { pipeline: pa, .. }, Command::BindPipeline { pipeline: pb, .. }) => {
            let mut v = MatchVal::default();
            v.add_memcmp(pa, pb);
            v
        }
        (
            Command::CopyBuffer { src: sa, dst: da, regions: ra },
            Command::CopyBuffer { src: sb, dst: db, regions: rb },
        ) => {
            let mut v = MatchVal::default();
            v.add_memcmp(sa, sb);
            v.add_memcmp(da, db);
            v.add_non_empty(ra, rb);
            v
        }
        (Command::PushConstants { layout: la, data: da, .. }, Command::PushConstants { layout: lb, data: db, .. }) => {
            let mut v = MatchVal::default();
            v.add_memcmp(la, lb);
            v.add_memcmp(da, db);
            v
        }
        // Commands that carry no comparable payload (section markers, barriers without
        // interesting scalar fields) degrade to "same category, same variant => perfect match".
        (left, right) => {
            if std::mem::discriminant(left) == std::mem::discriminant(right) {
                MatchVal::default()
            } else {
                MatchVal::no_match()
            }
        }
    };

    if let Some((bindings_a, bindings_b)) = descriptors {
        val.add(bindings_a.similarity(bindings_b), 1.0);
    }

    val
}
