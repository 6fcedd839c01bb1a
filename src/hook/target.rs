//! What the command hook is configured to find and capture (§4.6).

use crate::command::CommandNode;
use crate::handle::HandleId;

/// A path to a specific command inside a record's tree: a sequence of child indices descending
/// from the root, terminated by the target command itself (§4.6's "path to the selected
/// command", expressed as indices rather than raw parent-command pointers since the tree is
/// walked through safe references here).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandPath(pub Vec<usize>);

impl CommandPath {
    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    /// Resolve this path against a record's top-level children, returning the target node.
    pub fn resolve<'a>(&self, roots: &'a [CommandNode]) -> Option<&'a CommandNode> {
        let (&first, rest) = self.0.split_first()?;
        let mut node = roots.get(first)?;
        for &index in rest {
            node = node.children.get(index)?;
        }
        Some(node)
    }
}

/// What the hook is installed to find (§4.6).
#[derive(Debug, Clone)]
pub enum HookTarget {
    CommandBuffer(HandleId),
    Record(HandleId),
    /// Any record in the active frame whose hierarchy matches the originally selected one
    /// above the configured threshold.
    AnyMatchingInActiveFrame,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandCategory};

    #[test]
    fn path_resolves_through_nested_children() {
        let leaf = CommandNode::leaf(
            CommandCategory::Draw,
            Command::Draw {
                vertex_count: 3,
                instance_count: 1,
                first_vertex: 0,
                first_instance: 0,
            },
        );
        let section = CommandNode {
            category: CommandCategory::Section,
            payload: Command::BeginLabel { name: "pass".into() },
            handle_refs: vec![],
            children: vec![leaf],
        };
        let roots = vec![section];
        let path = CommandPath::root(0).child(0);
        let resolved = path.resolve(&roots).unwrap();
        assert!(matches!(resolved.payload, Command::Draw { vertex_count: 3, .. }));
    }
}
