//! Lazy depth-first traversal

use super::AssemblyTree;
use super::types::{AssemblyComponent, ComponentId};

/// Visit order for [`AssemblyTree::traverse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalOrder {
    /// Parent before its children
    #[default]
    Pre,
    /// Children before their parent
    Post,
}

/// Depth-first iterator over a subtree
///
/// Uses an explicit stack, so depth is bounded only by memory. Children are
/// visited in insertion order.
pub struct Traverse<'a> {
    tree: &'a AssemblyTree,
    order: TraversalOrder,
    /// `(id, expanded)`; post-order pushes a node once to expand it and once to emit it
    stack: Vec<(ComponentId, bool)>,
}

impl<'a> Traverse<'a> {
    pub(super) fn new(tree: &'a AssemblyTree, start: Option<ComponentId>, order: TraversalOrder) -> Self {
        Self {
            tree,
            order,
            stack: start.map(|id| (id, false)).into_iter().collect(),
        }
    }
}

impl<'a> Iterator for Traverse<'a> {
    type Item = (ComponentId, &'a AssemblyComponent);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, expanded)) = self.stack.pop() {
            let Some(node) = self.tree.nodes.get(&id) else {
                continue;
            };
            match self.order {
                TraversalOrder::Pre => {
                    self.stack
                        .extend(node.children.iter().rev().map(|&c| (c, false)));
                    return Some((id, &node.component));
                }
                TraversalOrder::Post if expanded => return Some((id, &node.component)),
                TraversalOrder::Post => {
                    self.stack.push((id, true));
                    self.stack
                        .extend(node.children.iter().rev().map(|&c| (c, false)));
                }
            }
        }
        None
    }
}
