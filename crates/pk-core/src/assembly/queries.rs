//! Query methods for AssemblyTree

use super::AssemblyTree;
use super::traverse::TraversalOrder;
use super::types::{AssemblyComponent, ComponentId, ComponentNode};

impl AssemblyTree {
    // ============== Query Helpers ==============

    pub fn contains(&self, id: ComponentId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: ComponentId) -> Option<&AssemblyComponent> {
        self.nodes.get(&id).map(|n| &n.component)
    }

    /// Mutable access to a component's data; the hierarchy stays read-only
    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut AssemblyComponent> {
        self.nodes.get_mut(&id).map(|n| &mut n.component)
    }

    pub fn node(&self, id: ComponentId) -> Option<&ComponentNode> {
        self.nodes.get(&id)
    }

    /// Get the parent ID of a component
    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Get the direct children of a component in insertion order
    pub fn children(&self, id: ComponentId) -> Option<&[ComponentId]> {
        self.nodes.get(&id).map(|n| n.children.as_slice())
    }

    /// Chain of ancestors, nearest first
    pub fn ancestors(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(pid) = current {
            chain.push(pid);
            current = self.parent(pid);
        }
        chain
    }

    /// Get all descendant IDs in pre-order
    pub fn descendants(&self, id: ComponentId) -> Vec<ComponentId> {
        match self.traverse_from(id, TraversalOrder::Pre) {
            Ok(walk) => walk.skip(1).map(|(cid, _)| cid).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Get component depth from its top ancestor (root = 0)
    pub fn depth(&self, id: ComponentId) -> usize {
        self.ancestors(id).len()
    }

    /// Check if a component is a strict ancestor of another
    pub fn is_ancestor(&self, ancestor: ComponentId, descendant: ComponentId) -> bool {
        let mut current = self.parent(descendant);
        while let Some(pid) = current {
            if pid == ancestor {
                return true;
            }
            current = self.parent(pid);
        }
        false
    }

    /// Whether a component is reachable from the root
    pub fn is_attached(&self, id: ComponentId) -> bool {
        id == self.root() || self.is_ancestor(self.root(), id)
    }

    /// Components in the arena but outside the hierarchy, top ones only
    pub fn floating(&self) -> Vec<ComponentId> {
        let mut ids: Vec<_> = self
            .nodes
            .iter()
            .filter(|(id, n)| n.parent.is_none() && **id != self.root())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// First attached component with the given name, in pre-order
    pub fn find_by_name(&self, name: &str) -> Option<ComponentId> {
        self.traverse(TraversalOrder::Pre)
            .find(|(_, c)| c.name == name)
            .map(|(id, _)| id)
    }
}
