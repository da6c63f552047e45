//! Assembly hierarchy
//!
//! Components live in an arena keyed by [`ComponentId`]. Each node stores its
//! parent as an id and its children as an ordered id list, so the tree has a
//! single owner and back-references never keep anything alive.
//!
//! A component can be inserted *floating* (in the arena, outside the
//! hierarchy) and attached later. Every mutation checks all of its
//! preconditions before touching the arena; a failed call leaves the tree
//! exactly as it was.

mod queries;
mod traverse;
mod types;

use std::collections::HashMap;

use glam::DAffine3;
use pk_cad::ErrorCode;
use tracing::{debug, warn};

pub use traverse::{Traverse, TraversalOrder};
pub use types::{AssemblyComponent, ComponentGeometry, ComponentId, ComponentNode, Subtree};

use crate::constants::DEFAULT_ROOT_NAME;

/// Tree of parts and sub-assemblies
#[derive(Debug, Clone)]
pub struct AssemblyTree {
    pub(crate) nodes: HashMap<ComponentId, ComponentNode>,
    root: ComponentId,
}

impl Default for AssemblyTree {
    fn default() -> Self {
        Self::new(AssemblyComponent::empty(DEFAULT_ROOT_NAME))
    }
}

impl AssemblyTree {
    /// Create a tree owning `root`
    pub fn new(root: AssemblyComponent) -> Self {
        let id = ComponentId::new();
        let mut nodes = HashMap::new();
        nodes.insert(id, ComponentNode::new(root));
        Self { nodes, root: id }
    }

    /// Id of the root component
    pub fn root(&self) -> ComponentId {
        self.root
    }

    /// Number of components, floating ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ============== Mutation ==============

    /// Store a floating component; attach it with [`add_component`](Self::add_component)
    pub fn insert(&mut self, component: AssemblyComponent) -> ComponentId {
        let id = ComponentId::new();
        self.nodes.insert(id, ComponentNode::new(component));
        id
    }

    /// Create a component directly under `parent`
    pub fn insert_under(
        &mut self,
        parent: ComponentId,
        component: AssemblyComponent,
    ) -> Result<ComponentId, AssemblyError> {
        self.require(parent)?;
        let id = self.insert(component);
        self.link(parent, id);
        debug!(%parent, child = %id, "inserted component");
        Ok(id)
    }

    /// Attach an existing floating component as the last child of `parent`
    pub fn add_component(
        &mut self,
        parent: ComponentId,
        child: ComponentId,
    ) -> Result<(), AssemblyError> {
        if let Err(e) = self.check_attach(parent, child) {
            warn!(%parent, %child, "rejected attach: {}", e);
            return Err(e);
        }
        self.link(parent, child);
        debug!(%parent, %child, "attached component");
        Ok(())
    }

    /// Detach a component and its whole subtree
    ///
    /// The detached nodes leave the arena and are returned to the caller.
    pub fn remove_component(&mut self, id: ComponentId) -> Result<Subtree, AssemblyError> {
        self.require(id)?;
        if id == self.root {
            return Err(AssemblyError::RootComponent);
        }

        // Collect all descendants
        let mut to_remove = vec![id];
        let mut i = 0;
        while i < to_remove.len() {
            if let Some(node) = self.nodes.get(&to_remove[i]) {
                to_remove.extend(node.children.iter().copied());
            }
            i += 1;
        }

        self.unlink(id);
        let nodes: HashMap<_, _> = to_remove
            .iter()
            .filter_map(|cid| self.nodes.remove(cid).map(|n| (*cid, n)))
            .collect();
        debug!(component = %id, removed = nodes.len(), "removed subtree");
        Ok(Subtree { root: id, nodes })
    }

    /// Put a detached subtree back under `parent`, keeping its ids and order
    pub fn attach_subtree(
        &mut self,
        parent: ComponentId,
        subtree: Subtree,
    ) -> Result<ComponentId, AssemblyError> {
        self.require(parent)?;
        if let Some(clash) = subtree.nodes.keys().find(|id| self.nodes.contains_key(id)) {
            return Err(AssemblyError::DuplicateComponent(*clash));
        }
        let root = subtree.root;
        if !subtree.nodes.contains_key(&root) {
            return Err(AssemblyError::ComponentNotFound(root));
        }
        self.nodes.extend(subtree.nodes);
        self.link(parent, root);
        debug!(%parent, component = %root, "attached subtree");
        Ok(root)
    }

    /// Re-parent a component, appending it to `new_parent`'s children
    ///
    /// Equivalent to remove then add, validated as a whole up front.
    pub fn move_component(
        &mut self,
        id: ComponentId,
        new_parent: ComponentId,
    ) -> Result<(), AssemblyError> {
        let checked = self.require(id).and_then(|_| self.require(new_parent)).and_then(|_| {
            if id == self.root {
                Err(AssemblyError::RootComponent)
            } else if self.would_create_cycle(new_parent, id) {
                Err(AssemblyError::WouldCreateCycle)
            } else {
                Ok(())
            }
        });
        if let Err(e) = checked {
            warn!(component = %id, %new_parent, "rejected move: {}", e);
            return Err(e);
        }
        self.unlink(id);
        self.link(new_parent, id);
        debug!(component = %id, %new_parent, "moved component");
        Ok(())
    }

    // ============== Traversal ==============

    /// Lazy depth-first walk from the root
    ///
    /// Every call starts fresh. Floating components are not visited.
    pub fn traverse(&self, order: TraversalOrder) -> Traverse<'_> {
        Traverse::new(self, Some(self.root), order)
    }

    /// Lazy depth-first walk of the subtree under `id`
    pub fn traverse_from(
        &self,
        id: ComponentId,
        order: TraversalOrder,
    ) -> Result<Traverse<'_>, AssemblyError> {
        self.require(id)?;
        Ok(Traverse::new(self, Some(id), order))
    }

    /// Placement of a component in root space
    pub fn world_transform(&self, id: ComponentId) -> Option<DAffine3> {
        let mut transform = self.nodes.get(&id)?.component.local_transform;
        let mut current = self.nodes.get(&id)?.parent;
        while let Some(pid) = current {
            let node = self.nodes.get(&pid)?;
            transform = node.component.local_transform * transform;
            current = node.parent;
        }
        Some(transform)
    }

    // ============== Internals ==============

    fn require(&self, id: ComponentId) -> Result<(), AssemblyError> {
        if self.nodes.contains_key(&id) {
            Ok(())
        } else {
            Err(AssemblyError::ComponentNotFound(id))
        }
    }

    fn check_attach(&self, parent: ComponentId, child: ComponentId) -> Result<(), AssemblyError> {
        self.require(parent)?;
        self.require(child)?;
        if child == self.root {
            return Err(AssemblyError::RootComponent);
        }
        if self.would_create_cycle(parent, child) {
            return Err(AssemblyError::WouldCreateCycle);
        }
        if self.nodes.get(&child).is_some_and(|n| n.parent.is_some()) {
            return Err(AssemblyError::AlreadyHasParent(child));
        }
        Ok(())
    }

    /// Check if attaching child under parent would create a cycle
    fn would_create_cycle(&self, parent: ComponentId, child: ComponentId) -> bool {
        let mut current = Some(parent);
        while let Some(id) = current {
            if id == child {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    /// Append `child` to `parent`; both must exist and `child` must be detached
    fn link(&mut self, parent: ComponentId, child: ComponentId) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
    }

    /// Clear `child`'s parent link on both sides
    fn unlink(&mut self, child: ComponentId) {
        let parent = self.nodes.get_mut(&child).and_then(|n| n.parent.take());
        if let Some(pid) = parent
            && let Some(node) = self.nodes.get_mut(&pid)
        {
            node.children.retain(|c| *c != child);
        }
    }
}

/// Assembly-related errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssemblyError {
    #[error("Component not found: {0}")]
    ComponentNotFound(ComponentId),
    #[error("Connection would create a cycle")]
    WouldCreateCycle,
    #[error("Component already has a parent: {0}")]
    AlreadyHasParent(ComponentId),
    #[error("The root component cannot be detached or re-parented")]
    RootComponent,
    #[error("Component already in the tree: {0}")]
    DuplicateComponent(ComponentId),
}

impl AssemblyError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AssemblyError::ComponentNotFound(_) | AssemblyError::DuplicateComponent(_) => {
                ErrorCode::InvalidArgument
            }
            AssemblyError::WouldCreateCycle
            | AssemblyError::AlreadyHasParent(_)
            | AssemblyError::RootComponent => ErrorCode::InvalidOperation,
        }
    }
}
