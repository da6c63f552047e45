//! Component and node types for the assembly tree

use std::collections::HashMap;

use glam::DAffine3;
use pk_cad::{Face, Solid};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable handle to a component in an [`AssemblyTree`](super::AssemblyTree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub Uuid);

impl ComponentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geometry owned by a component
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ComponentGeometry {
    /// Grouping node without geometry
    #[default]
    Empty,
    Face(Face),
    Solid(Solid),
}

/// A part or sub-assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyComponent {
    pub name: String,
    pub geometry: ComponentGeometry,
    /// Placement relative to the parent component
    pub local_transform: DAffine3,
}

impl AssemblyComponent {
    /// Create a new component without geometry
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geometry: ComponentGeometry::Empty,
            local_transform: DAffine3::IDENTITY,
        }
    }

    /// Create a component owning a single face
    pub fn from_face(name: impl Into<String>, face: Face) -> Self {
        Self {
            geometry: ComponentGeometry::Face(face),
            ..Self::empty(name)
        }
    }

    /// Create a component owning a solid
    pub fn from_solid(name: impl Into<String>, solid: Solid) -> Self {
        Self {
            geometry: ComponentGeometry::Solid(solid),
            ..Self::empty(name)
        }
    }

    pub fn with_transform(mut self, transform: DAffine3) -> Self {
        self.local_transform = transform;
        self
    }
}

/// Arena slot: the component plus its links
///
/// `parent` is a navigation link only; ownership flows from the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentNode {
    pub(crate) component: AssemblyComponent,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) children: Vec<ComponentId>,
}

impl ComponentNode {
    pub(crate) fn new(component: AssemblyComponent) -> Self {
        Self {
            component,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn component(&self) -> &AssemblyComponent {
        &self.component
    }

    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }
}

/// A detached subtree handed back by
/// [`AssemblyTree::remove_component`](super::AssemblyTree::remove_component)
///
/// The caller owns it and may drop it or re-attach it with
/// [`AssemblyTree::attach_subtree`](super::AssemblyTree::attach_subtree).
#[derive(Debug, Clone, PartialEq)]
pub struct Subtree {
    pub(crate) root: ComponentId,
    pub(crate) nodes: HashMap<ComponentId, ComponentNode>,
}

impl Subtree {
    /// Id of the subtree's top component
    pub fn root(&self) -> ComponentId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: ComponentId) -> Option<&AssemblyComponent> {
        self.nodes.get(&id).map(|n| &n.component)
    }

    /// Components in pre-order, children in insertion order
    pub fn ids(&self) -> Vec<ComponentId> {
        let mut result = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                result.push(id);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        result
    }

    /// Take ownership of every component, discarding the hierarchy
    pub fn into_components(self) -> Vec<(ComponentId, AssemblyComponent)> {
        let order = self.ids();
        let mut nodes = self.nodes;
        order
            .into_iter()
            .filter_map(|id| nodes.remove(&id).map(|n| (id, n.component)))
            .collect()
    }
}
