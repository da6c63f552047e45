//! Geometric entities that rules are evaluated against

use glam::DVec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::brep::Face;
use crate::nurbs::NurbsCurve;

/// Identifier the editing layer uses to bind rules to its entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// A borrowed view of a geometric entity
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    /// A single point
    Point(DVec3),
    /// A straight segment between two end points
    Line { start: DVec3, end: DVec3 },
    /// A B-spline curve
    Curve(&'a NurbsCurve),
    /// A planar face
    Face(&'a Face),
}

impl<'a> Entity<'a> {
    /// Line between two end points
    pub fn line(start: DVec3, end: DVec3) -> Self {
        Entity::Line { start, end }
    }

    /// Short name for messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Entity::Point(_) => "point",
            Entity::Line { .. } => "line",
            Entity::Curve(_) => "curve",
            Entity::Face(_) => "face",
        }
    }
}
