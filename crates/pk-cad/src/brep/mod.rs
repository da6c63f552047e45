//! Boundary representation
//!
//! Vertices, planar faces and solids, plus the builder that validates vertex
//! loops before turning them into faces.

mod builder;
mod topology;

pub use builder::{BRepBuilder, DEFAULT_COINCIDENCE_TOLERANCE, DEFAULT_PLANARITY_TOLERANCE};
pub use topology::{Face, FaceId, Solid, SolidId, Vertex, VertexId};
