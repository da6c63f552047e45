//! B-Rep topology types

use glam::DVec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CadError, CadResult};

/// Non-owning reference to a [`Vertex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexId(pub Uuid);

impl VertexId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VertexId {
    fn default() -> Self {
        Self::new()
    }
}

/// A point that faces refer to by id
///
/// Vertices are owned by the caller (sketch, mesh store, ...). Faces only keep
/// their [`VertexId`]s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub position: DVec3,
}

impl Vertex {
    /// Create a vertex with a fresh id
    pub fn new(position: DVec3) -> Self {
        Self {
            id: VertexId::new(),
            position,
        }
    }

    pub fn from_xyz(x: f64, y: f64, z: f64) -> Self {
        Self::new(DVec3::new(x, y, z))
    }
}

/// Unique identifier for a face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceId(pub Uuid);

/// A planar face bounded by a single closed vertex loop
///
/// The loop is stored without the closing repeat of the first vertex and is
/// wound counter-clockwise around `normal` (right-hand rule).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FaceData")]
pub struct Face {
    pub(crate) id: FaceId,
    pub(crate) vertices: Vec<VertexId>,
    pub(crate) normal: DVec3,
    pub(crate) plane_offset: f64,
    pub(crate) area: f64,
    pub(crate) centroid: DVec3,
}

impl Face {
    pub fn id(&self) -> FaceId {
        self.id
    }

    /// The normalized vertex loop
    pub fn vertex_ids(&self) -> &[VertexId] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Unit normal of the supporting plane
    pub fn normal(&self) -> DVec3 {
        self.normal
    }

    /// `d` in the plane equation `normal . x = d`
    pub fn plane_offset(&self) -> f64 {
        self.plane_offset
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    /// Average of the loop's vertex positions
    pub fn centroid(&self) -> DVec3 {
        self.centroid
    }

    /// Whether the loop references a vertex
    pub fn references(&self, vertex: VertexId) -> bool {
        self.vertices.contains(&vertex)
    }

    /// Signed distance of a point from the face's plane
    pub fn signed_distance(&self, point: DVec3) -> f64 {
        self.normal.dot(point) - self.plane_offset
    }

    /// Same face with opposite winding and normal
    ///
    /// The first vertex stays first so the loop start is stable.
    pub fn reversed(&self) -> Face {
        let mut vertices = Vec::with_capacity(self.vertices.len());
        if let Some((first, rest)) = self.vertices.split_first() {
            vertices.push(*first);
            vertices.extend(rest.iter().rev().copied());
        }
        Face {
            id: FaceId(Uuid::new_v4()),
            vertices,
            normal: -self.normal,
            plane_offset: -self.plane_offset,
            area: self.area,
            centroid: self.centroid,
        }
    }

    /// Resolve the loop against a caller-owned vertex store
    ///
    /// Returns `None` if any referenced vertex is missing.
    pub fn positions<F>(&self, mut lookup: F) -> Option<Vec<DVec3>>
    where
        F: FnMut(VertexId) -> Option<DVec3>,
    {
        self.vertices.iter().map(|id| lookup(*id)).collect()
    }
}

#[derive(Deserialize)]
struct FaceData {
    id: FaceId,
    vertices: Vec<VertexId>,
    normal: DVec3,
    plane_offset: f64,
    area: f64,
    centroid: DVec3,
}

impl TryFrom<FaceData> for Face {
    type Error = CadError;

    fn try_from(data: FaceData) -> CadResult<Self> {
        let count = data.vertices.len();
        if count < 3 {
            return Err(CadError::InsufficientVertices { found: count });
        }
        for i in 0..count {
            if data.vertices[i + 1..].contains(&data.vertices[i]) {
                return Err(CadError::DegenerateLoop(format!(
                    "vertex {} appears more than once",
                    i
                )));
            }
        }
        if !data.normal.is_finite() || (data.normal.length() - 1.0).abs() > 1e-9 {
            return Err(CadError::InvalidArgument(format!(
                "face normal {} is not a unit vector",
                data.normal
            )));
        }
        if !data.area.is_finite() || data.area <= 0.0 {
            return Err(CadError::DegenerateLoop(format!(
                "face area must be positive, got {}",
                data.area
            )));
        }
        if !data.centroid.is_finite() || !data.plane_offset.is_finite() {
            return Err(CadError::InvalidArgument(
                "face plane is not finite".into(),
            ));
        }
        let drift = (data.normal.dot(data.centroid) - data.plane_offset).abs();
        if drift > 1e-9 * data.plane_offset.abs().max(1.0) {
            return Err(CadError::InvalidArgument(format!(
                "centroid lies {:.3e} off the face plane",
                drift
            )));
        }

        Ok(Self {
            id: data.id,
            vertices: data.vertices,
            normal: data.normal,
            plane_offset: data.plane_offset,
            area: data.area,
            centroid: data.centroid,
        })
    }
}

/// Unique identifier for a solid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SolidId(pub Uuid);

/// A set of faces owned together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SolidData")]
pub struct Solid {
    id: SolidId,
    faces: Vec<Face>,
}

#[derive(Deserialize)]
struct SolidData {
    id: SolidId,
    faces: Vec<Face>,
}

impl TryFrom<SolidData> for Solid {
    type Error = CadError;

    fn try_from(data: SolidData) -> CadResult<Self> {
        let mut solid = Self::new(data.faces)?;
        solid.id = data.id;
        Ok(solid)
    }
}

impl Solid {
    /// Create a solid from at least one face
    pub fn new(faces: Vec<Face>) -> CadResult<Self> {
        if faces.is_empty() {
            return Err(CadError::InvalidArgument(
                "a solid needs at least one face".into(),
            ));
        }
        Ok(Self {
            id: SolidId(Uuid::new_v4()),
            faces,
        })
    }

    pub fn id(&self) -> SolidId {
        self.id
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Total area of all faces
    pub fn area(&self) -> f64 {
        self.faces.iter().map(Face::area).sum()
    }

    pub fn into_faces(self) -> Vec<Face> {
        self.faces
    }
}
