//! Face construction from vertex loops

use glam::{DVec2, DVec3};
use uuid::Uuid;

use crate::error::{CadError, CadResult};

use super::topology::{Face, FaceId, Solid, Vertex};

/// Default distance below which two vertices are the same point
pub const DEFAULT_COINCIDENCE_TOLERANCE: f64 = 1e-9;

/// Default planarity tolerance, relative to the loop's radius
pub const DEFAULT_PLANARITY_TOLERANCE: f64 = 1e-6;

/// Builds validated planar faces from ordered vertex loops
///
/// The builder only reads vertices; it never mutates or takes ownership of
/// them, so disjoint loops can be built from several threads at once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BRepBuilder {
    coincidence: f64,
    planarity: f64,
}

impl Default for BRepBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BRepBuilder {
    /// Create a builder with default tolerances
    pub fn new() -> Self {
        Self {
            coincidence: DEFAULT_COINCIDENCE_TOLERANCE,
            planarity: DEFAULT_PLANARITY_TOLERANCE,
        }
    }

    /// Create a builder with explicit tolerances
    pub fn with_tolerances(coincidence: f64, planarity: f64) -> Self {
        Self {
            coincidence: coincidence.max(0.0),
            planarity: planarity.max(0.0),
        }
    }

    pub fn coincidence_tolerance(&self) -> f64 {
        self.coincidence
    }

    pub fn planarity_tolerance(&self) -> f64 {
        self.planarity
    }

    /// Build a face; the loop order defines the normal by the right-hand rule
    pub fn create_face(&self, vertices: &[&Vertex]) -> CadResult<Face> {
        self.build(vertices, None)
    }

    /// Build a face wound counter-clockwise around `reference_normal`
    ///
    /// The loop is reversed when its own normal points away from the reference.
    pub fn create_face_oriented(
        &self,
        vertices: &[&Vertex],
        reference_normal: DVec3,
    ) -> CadResult<Face> {
        self.build(vertices, Some(reference_normal))
    }

    /// Build one face per loop; fails without producing anything if any loop fails
    pub fn create_solid(&self, loops: &[Vec<&Vertex>]) -> CadResult<Solid> {
        let faces = loops
            .iter()
            .map(|l| self.create_face(l))
            .collect::<CadResult<Vec<_>>>()?;
        Solid::new(faces)
    }

    fn build(&self, vertices: &[&Vertex], reference: Option<DVec3>) -> CadResult<Face> {
        let mut ring: Vec<&Vertex> = Vec::with_capacity(vertices.len());
        for &v in vertices {
            if !v.position.is_finite() {
                return Err(CadError::InvalidArgument(format!(
                    "vertex {} has a non-finite position",
                    v.id.0
                )));
            }
            if ring.last().is_some_and(|last| self.coincident(last, v)) {
                continue;
            }
            ring.push(v);
        }
        while ring.len() > 1 && self.coincident(ring[0], ring[ring.len() - 1]) {
            ring.pop();
        }
        if ring.len() < 3 {
            return Err(CadError::InsufficientVertices { found: ring.len() });
        }

        for i in 0..ring.len() {
            for j in i + 1..ring.len() {
                if self.coincident(ring[i], ring[j]) {
                    return Err(CadError::DegenerateLoop(format!(
                        "vertices {} and {} coincide",
                        i, j
                    )));
                }
            }
        }

        let positions: Vec<DVec3> = ring.iter().map(|v| v.position).collect();
        let n = positions.len();
        let centroid = positions.iter().copied().sum::<DVec3>() / n as f64;
        let extent = positions
            .iter()
            .map(|p| p.distance(centroid))
            .fold(0.0, f64::max);

        // Newell: half the sum of edge cross products is the vector area
        let mut area_vector = DVec3::ZERO;
        for i in 0..n {
            let a = positions[i] - centroid;
            let b = positions[(i + 1) % n] - centroid;
            area_vector += a.cross(b);
        }
        area_vector *= 0.5;

        let area = area_vector.length();
        if area <= self.coincidence * extent {
            return Err(CadError::DegenerateLoop("vertices are collinear".into()));
        }
        let mut normal = area_vector / area;

        let deviation = positions
            .iter()
            .map(|p| normal.dot(*p - centroid).abs())
            .fold(0.0, f64::max);
        if deviation > self.planarity * extent {
            return Err(CadError::NonPlanar { deviation });
        }

        self.check_simple(&positions, centroid, normal, extent)?;

        let mut ids: Vec<_> = ring.iter().map(|v| v.id).collect();
        if let Some(reference) = reference
            && normal.dot(reference) < 0.0
        {
            ids[1..].reverse();
            normal = -normal;
        }

        tracing::debug!(vertices = n, area, "created face");

        Ok(Face {
            id: FaceId(Uuid::new_v4()),
            vertices: ids,
            normal,
            plane_offset: normal.dot(centroid),
            area,
            centroid,
        })
    }

    fn coincident(&self, a: &Vertex, b: &Vertex) -> bool {
        a.position.distance(b.position) <= self.coincidence
    }

    /// Reject loops whose projection onto the face plane crosses itself
    fn check_simple(
        &self,
        positions: &[DVec3],
        centroid: DVec3,
        normal: DVec3,
        extent: f64,
    ) -> CadResult<()> {
        let u_axis = normal.any_orthonormal_vector();
        let v_axis = normal.cross(u_axis);
        let pts: Vec<DVec2> = positions
            .iter()
            .map(|p| {
                let d = *p - centroid;
                DVec2::new(d.dot(u_axis), d.dot(v_axis))
            })
            .collect();
        let n = pts.len();
        let eps = self.coincidence * extent;

        // Edges that fold straight back onto their predecessor
        for i in 0..n {
            let prev = (i + n - 1) % n;
            let d1 = pts[i] - pts[prev];
            let d2 = pts[(i + 1) % n] - pts[i];
            let folded = d1.perp_dot(d2).abs() <= 1e-9 * d1.length() * d2.length();
            if folded && d1.dot(d2) < 0.0 {
                return Err(CadError::SelfIntersecting {
                    first: prev,
                    second: i,
                });
            }
        }

        for i in 0..n {
            for j in i + 2..n {
                if i == 0 && j == n - 1 {
                    continue;
                }
                let (p1, p2) = (pts[i], pts[(i + 1) % n]);
                let (q1, q2) = (pts[j], pts[(j + 1) % n]);
                if segments_intersect(p1, p2, q1, q2, eps, self.coincidence) {
                    return Err(CadError::SelfIntersecting {
                        first: i,
                        second: j,
                    });
                }
            }
        }
        Ok(())
    }
}

fn orient(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

fn on_segment(a: DVec2, b: DVec2, p: DVec2, tol: f64) -> bool {
    p.x >= a.x.min(b.x) - tol
        && p.x <= a.x.max(b.x) + tol
        && p.y >= a.y.min(b.y) - tol
        && p.y <= a.y.max(b.y) + tol
}

fn segments_intersect(p1: DVec2, p2: DVec2, q1: DVec2, q2: DVec2, eps: f64, tol: f64) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);

    let straddles = |a: f64, b: f64| (a > eps && b < -eps) || (a < -eps && b > eps);
    if straddles(d1, d2) && straddles(d3, d4) {
        return true;
    }

    (d1.abs() <= eps && on_segment(q1, q2, p1, tol))
        || (d2.abs() <= eps && on_segment(q1, q2, p2, tol))
        || (d3.abs() <= eps && on_segment(p1, p2, q1, tol))
        || (d4.abs() <= eps && on_segment(p1, p2, q2, tol))
}
