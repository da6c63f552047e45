//! NURBS surfaces

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{CadError, CadResult};

use super::basis::{clamp_parameter, derivative_unchecked, domain_of, nonzero_basis, span_index};
use super::curve::{ControlPoint, check_weight};
use super::knot::KnotVector;

/// Point and (optionally) partial derivatives at `(u, v)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub point: DVec3,
    /// `(dS/du, dS/dv)`
    pub tangents: Option<(DVec3, DVec3)>,
}

#[derive(Deserialize)]
struct SurfaceData {
    degree_u: usize,
    degree_v: usize,
    u_count: usize,
    v_count: usize,
    control_points: Vec<ControlPoint>,
    knots_u: KnotVector,
    knots_v: KnotVector,
}

/// A tensor-product (possibly rational) B-spline surface
///
/// Control points are stored row-major with `u` as the outer index:
/// point `(i, j)` lives at `i * v_count + j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SurfaceData")]
pub struct NurbsSurface {
    degree_u: usize,
    degree_v: usize,
    u_count: usize,
    v_count: usize,
    control_points: Vec<ControlPoint>,
    knots_u: KnotVector,
    knots_v: KnotVector,
}

impl TryFrom<SurfaceData> for NurbsSurface {
    type Error = CadError;

    fn try_from(data: SurfaceData) -> CadResult<Self> {
        Self::new(
            data.degree_u,
            data.degree_v,
            data.u_count,
            data.v_count,
            data.control_points,
            data.knots_u,
            data.knots_v,
        )
    }
}

struct Spans {
    u: f64,
    v: f64,
    span_u: usize,
    span_v: usize,
}

impl NurbsSurface {
    /// Create a surface from a `u_count x v_count` control net
    pub fn new(
        degree_u: usize,
        degree_v: usize,
        u_count: usize,
        v_count: usize,
        control_points: Vec<ControlPoint>,
        knots_u: KnotVector,
        knots_v: KnotVector,
    ) -> CadResult<Self> {
        if control_points.len() != u_count * v_count {
            return Err(CadError::InvalidArgument(format!(
                "control net is {}x{} but {} points were given",
                u_count,
                v_count,
                control_points.len()
            )));
        }
        for (dir, degree, count, knots) in [
            ("u", degree_u, u_count, &knots_u),
            ("v", degree_v, v_count, &knots_v),
        ] {
            if count < degree + 1 {
                return Err(CadError::InvalidArgument(format!(
                    "degree {} in {} needs at least {} control points, got {}",
                    degree,
                    dir,
                    degree + 1,
                    count
                )));
            }
            if knots.len() != degree + count + 1 {
                return Err(CadError::InvalidKnots(format!(
                    "expected {} knots in {}, got {}",
                    degree + count + 1,
                    dir,
                    knots.len()
                )));
            }
            domain_of(degree, knots.as_slice())?;
        }
        for (index, cp) in control_points.iter().enumerate() {
            check_weight(index, cp.weight)?;
        }

        Ok(Self {
            degree_u,
            degree_v,
            u_count,
            v_count,
            control_points,
            knots_u,
            knots_v,
        })
    }

    /// Surface with open uniform knot vectors in both directions
    pub fn clamped(
        degree_u: usize,
        degree_v: usize,
        u_count: usize,
        v_count: usize,
        control_points: Vec<ControlPoint>,
    ) -> CadResult<Self> {
        let knots_u = KnotVector::clamped_uniform(degree_u, u_count)?;
        let knots_v = KnotVector::clamped_uniform(degree_v, v_count)?;
        Self::new(
            degree_u,
            degree_v,
            u_count,
            v_count,
            control_points,
            knots_u,
            knots_v,
        )
    }

    pub fn degrees(&self) -> (usize, usize) {
        (self.degree_u, self.degree_v)
    }

    pub fn counts(&self) -> (usize, usize) {
        (self.u_count, self.v_count)
    }

    pub fn control_points(&self) -> &[ControlPoint] {
        &self.control_points
    }

    /// Control point `(i, j)` of the net
    pub fn control_point(&self, i: usize, j: usize) -> Option<&ControlPoint> {
        if i >= self.u_count || j >= self.v_count {
            return None;
        }
        self.control_points.get(i * self.v_count + j)
    }

    /// Parameter domains `((u0, u1), (v0, v1))`
    pub fn domain(&self) -> ((f64, f64), (f64, f64)) {
        let ku = self.knots_u.as_slice();
        let kv = self.knots_v.as_slice();
        (
            (ku[self.degree_u], ku[self.u_count]),
            (kv[self.degree_v], kv[self.v_count]),
        )
    }

    fn spans(&self, u: f64, v: f64) -> CadResult<Spans> {
        let ((u0, u1), (v0, v1)) = self.domain();
        let u = clamp_parameter(u, u0, u1)?;
        let v = clamp_parameter(v, v0, v1)?;
        Ok(Spans {
            u,
            v,
            span_u: span_index(self.u_count - 1, self.degree_u, u, self.knots_u.as_slice()),
            span_v: span_index(self.v_count - 1, self.degree_v, v, self.knots_v.as_slice()),
        })
    }

    /// Point on the surface
    pub fn point_at(&self, u: f64, v: f64) -> CadResult<DVec3> {
        let s = self.spans(u, v)?;
        let nu = nonzero_basis(s.span_u, self.degree_u, s.u, self.knots_u.as_slice());
        let nv = nonzero_basis(s.span_v, self.degree_v, s.v, self.knots_v.as_slice());

        let mut numerator = DVec3::ZERO;
        let mut denominator = 0.0;
        for (a, bu) in nu.iter().enumerate() {
            let i = s.span_u - self.degree_u + a;
            for (b, bv) in nv.iter().enumerate() {
                let j = s.span_v - self.degree_v + b;
                let cp = &self.control_points[i * self.v_count + j];
                let w = bu * bv * cp.weight;
                numerator += cp.position * w;
                denominator += w;
            }
        }
        Ok(numerator / denominator)
    }

    /// Point and first partial derivatives by the quotient rule
    fn point_and_partials(&self, s: &Spans) -> (DVec3, DVec3, DVec3) {
        let ku = self.knots_u.as_slice();
        let kv = self.knots_v.as_slice();
        let du_order = self.degree_u.min(1);
        let dv_order = self.degree_v.min(1);

        let (mut a, mut a_u, mut a_v) = (DVec3::ZERO, DVec3::ZERO, DVec3::ZERO);
        let (mut w, mut w_u, mut w_v) = (0.0, 0.0, 0.0);

        for i in s.span_u - self.degree_u..=s.span_u {
            let n = derivative_unchecked(i, self.degree_u, s.u, ku, s.span_u, 0);
            let dn = if du_order == 1 {
                derivative_unchecked(i, self.degree_u, s.u, ku, s.span_u, 1)
            } else {
                0.0
            };
            for j in s.span_v - self.degree_v..=s.span_v {
                let m = derivative_unchecked(j, self.degree_v, s.v, kv, s.span_v, 0);
                let dm = if dv_order == 1 {
                    derivative_unchecked(j, self.degree_v, s.v, kv, s.span_v, 1)
                } else {
                    0.0
                };
                let cp = &self.control_points[i * self.v_count + j];
                let p = cp.position * cp.weight;
                a += p * (n * m);
                a_u += p * (dn * m);
                a_v += p * (n * dm);
                w += cp.weight * n * m;
                w_u += cp.weight * dn * m;
                w_v += cp.weight * n * dm;
            }
        }

        let point = a / w;
        let su = (a_u - point * w_u) / w;
        let sv = (a_v - point * w_v) / w;
        (point, su, sv)
    }

    /// First partial derivatives `(dS/du, dS/dv)`
    pub fn partials_at(&self, u: f64, v: f64) -> CadResult<(DVec3, DVec3)> {
        let s = self.spans(u, v)?;
        let (_, su, sv) = self.point_and_partials(&s);
        Ok((su, sv))
    }

    /// Unit normal `dS/du x dS/dv`, `None` where the partials are parallel
    pub fn normal_at(&self, u: f64, v: f64) -> CadResult<Option<DVec3>> {
        let (su, sv) = self.partials_at(u, v)?;
        Ok(su.cross(sv).try_normalize())
    }

    /// Evaluate the point and, if requested, both partials
    pub fn evaluate(&self, u: f64, v: f64, with_tangents: bool) -> CadResult<SurfaceSample> {
        if !with_tangents {
            return Ok(SurfaceSample {
                point: self.point_at(u, v)?,
                tangents: None,
            });
        }
        let s = self.spans(u, v)?;
        let (point, su, sv) = self.point_and_partials(&s);
        Ok(SurfaceSample {
            point,
            tangents: Some((su, sv)),
        })
    }

    /// Move control point `(i, j)`; `false` when out of range
    pub fn move_control_point(&mut self, i: usize, j: usize, position: DVec3) -> bool {
        if i >= self.u_count || j >= self.v_count {
            return false;
        }
        match self.control_points.get_mut(i * self.v_count + j) {
            Some(cp) => {
                cp.position = position;
                true
            }
            None => false,
        }
    }
}
