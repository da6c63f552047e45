//! Planar profiles and their transformation along a path
//!
//! A [`Profile`] is a value: transforming it always produces a new profile and
//! never touches the input.

use glam::{DMat2, DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::error::{CadError, CadResult};

use super::curve::NurbsCurve;

/// An ordered set of 2D points with a local origin
///
/// The local axis used for twisting is the profile-plane normal through
/// `origin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProfileData")]
pub struct Profile {
    points: Vec<DVec2>,
    origin: DVec2,
}

#[derive(Deserialize)]
struct ProfileData {
    points: Vec<DVec2>,
    origin: DVec2,
}

impl TryFrom<ProfileData> for Profile {
    type Error = CadError;

    fn try_from(data: ProfileData) -> CadResult<Self> {
        Self::with_origin(data.points, data.origin)
    }
}

impl Profile {
    /// Create a profile whose local origin is the centroid of its points
    pub fn new(points: Vec<DVec2>) -> CadResult<Self> {
        let origin = centroid(&points)?;
        Ok(Self { points, origin })
    }

    /// Create a profile with an explicit local origin
    pub fn with_origin(points: Vec<DVec2>, origin: DVec2) -> CadResult<Self> {
        if points.is_empty() {
            return Err(CadError::DegenerateProfile("profile has no points".into()));
        }
        Ok(Self { points, origin })
    }

    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    pub fn origin(&self) -> DVec2 {
        self.origin
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn centroid(points: &[DVec2]) -> CadResult<DVec2> {
    if points.is_empty() {
        return Err(CadError::DegenerateProfile("profile has no points".into()));
    }
    Ok(points.iter().copied().sum::<DVec2>() / points.len() as f64)
}

/// Scale a profile uniformly and rotate it by `twist` radians about its local axis
///
/// A scale of zero is accepted and collapses every point onto the local
/// origin. Negative or non-finite scales and non-finite twists are rejected.
pub fn transform_profile(profile: &Profile, scale: f64, twist: f64) -> CadResult<Profile> {
    if profile.points.is_empty() {
        return Err(CadError::DegenerateProfile("profile has no points".into()));
    }
    if !scale.is_finite() || scale < 0.0 {
        return Err(CadError::InvalidArgument(format!(
            "scale must be finite and non-negative, got {}",
            scale
        )));
    }
    if !twist.is_finite() {
        return Err(CadError::InvalidArgument(format!(
            "twist must be finite, got {}",
            twist
        )));
    }

    let rotation = DMat2::from_angle(twist);
    let origin = profile.origin;
    let points = profile
        .points
        .iter()
        .map(|p| origin + rotation * (*p - origin) * scale)
        .collect();

    Ok(Profile { points, origin })
}

/// A transformed profile placed in 3D along a path
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSection {
    /// Path parameter of this section
    pub parameter: f64,
    /// Path point the profile origin is mapped to
    pub origin: DVec3,
    /// Unit path tangent (the section's plane normal)
    pub tangent: DVec3,
    /// Profile points in world coordinates
    pub points: Vec<DVec3>,
}

fn any_perpendicular(v: DVec3) -> DVec3 {
    let axis = if v.x.abs() <= v.y.abs() && v.x.abs() <= v.z.abs() {
        DVec3::X
    } else if v.y.abs() <= v.z.abs() {
        DVec3::Y
    } else {
        DVec3::Z
    };
    v.cross(axis).normalize()
}

/// Place `sections` copies of a profile along a path
///
/// Scale is interpolated linearly from 1 at the start to `end_scale` at the
/// end, twist from 0 to `total_twist`. Frames are propagated with the double
/// reflection method so the profile does not spin around the path on its own.
pub fn sweep_profile(
    profile: &Profile,
    path: &NurbsCurve,
    sections: usize,
    end_scale: f64,
    total_twist: f64,
) -> CadResult<Vec<SweepSection>> {
    if sections < 2 {
        return Err(CadError::InvalidArgument(format!(
            "sweep needs at least 2 sections, got {}",
            sections
        )));
    }
    if !end_scale.is_finite() || end_scale < 0.0 {
        return Err(CadError::InvalidArgument(format!(
            "end scale must be finite and non-negative, got {}",
            end_scale
        )));
    }

    let (start, end) = path.domain();
    let mut out = Vec::with_capacity(sections);
    let mut previous: Option<(DVec3, DVec3, DVec3)> = None;

    for k in 0..sections {
        let t = k as f64 / (sections - 1) as f64;
        let u = start + (end - start) * t;
        let sample = path.evaluate(u, true)?;
        let tangent = sample
            .tangent
            .and_then(|d| d.try_normalize())
            .ok_or_else(|| {
                CadError::InvalidArgument(format!("path has no tangent at u = {}", u))
            })?;

        let normal = match previous {
            None => any_perpendicular(tangent),
            Some((prev_point, prev_tangent, prev_normal)) => {
                // Reflect across the bisector plane of the chord, then across
                // the plane between the reflected and actual tangent.
                let v1 = sample.point - prev_point;
                let c1 = v1.length_squared();
                let (r_l, t_l) = if c1 <= f64::EPSILON {
                    (prev_normal, prev_tangent)
                } else {
                    (
                        prev_normal - v1 * (2.0 / c1 * v1.dot(prev_normal)),
                        prev_tangent - v1 * (2.0 / c1 * v1.dot(prev_tangent)),
                    )
                };
                let v2 = tangent - t_l;
                let c2 = v2.length_squared();
                let r = if c2 <= f64::EPSILON {
                    r_l
                } else {
                    r_l - v2 * (2.0 / c2 * v2.dot(r_l))
                };
                (r - tangent * r.dot(tangent)).normalize_or(any_perpendicular(tangent))
            }
        };
        let binormal = tangent.cross(normal);

        let scale = 1.0 + (end_scale - 1.0) * t;
        let local = transform_profile(profile, scale, total_twist * t)?;
        let origin = local.origin;
        let points = local
            .points
            .iter()
            .map(|p| {
                let d = *p - origin;
                sample.point + normal * d.x + binormal * d.y
            })
            .collect();

        out.push(SweepSection {
            parameter: u,
            origin: sample.point,
            tangent,
            points,
        });
        previous = Some((sample.point, tangent, normal));
    }

    tracing::trace!(sections = out.len(), "swept profile");
    Ok(out)
}
