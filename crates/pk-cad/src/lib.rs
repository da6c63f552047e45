//! Parametric Geometry Kernel
//!
//! This crate provides:
//! - B-spline basis functions and NURBS curve/surface evaluation
//! - Profile transformation and sweeping along a path curve
//! - Planar B-Rep face construction with loop validation
//! - Constraint rules with per-entity validation

pub mod brep;
pub mod constraint;
pub mod error;
pub mod nurbs;

// Re-exports for convenience
pub use brep::{BRepBuilder, Face, FaceId, Solid, SolidId, Vertex, VertexId};
pub use constraint::{
    ConstraintRule, ConstraintSystem, Entity, EntityId, LengthConstraint, RuleKind, Validation,
    Violation,
};
pub use error::{CadError, CadResult, ErrorCode, ErrorReport};
pub use nurbs::{
    ControlPoint, CurveSample, KnotVector, NurbsCurve, NurbsSurface, Profile, SurfaceSample,
    SweepSection, basis_derivative, basis_function, basis_functions, find_span, sweep_profile,
    transform_profile,
};
