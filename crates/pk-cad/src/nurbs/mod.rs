//! B-spline / NURBS evaluation
//!
//! Basis functions, knot vectors, curves, surfaces and profile transforms.
//! Everything in this module is either a pure function or a value type, so it
//! can be used from any number of threads without synchronization.

mod basis;
mod curve;
mod knot;
mod profile;
mod surface;

pub use basis::{basis_derivative, basis_function, basis_functions, find_span};
pub use curve::{ControlPoint, CurveSample, NurbsCurve};
pub use knot::{KNOT_EPSILON, KnotVector, validate_knots};
pub use profile::{Profile, SweepSection, sweep_profile, transform_profile};
pub use surface::{NurbsSurface, SurfaceSample};
