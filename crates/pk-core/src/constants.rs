//! Global constants for pk-core

/// Default distance below which two vertices are the same point
pub const DEFAULT_COINCIDENCE_TOLERANCE: f64 = pk_cad::brep::DEFAULT_COINCIDENCE_TOLERANCE;

/// Default planarity tolerance, relative to the size of the vertex loop
pub const DEFAULT_PLANARITY_TOLERANCE: f64 = pk_cad::brep::DEFAULT_PLANARITY_TOLERANCE;

/// Default number of sections produced when sweeping a profile
pub const DEFAULT_SWEEP_SAMPLES: usize = 16;

/// Default tolerance for length and orientation rules
pub const DEFAULT_CONSTRAINT_TOLERANCE: f64 = 1e-6;

/// Name given to the root component of a new assembly
pub const DEFAULT_ROOT_NAME: &str = "root";
