//! Knot vectors

use serde::{Deserialize, Serialize};

use crate::error::{CadError, CadResult};

/// Knot spans narrower than this are treated as empty (repeated knots)
pub const KNOT_EPSILON: f64 = 1e-12;

/// Check that a raw knot slice is finite and non-decreasing
pub fn validate_knots(knots: &[f64]) -> CadResult<()> {
    if let Some(pos) = knots.iter().position(|k| !k.is_finite()) {
        return Err(CadError::InvalidKnots(format!(
            "knot {} is not finite",
            pos
        )));
    }
    if let Some(pos) = knots.windows(2).position(|w| w[1] < w[0]) {
        return Err(CadError::InvalidKnots(format!(
            "knots must be non-decreasing (knot {} = {} > knot {} = {})",
            pos,
            knots[pos],
            pos + 1,
            knots[pos + 1]
        )));
    }
    Ok(())
}

/// An ordered, non-decreasing sequence of parameter values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct KnotVector {
    values: Vec<f64>,
}

impl TryFrom<Vec<f64>> for KnotVector {
    type Error = CadError;

    fn try_from(values: Vec<f64>) -> CadResult<Self> {
        Self::new(values)
    }
}

impl From<KnotVector> for Vec<f64> {
    fn from(knots: KnotVector) -> Self {
        knots.values
    }
}

impl KnotVector {
    /// Create a knot vector, rejecting non-finite or decreasing values
    pub fn new(values: Vec<f64>) -> CadResult<Self> {
        validate_knots(&values)?;
        Ok(Self { values })
    }

    /// Open (clamped) uniform knot vector on `[0, 1]`
    ///
    /// The first and last knots are repeated `degree + 1` times so the curve
    /// interpolates its end control points.
    pub fn clamped_uniform(degree: usize, control_point_count: usize) -> CadResult<Self> {
        if control_point_count < degree + 1 {
            return Err(CadError::InvalidArgument(format!(
                "degree {} needs at least {} control points, got {}",
                degree,
                degree + 1,
                control_point_count
            )));
        }

        let interior = control_point_count - degree - 1;
        let mut values = Vec::with_capacity(control_point_count + degree + 1);
        values.extend(std::iter::repeat_n(0.0, degree + 1));
        for i in 1..=interior {
            values.push(i as f64 / (interior + 1) as f64);
        }
        values.extend(std::iter::repeat_n(1.0, degree + 1));
        Ok(Self { values })
    }

    /// Number of knots
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no knots
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw knot values
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Valid parameter domain `[knots[p], knots[n + 1]]` for the given degree
    pub fn domain(&self, degree: usize) -> Option<(f64, f64)> {
        let last = self.values.len().checked_sub(degree + 1)?;
        if last <= degree {
            return None;
        }
        Some((self.values[degree], self.values[last]))
    }

    /// How many times `u` appears in the vector (within [`KNOT_EPSILON`])
    pub fn multiplicity(&self, u: f64) -> usize {
        self.values
            .iter()
            .filter(|k| (*k - u).abs() <= KNOT_EPSILON)
            .count()
    }

    /// Distinct knot values in ascending order
    pub fn distinct(&self) -> Vec<f64> {
        let mut out: Vec<f64> = Vec::new();
        for &k in &self.values {
            if out.last().is_none_or(|last| (k - last).abs() > KNOT_EPSILON) {
                out.push(k);
            }
        }
        out
    }
}

impl AsRef<[f64]> for KnotVector {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}
