//! NURBS curves

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{CadError, CadResult};

use super::basis::{clamp_parameter, derivative_unchecked, domain_of, nonzero_basis, span_index};
use super::knot::KnotVector;

/// A control point with an optional rational weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    /// Position (2D sketches use z = 0)
    pub position: DVec3,
    /// Rational weight (1.0 for plain B-splines)
    pub weight: f64,
}

impl ControlPoint {
    /// Unweighted control point
    pub fn new(position: DVec3) -> Self {
        Self {
            position,
            weight: 1.0,
        }
    }

    /// Weighted control point
    pub fn weighted(position: DVec3, weight: f64) -> Self {
        Self { position, weight }
    }

    /// Unweighted control point in the XY plane
    pub fn xy(x: f64, y: f64) -> Self {
        Self::new(DVec3::new(x, y, 0.0))
    }
}

impl From<DVec3> for ControlPoint {
    fn from(position: DVec3) -> Self {
        Self::new(position)
    }
}

pub(crate) fn check_weight(index: usize, weight: f64) -> CadResult<()> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err(CadError::InvalidArgument(format!(
            "weight of control point {} must be positive and finite, got {}",
            index, weight
        )));
    }
    Ok(())
}

/// Point and (optionally) first derivative at a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSample {
    pub parameter: f64,
    pub point: DVec3,
    /// First derivative `dC/du`, not normalized
    pub tangent: Option<DVec3>,
}

/// Serialized form of [`NurbsCurve`], checked on the way in
#[derive(Deserialize)]
struct CurveData {
    degree: usize,
    knots: KnotVector,
    control_points: Vec<ControlPoint>,
}

/// A (possibly rational) B-spline curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CurveData")]
pub struct NurbsCurve {
    degree: usize,
    knots: KnotVector,
    control_points: Vec<ControlPoint>,
}

impl TryFrom<CurveData> for NurbsCurve {
    type Error = CadError;

    fn try_from(data: CurveData) -> CadResult<Self> {
        Self::new(data.degree, data.control_points, data.knots)
    }
}

impl NurbsCurve {
    /// Create a curve, checking `knots.len() == degree + control_points.len() + 1`
    pub fn new(
        degree: usize,
        control_points: Vec<ControlPoint>,
        knots: KnotVector,
    ) -> CadResult<Self> {
        if control_points.len() < degree + 1 {
            return Err(CadError::InvalidArgument(format!(
                "degree {} curve needs at least {} control points, got {}",
                degree,
                degree + 1,
                control_points.len()
            )));
        }
        let expected = degree + control_points.len() + 1;
        if knots.len() != expected {
            return Err(CadError::InvalidKnots(format!(
                "expected {} knots, got {}",
                expected,
                knots.len()
            )));
        }
        for (index, cp) in control_points.iter().enumerate() {
            check_weight(index, cp.weight)?;
        }
        domain_of(degree, knots.as_slice())?;

        Ok(Self {
            degree,
            knots,
            control_points,
        })
    }

    /// Curve with an open uniform knot vector on `[0, 1]`
    pub fn clamped(degree: usize, control_points: Vec<ControlPoint>) -> CadResult<Self> {
        let knots = KnotVector::clamped_uniform(degree, control_points.len())?;
        Self::new(degree, control_points, knots)
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &KnotVector {
        &self.knots
    }

    pub fn control_points(&self) -> &[ControlPoint] {
        &self.control_points
    }

    /// Whether any weight differs from 1
    pub fn is_rational(&self) -> bool {
        self.control_points.iter().any(|cp| cp.weight != 1.0)
    }

    /// Parameter domain `[knots[p], knots[n + 1]]`
    pub fn domain(&self) -> (f64, f64) {
        let knots = self.knots.as_slice();
        (knots[self.degree], knots[self.control_points.len()])
    }

    fn span_at(&self, u: f64) -> CadResult<(f64, usize)> {
        let (start, end) = self.domain();
        let u = clamp_parameter(u, start, end)?;
        let n = self.control_points.len() - 1;
        Ok((u, span_index(n, self.degree, u, self.knots.as_slice())))
    }

    /// Point on the curve
    pub fn point_at(&self, u: f64) -> CadResult<DVec3> {
        let (u, span) = self.span_at(u)?;
        let basis = nonzero_basis(span, self.degree, u, self.knots.as_slice());

        let mut numerator = DVec3::ZERO;
        let mut denominator = 0.0;
        for (j, n) in basis.iter().enumerate() {
            let cp = &self.control_points[span - self.degree + j];
            numerator += cp.position * (n * cp.weight);
            denominator += n * cp.weight;
        }
        Ok(numerator / denominator)
    }

    /// `order`-th derivative of the curve; `order == 0` is the point itself
    pub fn derivative_at(&self, u: f64, order: usize) -> CadResult<DVec3> {
        if order > self.degree {
            return Err(CadError::InvalidArgument(format!(
                "derivative order {} exceeds degree {}",
                order, self.degree
            )));
        }
        let (u, span) = self.span_at(u)?;
        let ders = self.derivatives(u, span, order);
        Ok(ders[order])
    }

    /// Curve derivatives `C^(0..=order)` at a clamped parameter
    ///
    /// Rational curves use `C^(k) = (A^(k) - sum_{i=1..k} binom(k, i) w^(i) C^(k-i)) / w`.
    fn derivatives(&self, u: f64, span: usize, order: usize) -> Vec<DVec3> {
        let knots = self.knots.as_slice();
        let mut weighted = vec![DVec3::ZERO; order + 1];
        let mut weights = vec![0.0; order + 1];

        for i in span - self.degree..=span {
            let cp = &self.control_points[i];
            for k in 0..=order {
                let n = derivative_unchecked(i, self.degree, u, knots, span, k);
                weighted[k] += cp.position * (n * cp.weight);
                weights[k] += n * cp.weight;
            }
        }

        let mut ders = vec![DVec3::ZERO; order + 1];
        for k in 0..=order {
            let mut v = weighted[k];
            for i in 1..=k {
                v -= ders[k - i] * (binomial(k, i) * weights[i]);
            }
            ders[k] = v / weights[0];
        }
        ders
    }

    /// Evaluate the point and, if requested, the first derivative
    pub fn evaluate(&self, u: f64, with_tangent: bool) -> CadResult<CurveSample> {
        let (u, span) = self.span_at(u)?;
        let order = if with_tangent { self.degree.min(1) } else { 0 };
        let ders = self.derivatives(u, span, order);
        let tangent = with_tangent.then(|| ders.get(1).copied().unwrap_or(DVec3::ZERO));
        Ok(CurveSample {
            parameter: u,
            point: ders[0],
            tangent,
        })
    }

    /// Unit tangent, `None` where the first derivative vanishes
    pub fn unit_tangent_at(&self, u: f64) -> CadResult<Option<DVec3>> {
        let sample = self.evaluate(u, true)?;
        Ok(sample.tangent.and_then(|t| t.try_normalize()))
    }

    /// Evenly spaced points over the domain (both ends included)
    pub fn sample(&self, count: usize) -> CadResult<Vec<DVec3>> {
        if count < 2 {
            return Err(CadError::InvalidArgument(format!(
                "sample count must be at least 2, got {}",
                count
            )));
        }
        let (start, end) = self.domain();
        (0..count)
            .map(|i| {
                let t = i as f64 / (count - 1) as f64;
                self.point_at(start + (end - start) * t)
            })
            .collect()
    }

    /// Move a control point in the XY plane
    ///
    /// Returns `false` and leaves the curve untouched when `index` is out of
    /// range. The z coordinate and weight are kept.
    pub fn move_control_point(&mut self, index: usize, x: f64, y: f64) -> bool {
        match self.control_points.get_mut(index) {
            Some(cp) => {
                cp.position.x = x;
                cp.position.y = y;
                true
            }
            None => {
                tracing::debug!(
                    index,
                    len = self.control_points.len(),
                    "move_control_point ignored: index out of range"
                );
                false
            }
        }
    }

    /// Change the rational weight of a control point
    pub fn set_weight(&mut self, index: usize, weight: f64) -> CadResult<()> {
        let len = self.control_points.len();
        check_weight(index, weight)?;
        let cp = self
            .control_points
            .get_mut(index)
            .ok_or(CadError::IndexOutOfRange { index, len })?;
        cp.weight = weight;
        Ok(())
    }

    /// Distance between the curve's end points
    pub fn chord_length(&self) -> CadResult<f64> {
        let (start, end) = self.domain();
        Ok(self.point_at(start)?.distance(self.point_at(end)?))
    }
}

pub(crate) fn binomial(n: usize, k: usize) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn quadratic_arc() -> NurbsCurve {
        // Quarter circle of radius 1 as a rational quadratic
        let w = std::f64::consts::FRAC_1_SQRT_2;
        NurbsCurve::new(
            2,
            vec![
                ControlPoint::xy(1.0, 0.0),
                ControlPoint::weighted(DVec3::new(1.0, 1.0, 0.0), w),
                ControlPoint::xy(0.0, 1.0),
            ],
            KnotVector::new(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap(),
        )
        .unwrap()
    }

    fn cubic() -> NurbsCurve {
        NurbsCurve::clamped(
            3,
            vec![
                ControlPoint::xy(0.0, 0.0),
                ControlPoint::xy(1.0, 2.0),
                ControlPoint::xy(3.0, 2.0),
                ControlPoint::xy(4.0, 0.0),
                ControlPoint::xy(5.0, -1.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_knot_count_invariant() {
        let result = NurbsCurve::new(
            2,
            vec![ControlPoint::xy(0.0, 0.0); 3],
            KnotVector::new(vec![0.0, 0.0, 1.0, 1.0]).unwrap(),
        );
        assert!(matches!(result, Err(CadError::InvalidKnots(_))));
    }

    #[test]
    fn test_too_few_control_points() {
        let result = NurbsCurve::new(
            3,
            vec![ControlPoint::xy(0.0, 0.0); 3],
            KnotVector::new(vec![0.0; 7]).unwrap(),
        );
        assert!(matches!(result, Err(CadError::InvalidArgument(_))));
    }

    #[test]
    fn test_bad_weight() {
        let result = NurbsCurve::clamped(
            1,
            vec![
                ControlPoint::xy(0.0, 0.0),
                ControlPoint::weighted(DVec3::X, 0.0),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_clamped_curve_interpolates_ends() {
        let curve = cubic();
        assert_abs_diff_eq!(curve.point_at(0.0).unwrap(), DVec3::ZERO, epsilon = 1e-12);
        assert_abs_diff_eq!(
            curve.point_at(1.0).unwrap(),
            DVec3::new(5.0, -1.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_rational_arc_lies_on_circle() {
        let arc = quadratic_arc();
        assert!(arc.is_rational());
        for step in 0..=10 {
            let p = arc.point_at(step as f64 / 10.0).unwrap();
            assert_relative_eq!(p.length(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rational_tangent_is_perpendicular_to_radius() {
        let arc = quadratic_arc();
        for &u in &[0.1, 0.5, 0.9] {
            let sample = arc.evaluate(u, true).unwrap();
            let tangent = sample.tangent.unwrap();
            assert_abs_diff_eq!(tangent.dot(sample.point), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_first_derivative_matches_finite_difference() {
        let curve = cubic();
        let h = 1e-6;
        let u = 0.37;
        let analytic = curve.derivative_at(u, 1).unwrap();
        let numeric =
            (curve.point_at(u + h).unwrap() - curve.point_at(u - h).unwrap()) / (2.0 * h);
        assert_abs_diff_eq!(analytic, numeric, epsilon = 1e-5);
    }

    #[test]
    fn test_rational_second_derivative_matches_finite_difference() {
        let arc = quadratic_arc();
        let h = 1e-5;
        let u = 0.4;
        let analytic = arc.derivative_at(u, 2).unwrap();
        let numeric = (arc.derivative_at(u + h, 1).unwrap()
            - arc.derivative_at(u - h, 1).unwrap())
            / (2.0 * h);
        assert_abs_diff_eq!(analytic, numeric, epsilon = 1e-4);
    }

    #[test]
    fn test_evaluate_without_tangent() {
        let sample = cubic().evaluate(0.5, false).unwrap();
        assert!(sample.tangent.is_none());
    }

    #[test]
    fn test_out_of_domain() {
        assert!(matches!(
            cubic().point_at(1.5),
            Err(CadError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_move_control_point() {
        let mut curve = cubic();
        assert!(curve.move_control_point(1, 7.0, 8.0));
        assert_eq!(curve.control_points()[1].position, DVec3::new(7.0, 8.0, 0.0));
    }

    #[test]
    fn test_move_control_point_out_of_range() {
        let mut curve = cubic();
        let before = curve.control_points().to_vec();
        assert!(!curve.move_control_point(5, 1.0, 1.0));
        assert_eq!(curve.control_points(), before.as_slice());
    }

    #[test]
    fn test_set_weight() {
        let mut curve = cubic();
        curve.set_weight(2, 2.0).unwrap();
        assert!(curve.is_rational());
        assert!(matches!(
            curve.set_weight(9, 1.0),
            Err(CadError::IndexOutOfRange { index: 9, len: 5 })
        ));
        assert!(curve.set_weight(0, -1.0).is_err());
        assert_eq!(curve.control_points()[0].weight, 1.0);
    }

    #[test]
    fn test_sample() {
        let points = cubic().sample(5).unwrap();
        assert_eq!(points.len(), 5);
        assert!(cubic().sample(1).is_err());
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(4, 2), 6.0);
        assert_eq!(binomial(3, 0), 1.0);
        assert_eq!(binomial(5, 5), 1.0);
    }

    #[test]
    fn test_deserialize_round_trip() {
        let curve = quadratic_arc();
        let text = ron::to_string(&curve).unwrap();
        let back: NurbsCurve = ron::from_str(&text).unwrap();
        assert_eq!(back, curve);
        assert!(back.point_at(0.5).is_ok());
    }

    #[test]
    fn test_deserialize_rejects_broken_curves() {
        let point = "(position: (0.0, 0.0, 0.0), weight: 1.0)";

        // Two knots cannot carry a degree 1 curve with two control points
        let short_knots = format!(
            "(degree: 1, knots: [0.0, 1.0], control_points: [{point}, {point}])"
        );
        assert!(ron::from_str::<NurbsCurve>(&short_knots).is_err());

        let no_points = "(degree: 0, knots: [0.0], control_points: [])";
        assert!(ron::from_str::<NurbsCurve>(no_points).is_err());

        let decreasing = format!(
            "(degree: 1, knots: [0.0, 0.0, 1.0, 0.5], control_points: [{point}, {point}])"
        );
        assert!(ron::from_str::<NurbsCurve>(&decreasing).is_err());

        let zero_weight = "(degree: 1, knots: [0.0, 0.0, 1.0, 1.0], control_points: \
            [(position: (0.0, 0.0, 0.0), weight: 0.0), (position: (1.0, 0.0, 0.0), weight: 1.0)])";
        assert!(ron::from_str::<NurbsCurve>(zero_weight).is_err());
    }
}
