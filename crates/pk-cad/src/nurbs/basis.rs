//! B-spline basis functions
//!
//! Cox-de Boor recursion for single basis values and their derivatives, plus
//! the span search and the triangular evaluation of all non-zero functions at
//! a parameter. Everything here is a pure function of its arguments.
//!
//! Spans of zero width (repeated knots) contribute nothing: any term whose
//! denominator is narrower than [`KNOT_EPSILON`] is dropped.

use crate::error::{CadError, CadResult};

use super::knot::{KNOT_EPSILON, validate_knots};

/// Index `n` of the last control point and the domain `[knots[p], knots[n + 1]]`
pub(crate) fn domain_of(degree: usize, knots: &[f64]) -> CadResult<(usize, f64, f64)> {
    let count = knots
        .len()
        .checked_sub(degree + 1)
        .filter(|count| *count > degree)
        .ok_or_else(|| {
            CadError::InvalidKnots(format!(
                "{} knots cannot support degree {} (need at least {})",
                knots.len(),
                degree,
                2 * degree + 2
            ))
        })?;
    let n = count - 1;
    let (start, end) = (knots[degree], knots[n + 1]);
    if end - start <= KNOT_EPSILON {
        return Err(CadError::InvalidKnots(format!(
            "empty parameter domain [{}, {}]",
            start, end
        )));
    }
    Ok((n, start, end))
}

/// Reject parameters outside the domain; snap values within rounding noise onto it
pub(crate) fn clamp_parameter(u: f64, start: f64, end: f64) -> CadResult<f64> {
    let slack = 1e-10 * (end - start).max(1.0);
    if !u.is_finite() || u < start - slack || u > end + slack {
        return Err(CadError::InvalidArgument(format!(
            "parameter {} outside domain [{}, {}]",
            u, start, end
        )));
    }
    Ok(u.clamp(start, end))
}

/// Span index for a parameter already known to be inside the domain
///
/// Returns `s` with `knots[s] <= u < knots[s + 1]`. At the right end of the
/// domain the last non-empty span is returned so the closed domain is covered.
pub(crate) fn span_index(n: usize, degree: usize, u: f64, knots: &[f64]) -> usize {
    if u >= knots[n + 1] {
        let mut s = n;
        while s > degree && knots[s + 1] - knots[s] <= KNOT_EPSILON {
            s -= 1;
        }
        return s;
    }
    let count = knots[..=n + 1].partition_point(|&k| k <= u);
    count.saturating_sub(1).clamp(degree, n)
}

/// Find the knot span containing `u`
pub fn find_span(degree: usize, u: f64, knots: &[f64]) -> CadResult<usize> {
    validate_knots(knots)?;
    let (n, start, end) = domain_of(degree, knots)?;
    let u = clamp_parameter(u, start, end)?;
    Ok(span_index(n, degree, u, knots))
}

fn check_basis_args(
    i: usize,
    degree: usize,
    u: f64,
    knots: &[f64],
) -> CadResult<(f64, usize)> {
    validate_knots(knots)?;
    let (n, start, end) = domain_of(degree, knots)?;
    if i > n {
        return Err(CadError::IndexOutOfRange {
            index: i,
            len: n + 1,
        });
    }
    let u = clamp_parameter(u, start, end)?;
    Ok((u, span_index(n, degree, u, knots)))
}

/// Value of the basis function `N(i, degree)` at `u`
///
/// `i` must lie in `[0, knots.len() - degree - 2]` and `u` in the domain
/// `[knots[degree], knots[n + 1]]`.
pub fn basis_function(i: usize, degree: usize, u: f64, knots: &[f64]) -> CadResult<f64> {
    let (u, span) = check_basis_args(i, degree, u, knots)?;
    Ok(cox_de_boor(i, degree, u, knots, span))
}

/// `order`-th derivative of `N(i, degree)` at `u`
///
/// `order == 0` is the basis value itself. `order > degree` is rejected.
pub fn basis_derivative(
    i: usize,
    degree: usize,
    u: f64,
    knots: &[f64],
    order: usize,
) -> CadResult<f64> {
    if order > degree {
        return Err(CadError::InvalidArgument(format!(
            "derivative order {} exceeds degree {}",
            order, degree
        )));
    }
    let (u, span) = check_basis_args(i, degree, u, knots)?;
    Ok(derivative_unchecked(i, degree, u, knots, span, order))
}

/// All `degree + 1` basis values that can be non-zero on `span`
///
/// Entry `j` of the result is `N(span - degree + j, degree)(u)`.
pub fn basis_functions(span: usize, degree: usize, u: f64, knots: &[f64]) -> CadResult<Vec<f64>> {
    validate_knots(knots)?;
    let (n, start, end) = domain_of(degree, knots)?;
    if span < degree || span > n {
        return Err(CadError::IndexOutOfRange {
            index: span,
            len: n + 1,
        });
    }
    let u = clamp_parameter(u, start, end)?;
    Ok(nonzero_basis(span, degree, u, knots))
}

pub(crate) fn cox_de_boor(i: usize, p: usize, u: f64, knots: &[f64], span: usize) -> f64 {
    if p == 0 {
        return if i == span { 1.0 } else { 0.0 };
    }

    let mut value = 0.0;

    let left = knots[i + p] - knots[i];
    if left > KNOT_EPSILON {
        value += (u - knots[i]) / left * cox_de_boor(i, p - 1, u, knots, span);
    }

    let right = knots[i + p + 1] - knots[i + 1];
    if right > KNOT_EPSILON {
        value += (knots[i + p + 1] - u) / right * cox_de_boor(i + 1, p - 1, u, knots, span);
    }

    value
}

/// `N^(k)(i, p) = p * (N^(k-1)(i, p-1) / (u[i+p] - u[i]) - N^(k-1)(i+1, p-1) / (u[i+p+1] - u[i+1]))`
pub(crate) fn derivative_unchecked(
    i: usize,
    p: usize,
    u: f64,
    knots: &[f64],
    span: usize,
    k: usize,
) -> f64 {
    if k == 0 {
        return cox_de_boor(i, p, u, knots, span);
    }

    let mut value = 0.0;

    let left = knots[i + p] - knots[i];
    if left > KNOT_EPSILON {
        value += derivative_unchecked(i, p - 1, u, knots, span, k - 1) / left;
    }

    let right = knots[i + p + 1] - knots[i + 1];
    if right > KNOT_EPSILON {
        value -= derivative_unchecked(i + 1, p - 1, u, knots, span, k - 1) / right;
    }

    p as f64 * value
}

pub(crate) fn nonzero_basis(span: usize, p: usize, u: f64, knots: &[f64]) -> Vec<f64> {
    let mut values = vec![0.0; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];
    values[0] = 1.0;

    for j in 1..=p {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom.abs() > KNOT_EPSILON {
                values[r] / denom
            } else {
                0.0
            };
            values[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        values[j] = saved;
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const CUBIC: [f64; 10] = [0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0, 3.0];

    #[test]
    fn test_degree_zero_is_indicator() {
        let knots = [0.0, 1.0, 2.0];
        assert_eq!(basis_function(0, 0, 0.5, &knots).unwrap(), 1.0);
        assert_eq!(basis_function(1, 0, 0.5, &knots).unwrap(), 0.0);
        // Right end belongs to the last span
        assert_eq!(basis_function(1, 0, 2.0, &knots).unwrap(), 1.0);
    }

    #[test]
    fn test_linear_hat() {
        let knots = [0.0, 0.0, 1.0, 2.0, 2.0];
        assert_abs_diff_eq!(basis_function(1, 1, 0.5, &knots).unwrap(), 0.5);
        assert_abs_diff_eq!(basis_function(1, 1, 1.0, &knots).unwrap(), 1.0);
        assert_abs_diff_eq!(basis_function(1, 1, 1.5, &knots).unwrap(), 0.5);
    }

    #[test]
    fn test_partition_of_unity() {
        let n = CUBIC.len() - 3 - 1;
        for step in 0..=30 {
            let u = step as f64 * 0.1;
            let sum: f64 = (0..n)
                .map(|i| basis_function(i, 3, u, &CUBIC).unwrap())
                .sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_clamped_endpoints() {
        assert_abs_diff_eq!(basis_function(0, 3, 0.0, &CUBIC).unwrap(), 1.0);
        assert_abs_diff_eq!(basis_function(5, 3, 3.0, &CUBIC).unwrap(), 1.0);
        assert_abs_diff_eq!(basis_function(4, 3, 3.0, &CUBIC).unwrap(), 0.0);
    }

    #[test]
    fn test_find_span() {
        assert_eq!(find_span(3, 0.0, &CUBIC).unwrap(), 3);
        assert_eq!(find_span(3, 0.5, &CUBIC).unwrap(), 3);
        assert_eq!(find_span(3, 1.0, &CUBIC).unwrap(), 4);
        assert_eq!(find_span(3, 2.5, &CUBIC).unwrap(), 5);
        assert_eq!(find_span(3, 3.0, &CUBIC).unwrap(), 5);
    }

    #[test]
    fn test_nonzero_basis_matches_recursion() {
        for &u in &[0.0, 0.3, 1.0, 1.7, 2.2, 3.0] {
            let span = find_span(3, u, &CUBIC).unwrap();
            let values = basis_functions(span, 3, u, &CUBIC).unwrap();
            for (j, value) in values.iter().enumerate() {
                let i = span - 3 + j;
                assert_abs_diff_eq!(
                    *value,
                    basis_function(i, 3, u, &CUBIC).unwrap(),
                    epsilon = 1e-12
                );
            }
        }
    }

    #[test]
    fn test_derivative_order_zero_is_value() {
        for i in 0..6 {
            let value = basis_function(i, 3, 1.3, &CUBIC).unwrap();
            let deriv = basis_derivative(i, 3, 1.3, &CUBIC, 0).unwrap();
            assert_eq!(value, deriv);
        }
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let h = 1e-6;
        for i in 0..6 {
            let u = 1.4;
            let analytic = basis_derivative(i, 3, u, &CUBIC, 1).unwrap();
            let forward = basis_function(i, 3, u + h, &CUBIC).unwrap();
            let backward = basis_function(i, 3, u - h, &CUBIC).unwrap();
            assert_abs_diff_eq!(analytic, (forward - backward) / (2.0 * h), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_derivatives_sum_to_zero() {
        for order in 1..=3 {
            let sum: f64 = (0..6)
                .map(|i| basis_derivative(i, 3, 2.6, &CUBIC, order).unwrap())
                .sum();
            assert_abs_diff_eq!(sum, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_repeated_interior_knot() {
        // Double knot at 1.0: the zero-width span must not divide by zero
        let knots = [0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 2.0];
        for &u in &[0.0, 0.5, 1.0, 1.5, 2.0] {
            let sum: f64 = (0..5).map(|i| basis_function(i, 2, u, &knots).unwrap()).sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(
            basis_function(6, 3, 1.0, &CUBIC),
            Err(CadError::IndexOutOfRange { index: 6, len: 6 })
        ));
        assert!(matches!(
            basis_derivative(0, 3, 1.0, &CUBIC, 4),
            Err(CadError::InvalidArgument(_))
        ));
        assert!(matches!(
            basis_function(0, 1, 0.5, &[0.0, 1.0, 0.5, 2.0]),
            Err(CadError::InvalidKnots(_))
        ));
        assert!(matches!(
            basis_function(0, 3, 3.5, &CUBIC),
            Err(CadError::InvalidArgument(_))
        ));
        assert!(matches!(
            basis_function(0, 2, 0.5, &[0.0, 0.0, 1.0, 1.0]),
            Err(CadError::InvalidKnots(_))
        ));
    }
}
