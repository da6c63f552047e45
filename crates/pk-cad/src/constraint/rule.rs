//! Constraint rules
//!
//! A rule pairs a check with the message reported when the check fails. The
//! built-in checks are closed variants of [`RuleKind`]; anything else goes
//! through [`RuleKind::Predicate`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CadError, CadResult};

use super::entity::Entity;

/// User-supplied validation logic
pub type Predicate = Arc<dyn Fn(&Entity<'_>) -> bool + Send + Sync>;

fn check_tolerance(tolerance: f64) -> CadResult<()> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(CadError::InvalidArgument(format!(
            "tolerance must be non-negative, got {}",
            tolerance
        )));
    }
    Ok(())
}

/// Target length with an allowed deviation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LengthData")]
pub struct LengthConstraint {
    target: f64,
    tolerance: f64,
}

#[derive(Deserialize)]
struct LengthData {
    target: f64,
    tolerance: f64,
}

impl TryFrom<LengthData> for LengthConstraint {
    type Error = CadError;

    fn try_from(data: LengthData) -> CadResult<Self> {
        Self::new(data.target, data.tolerance)
    }
}

impl LengthConstraint {
    /// Create a length constraint; `target > 0` and `tolerance >= 0`
    pub fn new(target: f64, tolerance: f64) -> CadResult<Self> {
        if !target.is_finite() || target <= 0.0 {
            return Err(CadError::InvalidArgument(format!(
                "target length must be positive, got {}",
                target
            )));
        }
        check_tolerance(tolerance)?;
        Ok(Self { target, tolerance })
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Actual length of an entity
    ///
    /// Lines measure the distance between their end points. Arc length of
    /// curves is not implemented and reported as [`CadError::Unsupported`]
    /// rather than approximated.
    pub fn measure(&self, entity: &Entity<'_>) -> CadResult<f64> {
        match entity {
            Entity::Line { start, end } => Ok(start.distance(*end)),
            Entity::Curve(_) => Err(CadError::Unsupported(
                "arc length of curve entities is not implemented".into(),
            )),
            other => Err(CadError::InvalidArgument(format!(
                "length constraint cannot measure a {}",
                other.kind_name()
            ))),
        }
    }

    /// `|actual - target| <= tolerance`
    pub fn is_satisfied_by(&self, actual: f64) -> bool {
        (actual - self.target).abs() <= self.tolerance
    }
}

/// The check a rule performs
#[derive(Clone)]
pub enum RuleKind {
    /// Line length equals a target within a tolerance
    Length(LengthConstraint),
    /// Line end points share the same y (within tolerance)
    Horizontal { tolerance: f64 },
    /// Line end points share the same x (within tolerance)
    Vertical { tolerance: f64 },
    /// Arbitrary predicate
    Predicate(Predicate),
}

impl fmt::Debug for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Length(c) => f.debug_tuple("Length").field(c).finish(),
            RuleKind::Horizontal { tolerance } => f
                .debug_struct("Horizontal")
                .field("tolerance", tolerance)
                .finish(),
            RuleKind::Vertical { tolerance } => f
                .debug_struct("Vertical")
                .field("tolerance", tolerance)
                .finish(),
            RuleKind::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl RuleKind {
    /// Get the type name of this rule kind
    pub fn type_name(&self) -> &'static str {
        match self {
            RuleKind::Length(_) => "Length",
            RuleKind::Horizontal { .. } => "Horizontal",
            RuleKind::Vertical { .. } => "Vertical",
            RuleKind::Predicate(_) => "Custom",
        }
    }

    /// Whether this is a dimensional rule (has a value)
    pub fn is_dimensional(&self) -> bool {
        matches!(self, RuleKind::Length(_))
    }

    /// Get the dimensional value if this is a dimensional rule
    pub fn value(&self) -> Option<f64> {
        match self {
            RuleKind::Length(c) => Some(c.target()),
            _ => None,
        }
    }

    /// Run the check; returns whether it holds and the measured quantity
    fn check(&self, entity: &Entity<'_>) -> CadResult<(bool, Option<f64>)> {
        match self {
            RuleKind::Length(c) => {
                let actual = c.measure(entity)?;
                Ok((c.is_satisfied_by(actual), Some(actual)))
            }
            RuleKind::Horizontal { tolerance } => {
                let (start, end) = line_endpoints(entity, "horizontal")?;
                let dy = (end.y - start.y).abs();
                Ok((dy <= *tolerance, Some(dy)))
            }
            RuleKind::Vertical { tolerance } => {
                let (start, end) = line_endpoints(entity, "vertical")?;
                let dx = (end.x - start.x).abs();
                Ok((dx <= *tolerance, Some(dx)))
            }
            RuleKind::Predicate(predicate) => Ok((predicate(entity), None)),
        }
    }
}

fn line_endpoints(entity: &Entity<'_>, rule: &str) -> CadResult<(glam::DVec3, glam::DVec3)> {
    match entity {
        Entity::Line { start, end } => Ok((*start, *end)),
        other => Err(CadError::InvalidArgument(format!(
            "{} constraint applies to lines, got a {}",
            rule,
            other.kind_name()
        ))),
    }
}

/// A failed rule, reported to the user rather than raised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub rule_name: String,
    pub message: String,
    /// Measured quantity for dimensional and orientation rules
    pub measured: Option<f64>,
}

/// Outcome of validating one rule against one entity
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Satisfied,
    Violated(Violation),
    /// The rule is switched off and was not evaluated
    Disabled,
}

impl Validation {
    /// True unless the rule was violated
    pub fn is_ok(&self) -> bool {
        !matches!(self, Validation::Violated(_))
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Validation::Violated(v) => Some(v),
            _ => None,
        }
    }
}

/// A named validation rule
///
/// Everything except the enabled flag is fixed at creation.
#[derive(Debug, Clone)]
pub struct ConstraintRule {
    id: String,
    name: String,
    kind: RuleKind,
    message: String,
    enabled: bool,
}

impl ConstraintRule {
    /// Create an enabled rule
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: RuleKind,
        message: impl Into<String>,
    ) -> CadResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CadError::InvalidArgument("rule id must not be empty".into()));
        }
        Ok(Self {
            id,
            name: name.into(),
            kind,
            message: message.into(),
            enabled: true,
        })
    }

    // ============== Factory Methods ==============

    /// Create a rule from a predicate
    pub fn predicate<F>(
        id: impl Into<String>,
        name: impl Into<String>,
        predicate: F,
        message: impl Into<String>,
    ) -> CadResult<Self>
    where
        F: Fn(&Entity<'_>) -> bool + Send + Sync + 'static,
    {
        Self::new(id, name, RuleKind::Predicate(Arc::new(predicate)), message)
    }

    /// Create a length rule
    pub fn length(
        id: impl Into<String>,
        name: impl Into<String>,
        target: f64,
        tolerance: f64,
        message: impl Into<String>,
    ) -> CadResult<Self> {
        let constraint = LengthConstraint::new(target, tolerance)?;
        Self::new(id, name, RuleKind::Length(constraint), message)
    }

    /// Create a horizontal rule
    pub fn horizontal(
        id: impl Into<String>,
        name: impl Into<String>,
        tolerance: f64,
        message: impl Into<String>,
    ) -> CadResult<Self> {
        check_tolerance(tolerance)?;
        Self::new(id, name, RuleKind::Horizontal { tolerance }, message)
    }

    /// Create a vertical rule
    pub fn vertical(
        id: impl Into<String>,
        name: impl Into<String>,
        tolerance: f64,
        message: impl Into<String>,
    ) -> CadResult<Self> {
        check_tolerance(tolerance)?;
        Self::new(id, name, RuleKind::Vertical { tolerance }, message)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Evaluate the rule against an entity
    ///
    /// A broken rule is an ordinary [`Validation::Violated`]; `Err` is reserved
    /// for entities the rule cannot evaluate at all.
    pub fn validate(&self, entity: &Entity<'_>) -> CadResult<Validation> {
        if !self.enabled {
            return Ok(Validation::Disabled);
        }
        let (ok, measured) = self.kind.check(entity)?;
        if ok {
            Ok(Validation::Satisfied)
        } else {
            Ok(Validation::Violated(Violation {
                rule_id: self.id.clone(),
                rule_name: self.name.clone(),
                message: self.message.clone(),
                measured,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nurbs::{ControlPoint, NurbsCurve};
    use glam::DVec3;

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Entity<'static> {
        Entity::line(DVec3::new(x0, y0, 0.0), DVec3::new(x1, y1, 0.0))
    }

    #[test]
    fn test_length_satisfied_and_violated() {
        let rule = ConstraintRule::length("len", "Length 5", 5.0, 0.01, "must be 5").unwrap();
        assert_eq!(
            rule.validate(&line(0.0, 0.0, 5.0, 0.0)).unwrap(),
            Validation::Satisfied
        );

        let outcome = rule.validate(&line(0.0, 0.0, 5.2, 0.0)).unwrap();
        let violation = outcome.violation().unwrap();
        assert_eq!(violation.rule_id, "len");
        assert_eq!(violation.message, "must be 5");
        assert!((violation.measured.unwrap() - 5.2).abs() < 1e-12);
    }

    #[test]
    fn test_length_constructor_validation() {
        assert!(LengthConstraint::new(0.0, 0.1).is_err());
        assert!(LengthConstraint::new(-1.0, 0.1).is_err());
        assert!(LengthConstraint::new(1.0, -0.1).is_err());
        assert!(LengthConstraint::new(1.0, 0.0).is_ok());
    }

    #[test]
    fn test_length_on_curve_is_unsupported() {
        let curve = NurbsCurve::clamped(
            1,
            vec![ControlPoint::xy(0.0, 0.0), ControlPoint::xy(5.0, 0.0)],
        )
        .unwrap();
        let rule = ConstraintRule::length("len", "Length", 5.0, 0.01, "bad").unwrap();
        let err = rule.validate(&Entity::Curve(&curve)).unwrap_err();
        assert!(matches!(err, CadError::Unsupported(_)));
    }

    #[test]
    fn test_horizontal_and_vertical() {
        let h = ConstraintRule::horizontal("h", "Horizontal", 1e-6, "not horizontal").unwrap();
        let v = ConstraintRule::vertical("v", "Vertical", 1e-6, "not vertical").unwrap();
        assert!(h.validate(&line(0.0, 1.0, 4.0, 1.0)).unwrap().is_ok());
        assert!(!h.validate(&line(0.0, 1.0, 4.0, 2.0)).unwrap().is_ok());
        assert!(v.validate(&line(2.0, 0.0, 2.0, 3.0)).unwrap().is_ok());
        assert!(v.validate(&Entity::Point(DVec3::ZERO)).is_err());
    }

    #[test]
    fn test_predicate_rule() {
        let rule = ConstraintRule::predicate(
            "above",
            "Above axis",
            |e| matches!(e, Entity::Point(p) if p.y > 0.0),
            "point must be above the x axis",
        )
        .unwrap();
        assert_eq!(rule.kind().type_name(), "Custom");
        assert!(rule.validate(&Entity::Point(DVec3::Y)).unwrap().is_ok());
        assert!(!rule.validate(&Entity::Point(-DVec3::Y)).unwrap().is_ok());
    }

    #[test]
    fn test_disabled_rule_is_skipped() {
        let mut rule = ConstraintRule::length("len", "Length", 5.0, 0.01, "bad").unwrap();
        rule.set_enabled(false);
        assert_eq!(
            rule.validate(&line(0.0, 0.0, 9.0, 0.0)).unwrap(),
            Validation::Disabled
        );
    }

    #[test]
    fn test_dimensional() {
        let rule = ConstraintRule::length("len", "Length", 10.0, 0.0, "bad").unwrap();
        assert!(rule.kind().is_dimensional());
        assert_eq!(rule.kind().value(), Some(10.0));

        let h = ConstraintRule::horizontal("h", "Horizontal", 0.0, "bad").unwrap();
        assert!(!h.kind().is_dimensional());
        assert_eq!(h.kind().value(), None);
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(ConstraintRule::horizontal("  ", "Horizontal", 0.0, "bad").is_err());
    }

    #[test]
    fn test_orientation_tolerance_validated() {
        for tolerance in [-1e-6, f64::NAN, f64::INFINITY] {
            let err = ConstraintRule::horizontal("h", "Horizontal", tolerance, "bad").unwrap_err();
            assert_eq!(err.code(), crate::error::ErrorCode::InvalidArgument);
            assert!(ConstraintRule::vertical("v", "Vertical", tolerance, "bad").is_err());
        }
    }

    #[test]
    fn test_length_deserialize_validated() {
        let length: LengthConstraint = ron::from_str("(target: 5.0, tolerance: 0.1)").unwrap();
        assert_eq!(length, LengthConstraint::new(5.0, 0.1).unwrap());

        assert!(ron::from_str::<LengthConstraint>("(target: -5.0, tolerance: 0.1)").is_err());
        assert!(ron::from_str::<LengthConstraint>("(target: 5.0, tolerance: -0.1)").is_err());
    }
}
