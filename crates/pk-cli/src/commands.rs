//! Subcommand arguments and handlers

use std::fmt;

use clap::Args;
use glam::DVec3;
use pk_cad::nurbs::{ControlPoint, KnotVector, NurbsCurve, basis_derivative, find_span};
use pk_cad::{CadError, Entity, Validation, Vertex};
use pk_core::{Session, SessionError};
use serde::Serialize;

/// Results print either as text or as pretty JSON
pub trait Render: Serialize + fmt::Display {
    fn render(&self, json: bool) -> String {
        if json {
            serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_string())
        } else {
            self.to_string()
        }
    }
}

// ============== Argument Parsing ==============

/// Parse `x,y` or `x,y,z`
pub fn parse_point(text: &str) -> Result<DVec3, String> {
    let coords = text
        .split(',')
        .map(|c| c.trim().parse::<f64>().map_err(|e| format!("bad coordinate '{}': {}", c, e)))
        .collect::<Result<Vec<_>, _>>()?;
    match coords.as_slice() {
        [x, y] => Ok(DVec3::new(*x, *y, 0.0)),
        [x, y, z] => Ok(DVec3::new(*x, *y, *z)),
        _ => Err(format!("expected x,y or x,y,z, got '{}'", text)),
    }
}

/// A `;`-separated list of points
#[derive(Debug, Clone, PartialEq)]
pub struct PointList(pub Vec<DVec3>);

/// Parse `x,y[,z];x,y[,z];...`
pub fn parse_points(text: &str) -> Result<PointList, String> {
    text.split(';')
        .filter(|p| !p.trim().is_empty())
        .map(parse_point)
        .collect::<Result<Vec<_>, _>>()
        .map(PointList)
}

#[derive(Args, Debug)]
pub struct BasisArgs {
    /// Basis degree
    #[arg(short, long)]
    pub degree: usize,
    /// Knot vector, comma separated
    #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub knots: Vec<f64>,
    /// Parameter value
    #[arg(short, long, allow_hyphen_values = true)]
    pub u: f64,
    /// Derivative order (0 = value)
    #[arg(short, long, default_value_t = 0)]
    pub order: usize,
}

#[derive(Args, Debug)]
pub struct CurveArgs {
    /// Curve degree
    #[arg(short, long)]
    pub degree: usize,
    /// Knot vector; a clamped uniform vector is used when omitted
    #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
    pub knots: Option<Vec<f64>>,
    /// Control points as `x,y[,z];...`
    #[arg(short, long, value_parser = parse_points, allow_hyphen_values = true)]
    pub points: PointList,
    /// Control point weights, comma separated
    #[arg(short, long, value_delimiter = ',')]
    pub weights: Option<Vec<f64>>,
    /// Parameter value
    #[arg(short, long, allow_hyphen_values = true)]
    pub u: f64,
}

#[derive(Args, Debug)]
pub struct FaceArgs {
    /// Vertex loop as `x,y,z;...`
    #[arg(short, long, value_parser = parse_points, allow_hyphen_values = true)]
    pub points: PointList,
}

#[derive(Args, Debug)]
pub struct LengthArgs {
    /// Segment start as `x,y[,z]`
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub from: DVec3,
    /// Segment end as `x,y[,z]`
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub to: DVec3,
    /// Target length
    #[arg(short, long)]
    pub target: f64,
    /// Allowed deviation; the configured default when omitted
    #[arg(short = 'e', long)]
    pub tolerance: Option<f64>,
}

// ============== Outputs ==============

#[derive(Debug, Serialize)]
pub struct BasisOutput {
    pub u: f64,
    pub order: usize,
    pub span: usize,
    pub values: Vec<f64>,
    pub sum: f64,
}

impl fmt::Display for BasisOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "u = {} (span {}, order {})", self.u, self.span, self.order)?;
        for (i, value) in self.values.iter().enumerate() {
            writeln!(f, "  N[{}] = {:.12}", i, value)?;
        }
        write!(f, "  sum  = {:.12}", self.sum)
    }
}

impl Render for BasisOutput {}

#[derive(Debug, Serialize)]
pub struct CurveOutput {
    pub u: f64,
    pub point: [f64; 3],
    pub tangent: Option<[f64; 3]>,
    pub rational: bool,
}

impl fmt::Display for CurveOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y, z] = self.point;
        write!(f, "C({}) = ({:.9}, {:.9}, {:.9})", self.u, x, y, z)?;
        if let Some([dx, dy, dz]) = self.tangent {
            write!(f, "\nC'({}) = ({:.9}, {:.9}, {:.9})", self.u, dx, dy, dz)?;
        }
        Ok(())
    }
}

impl Render for CurveOutput {}

#[derive(Debug, Serialize)]
pub struct FaceOutput {
    pub vertex_count: usize,
    pub normal: [f64; 3],
    pub area: f64,
    pub centroid: [f64; 3],
}

impl fmt::Display for FaceOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [nx, ny, nz] = self.normal;
        let [cx, cy, cz] = self.centroid;
        writeln!(f, "vertices: {}", self.vertex_count)?;
        writeln!(f, "normal:   ({:.9}, {:.9}, {:.9})", nx, ny, nz)?;
        writeln!(f, "area:     {:.9}", self.area)?;
        write!(f, "centroid: ({:.9}, {:.9}, {:.9})", cx, cy, cz)
    }
}

impl Render for FaceOutput {}

#[derive(Debug, Serialize)]
pub struct LengthOutput {
    pub actual: f64,
    pub target: f64,
    pub tolerance: f64,
    pub satisfied: bool,
    pub message: Option<String>,
}

impl fmt::Display for LengthOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "length {:.9} vs target {} ± {}: {}",
            self.actual,
            self.target,
            self.tolerance,
            if self.satisfied { "satisfied" } else { "violated" }
        )?;
        if let Some(message) = &self.message {
            write!(f, "\n  {}", message)?;
        }
        Ok(())
    }
}

impl Render for LengthOutput {}

// ============== Handlers ==============

pub fn basis(args: &BasisArgs) -> Result<BasisOutput, SessionError> {
    let span = find_span(args.degree, args.u, &args.knots)?;
    let count = args.knots.len() - args.degree - 1;
    let values = (0..count)
        .map(|i| basis_derivative(i, args.degree, args.u, &args.knots, args.order))
        .collect::<Result<Vec<_>, _>>()?;
    let sum = values.iter().sum();
    Ok(BasisOutput {
        u: args.u,
        order: args.order,
        span,
        values,
        sum,
    })
}

pub fn curve(args: &CurveArgs) -> Result<CurveOutput, SessionError> {
    let points = &args.points.0;
    let control_points: Vec<ControlPoint> = match &args.weights {
        None => points.iter().map(|p| ControlPoint::new(*p)).collect(),
        Some(weights) if weights.len() == points.len() => points
            .iter()
            .zip(weights)
            .map(|(p, w)| ControlPoint::weighted(*p, *w))
            .collect(),
        Some(weights) => {
            return Err(CadError::InvalidArgument(format!(
                "{} weights for {} control points",
                weights.len(),
                points.len()
            ))
            .into());
        }
    };
    let curve = match &args.knots {
        Some(knots) => NurbsCurve::new(args.degree, control_points, KnotVector::new(knots.clone())?)?,
        None => NurbsCurve::clamped(args.degree, control_points)?,
    };
    let sample = curve.evaluate(args.u, true)?;
    Ok(CurveOutput {
        u: args.u,
        point: sample.point.to_array(),
        tangent: sample.tangent.map(|t| t.to_array()),
        rational: curve.is_rational(),
    })
}

pub fn face(session: &Session, args: &FaceArgs) -> Result<FaceOutput, SessionError> {
    let vertices: Vec<Vertex> = args.points.0.iter().map(|p| Vertex::new(*p)).collect();
    let loop_refs: Vec<&Vertex> = vertices.iter().collect();
    let face = session.create_face(&loop_refs)?;
    Ok(FaceOutput {
        vertex_count: face.vertex_count(),
        normal: face.normal().to_array(),
        area: face.area(),
        centroid: face.centroid().to_array(),
    })
}

pub fn length(session: &Session, args: &LengthArgs) -> Result<LengthOutput, SessionError> {
    let tolerance = args
        .tolerance
        .unwrap_or(session.config().constraints.default_tolerance);
    let message = format!("segment length must be {} ± {}", args.target, tolerance);
    session.edit_constraints(|rules| {
        rules
            .add_length_constraint("length", "Length", args.target, tolerance, message)
            .map(|_| ())
    })?;

    let entity = Entity::line(args.from, args.to);
    let outcome = session.constraints().validate("length", &entity)?;
    Ok(LengthOutput {
        actual: args.from.distance(args.to),
        target: args.target,
        tolerance,
        satisfied: outcome.is_ok(),
        message: match outcome {
            Validation::Violated(v) => Some(v.message),
            _ => None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pk_cad::ErrorCode;
    use pk_core::KernelConfig;

    fn session() -> Session {
        Session::new(KernelConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_points() {
        let points = parse_points("0,0;1,0,2; 0.5,-1").unwrap();
        assert_eq!(
            points.0,
            vec![
                DVec3::ZERO,
                DVec3::new(1.0, 0.0, 2.0),
                DVec3::new(0.5, -1.0, 0.0)
            ]
        );
        assert!(parse_point("1").is_err());
        assert!(parse_point("1,a").is_err());
    }

    #[test]
    fn test_basis_command_partition() {
        let args = BasisArgs {
            degree: 2,
            knots: vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0],
            u: 0.3,
            order: 0,
        };
        let output = basis(&args).unwrap();
        assert_eq!(output.values.len(), 4);
        assert!((output.sum - 1.0).abs() < 1e-12);
        assert_eq!(output.span, 2);
    }

    #[test]
    fn test_basis_command_rejects_high_order() {
        let args = BasisArgs {
            degree: 1,
            knots: vec![0.0, 0.0, 1.0, 1.0],
            u: 0.5,
            order: 2,
        };
        assert_eq!(basis(&args).unwrap_err().code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_curve_command_weights_mismatch() {
        let args = CurveArgs {
            degree: 1,
            knots: None,
            points: PointList(vec![DVec3::ZERO, DVec3::X]),
            weights: Some(vec![1.0]),
            u: 0.5,
        };
        assert!(curve(&args).is_err());
    }

    #[test]
    fn test_curve_command_line() {
        let args = CurveArgs {
            degree: 1,
            knots: None,
            points: PointList(vec![DVec3::ZERO, DVec3::new(2.0, 0.0, 0.0)]),
            weights: None,
            u: 0.5,
        };
        let output = curve(&args).unwrap();
        assert!((output.point[0] - 1.0).abs() < 1e-12);
        assert!(!output.rational);
    }

    #[test]
    fn test_face_command() {
        let args = FaceArgs {
            points: PointList(vec![DVec3::ZERO, DVec3::X, DVec3::Y]),
        };
        let output = face(&session(), &args).unwrap();
        assert_eq!(output.vertex_count, 3);
        assert!((output.area - 0.5).abs() < 1e-12);
        assert!((output.normal[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_face_command_two_points() {
        let args = FaceArgs {
            points: PointList(vec![DVec3::ZERO, DVec3::X]),
        };
        let err = face(&session(), &args).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_length_command() {
        let satisfied = length(
            &session(),
            &LengthArgs {
                from: DVec3::ZERO,
                to: DVec3::new(5.0, 0.0, 0.0),
                target: 5.0,
                tolerance: Some(0.01),
            },
        )
        .unwrap();
        assert!(satisfied.satisfied);

        let violated = length(
            &session(),
            &LengthArgs {
                from: DVec3::ZERO,
                to: DVec3::new(5.2, 0.0, 0.0),
                target: 5.0,
                tolerance: Some(0.01),
            },
        )
        .unwrap();
        assert!(!violated.satisfied);
        assert!(violated.message.is_some());
    }
}
