// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Analytic curves.
//!
//! The same type serves as 3D curve and as parameter-space curve; for the
//! latter the `z` component is ignored.

use egads_engine::{CurveDef, CurveEval, EngineError, Matrix, Range, Result, Vec3};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::math::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Curve {
    /// `p(t) = origin + t * direction`, unit direction.
    Line { origin: Vec3, direction: Vec3 },
    Circle { placement: Placement, radius: f64 },
    Ellipse {
        placement: Placement,
        major: f64,
        minor: f64,
    },
    Trimmed {
        basis: Box<Curve>,
        t_min: f64,
        t_max: f64,
    },
}

impl Curve {
    /// Builds a curve from an engine-neutral definition.
    pub fn from_def(def: &CurveDef, basis: Option<&Curve>) -> Result<Self> {
        match def {
            CurveDef::Line { origin, direction } => {
                let d = unit(&v3(direction), "line direction")?;
                Ok(Curve::Line {
                    origin: *origin,
                    direction: arr(&d),
                })
            }
            CurveDef::Circle { frame, radius } => {
                if *radius <= 0.0 {
                    return Err(EngineError::Degenerate(format!("circle radius {radius}")));
                }
                Ok(Curve::Circle {
                    placement: Placement::from_frame(frame)?,
                    radius: *radius,
                })
            }
            CurveDef::Ellipse {
                frame,
                major,
                minor,
            } => {
                if *minor <= 0.0 || *major < *minor {
                    return Err(EngineError::Construction(format!(
                        "ellipse radii {major} / {minor}"
                    )));
                }
                Ok(Curve::Ellipse {
                    placement: Placement::from_frame(frame)?,
                    major: *major,
                    minor: *minor,
                })
            }
            CurveDef::Trimmed { t_min, t_max } => {
                let basis = basis.ok_or_else(|| {
                    EngineError::Construction("trimmed curve without basis".into())
                })?;
                if t_min >= t_max {
                    return Err(EngineError::Construction(format!(
                        "trim range {t_min} >= {t_max}"
                    )));
                }
                Ok(Curve::Trimmed {
                    basis: Box::new(basis.clone()),
                    t_min: *t_min,
                    t_max: *t_max,
                })
            }
            CurveDef::Parabola { .. } => Err(EngineError::Unsupported("parabola curves")),
            CurveDef::Hyperbola { .. } => Err(EngineError::Unsupported("hyperbola curves")),
            CurveDef::Bezier { .. } => Err(EngineError::Unsupported("bezier curves")),
            CurveDef::BSpline { .. } => Err(EngineError::Unsupported("b-spline curves")),
            CurveDef::Offset { .. } => Err(EngineError::Unsupported("offset curves")),
        }
    }

    /// Definition and basis of this curve.
    pub fn describe(&self) -> (CurveDef, Option<Curve>) {
        match self {
            Curve::Line { origin, direction } => (
                CurveDef::Line {
                    origin: *origin,
                    direction: *direction,
                },
                None,
            ),
            Curve::Circle { placement, radius } => (
                CurveDef::Circle {
                    frame: placement.to_frame(),
                    radius: *radius,
                },
                None,
            ),
            Curve::Ellipse {
                placement,
                major,
                minor,
            } => (
                CurveDef::Ellipse {
                    frame: placement.to_frame(),
                    major: *major,
                    minor: *minor,
                },
                None,
            ),
            Curve::Trimmed {
                basis,
                t_min,
                t_max,
            } => (
                CurveDef::Trimmed {
                    t_min: *t_min,
                    t_max: *t_max,
                },
                Some((**basis).clone()),
            ),
        }
    }

    pub fn is_periodic(&self) -> bool {
        matches!(self, Curve::Circle { .. } | Curve::Ellipse { .. })
    }

    pub fn range(&self) -> Range {
        match self {
            Curve::Line { .. } => Range::Curve {
                t: [-INFINITE, INFINITE],
                periodic: false,
            },
            Curve::Circle { .. } | Curve::Ellipse { .. } => Range::Curve {
                t: [0.0, TWO_PI],
                periodic: true,
            },
            Curve::Trimmed { t_min, t_max, .. } => Range::Curve {
                t: [*t_min, *t_max],
                periodic: false,
            },
        }
    }

    pub fn eval(&self, t: f64) -> CurveEval {
        match self {
            Curve::Line { origin, direction } => {
                let d = v3(direction);
                CurveEval {
                    point: arr(&(v3(origin) + d * t)),
                    d1: *direction,
                    d2: [0.0; 3],
                }
            }
            Curve::Circle { placement, radius } => {
                conic_eval(placement, *radius, *radius, t)
            }
            Curve::Ellipse {
                placement,
                major,
                minor,
            } => conic_eval(placement, *major, *minor, t),
            Curve::Trimmed { basis, .. } => basis.eval(t),
        }
    }

    /// Parameter and point closest to `xyz`.
    pub fn invert(&self, xyz: &Vec3) -> (f64, Vec3) {
        let t = match self {
            Curve::Line { origin, direction } => (v3(xyz) - v3(origin)).dot(&v3(direction)),
            Curve::Circle { placement, .. } => {
                let l = placement.local(xyz);
                wrap_angle(l.y.atan2(l.x))
            }
            Curve::Ellipse {
                placement,
                major,
                minor,
            } => {
                let l = placement.local(xyz);
                let mut t = wrap_angle((l.y / minor).atan2(l.x / major));
                // Newton on (C(t) - p) . C'(t) = 0
                for _ in 0..8 {
                    let e = self.eval(t);
                    let r = v3(&e.point) - v3(xyz);
                    let f = r.dot(&v3(&e.d1));
                    let df = v3(&e.d1).norm_squared() + r.dot(&v3(&e.d2));
                    if df.abs() < 1.0e-14 {
                        break;
                    }
                    t -= f / df;
                }
                wrap_angle(t)
            }
            Curve::Trimmed {
                basis,
                t_min,
                t_max,
            } => {
                let (mut t, _) = basis.invert(xyz);
                if basis.is_periodic() {
                    while t < *t_min - TOLERANCE {
                        t += TWO_PI;
                    }
                    while t > *t_max + TOLERANCE {
                        t -= TWO_PI;
                    }
                }
                t.clamp(*t_min, *t_max)
            }
        };
        (t, self.eval(t).point)
    }

    /// The curve with its parameter direction reversed.
    pub fn reversed(&self) -> Curve {
        match self {
            Curve::Line { origin, direction } => Curve::Line {
                origin: *origin,
                direction: arr(&-v3(direction)),
            },
            Curve::Circle { placement, radius } => Curve::Circle {
                placement: placement.mirrored(),
                radius: *radius,
            },
            Curve::Ellipse {
                placement,
                major,
                minor,
            } => Curve::Ellipse {
                placement: placement.mirrored(),
                major: *major,
                minor: *minor,
            },
            Curve::Trimmed {
                basis,
                t_min,
                t_max,
            } => Curve::Trimmed {
                t_min: basis.reversed_parameter(*t_max),
                t_max: basis.reversed_parameter(*t_min),
                basis: Box::new(basis.reversed()),
            },
        }
    }

    /// Maps a parameter of `self` to the same point on [`reversed`](Self::reversed).
    pub fn reversed_parameter(&self, t: f64) -> f64 {
        match self {
            Curve::Line { .. } => -t,
            Curve::Circle { .. } | Curve::Ellipse { .. } => TWO_PI - t,
            Curve::Trimmed { basis, .. } => basis.reversed_parameter(t),
        }
    }

    /// Applies a scaled-orthonormal affine map.
    pub fn transformed(&self, m: &Matrix) -> Curve {
        match self {
            Curve::Line { origin, direction } => {
                let d = v3(&egads_engine::apply_vector(m, direction));
                let len = d.norm();
                Curve::Line {
                    origin: egads_engine::apply_point(m, origin),
                    direction: arr(&if len > 0.0 { d / len } else { d }),
                }
            }
            Curve::Circle { placement, radius } => {
                let (placement, scale) = placement.transformed(m);
                Curve::Circle {
                    placement,
                    radius: radius * scale,
                }
            }
            Curve::Ellipse {
                placement,
                major,
                minor,
            } => {
                let (placement, scale) = placement.transformed(m);
                Curve::Ellipse {
                    placement,
                    major: major * scale,
                    minor: minor * scale,
                }
            }
            Curve::Trimmed {
                basis,
                t_min,
                t_max,
            } => {
                let scale = parameter_scale(basis, m);
                Curve::Trimmed {
                    basis: Box::new(basis.transformed(m)),
                    t_min: t_min * scale,
                    t_max: t_max * scale,
                }
            }
        }
    }

    /// Parameter on the transformed curve of a parameter on `self`.
    pub fn transformed_parameter(&self, m: &Matrix, t: f64) -> f64 {
        match self {
            Curve::Trimmed { basis, .. } => basis.transformed_parameter(m, t),
            other => t * parameter_scale(other, m),
        }
    }

    /// Approximate arc length between two parameters.
    pub fn length(&self, t0: f64, t1: f64) -> f64 {
        const SAMPLES: usize = 32;
        let mut total = 0.0;
        let mut prev = v3(&self.eval(t0).point);
        for i in 1..=SAMPLES {
            let t = t0 + (t1 - t0) * i as f64 / SAMPLES as f64;
            let p = v3(&self.eval(t).point);
            total += (p - prev).norm();
            prev = p;
        }
        total
    }

    /// `true` for straight lines (directly or trimmed).
    pub fn is_line(&self) -> bool {
        match self {
            Curve::Line { .. } => true,
            Curve::Trimmed { basis, .. } => basis.is_line(),
            _ => false,
        }
    }
}

/// Lines are arc-length parameterized, so a scaling stretches their
/// parameters; angular parameters are unaffected.
fn parameter_scale(curve: &Curve, m: &Matrix) -> f64 {
    match curve {
        Curve::Line { direction, .. } => v3(&egads_engine::apply_vector(m, direction)).norm(),
        Curve::Trimmed { basis, .. } => parameter_scale(basis, m),
        _ => 1.0,
    }
}

fn conic_eval(p: &Placement, a: f64, b: f64, t: f64) -> CurveEval {
    let (s, c) = t.sin_cos();
    let x = v3(&p.x);
    let y = v3(&p.y);
    let point: Vector3<f64> = v3(&p.origin) + x * (a * c) + y * (b * s);
    let d1 = x * (-a * s) + y * (b * c);
    let d2 = x * (-a * c) + y * (-b * s);
    CurveEval {
        point: arr(&point),
        d1: arr(&d1),
        d2: arr(&d2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use egads_engine::Frame;
    use std::f64::consts::FRAC_PI_2;

    fn unit_circle() -> Curve {
        Curve::from_def(
            &CurveDef::Circle {
                frame: Frame::xy([0.0, 0.0, 0.0]),
                radius: 1.0,
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn line_is_arc_length_parameterized() {
        let line = Curve::from_def(
            &CurveDef::Line {
                origin: [1.0, 0.0, 0.0],
                direction: [0.0, 2.0, 0.0],
            },
            None,
        )
        .unwrap();
        let e = line.eval(3.0);
        assert_relative_eq!(e.point[1], 3.0);
        assert_relative_eq!(e.d1[1], 1.0);
    }

    #[test]
    fn zero_direction_is_degenerate() {
        let r = Curve::from_def(
            &CurveDef::Line {
                origin: [0.0; 3],
                direction: [0.0; 3],
            },
            None,
        );
        assert!(matches!(r, Err(EngineError::Degenerate(_))));
    }

    #[test]
    fn circle_invert_round_trip() {
        let c = unit_circle();
        let p = c.eval(FRAC_PI_2).point;
        let (t, q) = c.invert(&p);
        assert_relative_eq!(t, FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(q[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn reversed_parameter_maps_points() {
        let c = unit_circle();
        let r = c.reversed();
        let t = 0.7;
        let a = c.eval(t).point;
        let b = r.eval(c.reversed_parameter(t)).point;
        for i in 0..3 {
            assert_relative_eq!(a[i], b[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn trimmed_needs_basis() {
        let r = Curve::from_def(
            &CurveDef::Trimmed {
                t_min: 0.0,
                t_max: 1.0,
            },
            None,
        );
        assert!(matches!(r, Err(EngineError::Construction(_))));
    }

    #[test]
    fn scaled_line_stretches_parameters() {
        let line = Curve::Line {
            origin: [0.0; 3],
            direction: [1.0, 0.0, 0.0],
        };
        let m = [2.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0];
        assert_relative_eq!(line.transformed_parameter(&m, 1.5), 3.0);
    }

    #[test]
    fn unsupported_types_are_reported() {
        let r = Curve::from_def(
            &CurveDef::Bezier {
                poles: vec![[0.0; 3], [1.0, 0.0, 0.0]],
                weights: None,
            },
            None,
        );
        assert!(matches!(r, Err(EngineError::Unsupported(_))));
    }
}
