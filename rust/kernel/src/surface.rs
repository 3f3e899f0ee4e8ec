// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Analytic surfaces.

use egads_engine::{EngineError, Matrix, Range, Result, SurfaceDef, SurfaceEval, Vec3};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::math::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Surface {
    /// `p(u, v) = o + u x + v y`
    Plane { placement: Placement },
    /// `p(u, v) = o + r (cos u x + sin u y) + v z`
    Cylinder { placement: Placement, radius: f64 },
    /// `p(u, v) = o + r cos v (cos u x + sin u y) + r sin v z`
    Sphere { placement: Placement, radius: f64 },
    /// `p(u, v) = o + (r + v sin a)(cos u x + sin u y) + v cos a z`
    Cone {
        placement: Placement,
        angle: f64,
        radius: f64,
    },
    /// `p(u, v) = o + (R + r cos v)(cos u x + sin u y) + r sin v z`
    Torus {
        placement: Placement,
        major: f64,
        minor: f64,
    },
    Trimmed {
        basis: Box<Surface>,
        u: [f64; 2],
        v: [f64; 2],
    },
}

impl Surface {
    pub fn from_def(def: &SurfaceDef, basis: Option<&Surface>) -> Result<Self> {
        let positive = |value: f64, what: &str| {
            if value > 0.0 {
                Ok(value)
            } else {
                Err(EngineError::Degenerate(format!("{what} {value}")))
            }
        };
        match def {
            SurfaceDef::Plane { frame } => Ok(Surface::Plane {
                placement: Placement::from_frame(frame)?,
            }),
            SurfaceDef::Cylindrical { frame, radius } => Ok(Surface::Cylinder {
                placement: Placement::from_frame(frame)?,
                radius: positive(*radius, "cylinder radius")?,
            }),
            SurfaceDef::Spherical { frame, radius } => Ok(Surface::Sphere {
                placement: Placement::from_frame(frame)?,
                radius: positive(*radius, "sphere radius")?,
            }),
            SurfaceDef::Conical {
                frame,
                angle,
                radius,
            } => {
                if angle.abs() < TOLERANCE || angle.abs() >= std::f64::consts::FRAC_PI_2 {
                    return Err(EngineError::Construction(format!("cone half-angle {angle}")));
                }
                Ok(Surface::Cone {
                    placement: Placement::from_frame(frame)?,
                    angle: *angle,
                    radius: *radius,
                })
            }
            SurfaceDef::Toroidal {
                frame,
                major,
                minor,
            } => Ok(Surface::Torus {
                placement: Placement::from_frame(frame)?,
                major: positive(*major, "torus major radius")?,
                minor: positive(*minor, "torus minor radius")?,
            }),
            SurfaceDef::Trimmed { u, v } => {
                let basis = basis.ok_or_else(|| {
                    EngineError::Construction("trimmed surface without basis".into())
                })?;
                if u[0] >= u[1] || v[0] >= v[1] {
                    return Err(EngineError::Construction("empty trim range".into()));
                }
                Ok(Surface::Trimmed {
                    basis: Box::new(basis.clone()),
                    u: *u,
                    v: *v,
                })
            }
            SurfaceDef::Revolution { .. } => Err(EngineError::Unsupported("surfaces of revolution")),
            SurfaceDef::Extrusion { .. } => Err(EngineError::Unsupported("extrusion surfaces")),
            SurfaceDef::Bezier { .. } => Err(EngineError::Unsupported("bezier surfaces")),
            SurfaceDef::BSpline { .. } => Err(EngineError::Unsupported("b-spline surfaces")),
            SurfaceDef::Offset { .. } => Err(EngineError::Unsupported("offset surfaces")),
        }
    }

    pub fn describe(&self) -> (SurfaceDef, Option<Surface>) {
        match self {
            Surface::Plane { placement } => (
                SurfaceDef::Plane {
                    frame: placement.to_frame(),
                },
                None,
            ),
            Surface::Cylinder { placement, radius } => (
                SurfaceDef::Cylindrical {
                    frame: placement.to_frame(),
                    radius: *radius,
                },
                None,
            ),
            Surface::Sphere { placement, radius } => (
                SurfaceDef::Spherical {
                    frame: placement.to_frame(),
                    radius: *radius,
                },
                None,
            ),
            Surface::Cone {
                placement,
                angle,
                radius,
            } => (
                SurfaceDef::Conical {
                    frame: placement.to_frame(),
                    angle: *angle,
                    radius: *radius,
                },
                None,
            ),
            Surface::Torus {
                placement,
                major,
                minor,
            } => (
                SurfaceDef::Toroidal {
                    frame: placement.to_frame(),
                    major: *major,
                    minor: *minor,
                },
                None,
            ),
            Surface::Trimmed { basis, u, v } => (
                SurfaceDef::Trimmed { u: *u, v: *v },
                Some((**basis).clone()),
            ),
        }
    }

    pub fn is_plane(&self) -> bool {
        match self {
            Surface::Plane { .. } => true,
            Surface::Trimmed { basis, .. } => basis.is_plane(),
            _ => false,
        }
    }

    pub fn range(&self) -> Range {
        let full = [0.0, TWO_PI];
        let open = [-INFINITE, INFINITE];
        match self {
            Surface::Plane { .. } => Range::Surface {
                u: open,
                v: open,
                periodic: [false, false],
            },
            Surface::Cylinder { .. } | Surface::Cone { .. } => Range::Surface {
                u: full,
                v: open,
                periodic: [true, false],
            },
            Surface::Sphere { .. } => Range::Surface {
                u: full,
                v: [-std::f64::consts::FRAC_PI_2, std::f64::consts::FRAC_PI_2],
                periodic: [true, false],
            },
            Surface::Torus { .. } => Range::Surface {
                u: full,
                v: full,
                periodic: [true, true],
            },
            Surface::Trimmed { u, v, .. } => Range::Surface {
                u: *u,
                v: *v,
                periodic: [false, false],
            },
        }
    }

    pub fn eval(&self, u: f64, v: f64) -> SurfaceEval {
        let zero = Vector3::zeros();
        let pack = |p: Vector3<f64>,
                    du: Vector3<f64>,
                    dv: Vector3<f64>,
                    duu: Vector3<f64>,
                    duv: Vector3<f64>,
                    dvv: Vector3<f64>| SurfaceEval {
            point: arr(&p),
            du: arr(&du),
            dv: arr(&dv),
            duu: arr(&duu),
            duv: arr(&duv),
            dvv: arr(&dvv),
        };
        match self {
            Surface::Plane { placement } => pack(
                placement.at(u, v, 0.0),
                v3(&placement.x),
                v3(&placement.y),
                zero,
                zero,
                zero,
            ),
            Surface::Cylinder { placement, radius } => {
                let (su, cu) = u.sin_cos();
                let (x, y, z) = axes(placement);
                let radial = x * cu + y * su;
                let tangent = x * -su + y * cu;
                pack(
                    v3(&placement.origin) + radial * *radius + z * v,
                    tangent * *radius,
                    z,
                    radial * -*radius,
                    zero,
                    zero,
                )
            }
            Surface::Sphere { placement, radius } => {
                let r = *radius;
                let (su, cu) = u.sin_cos();
                let (sv, cv) = v.sin_cos();
                let (x, y, z) = axes(placement);
                let radial = x * cu + y * su;
                let tangent = x * -su + y * cu;
                pack(
                    v3(&placement.origin) + radial * (r * cv) + z * (r * sv),
                    tangent * (r * cv),
                    radial * (-r * sv) + z * (r * cv),
                    radial * (-r * cv),
                    tangent * (-r * sv),
                    radial * (-r * cv) - z * (r * sv),
                )
            }
            Surface::Cone {
                placement,
                angle,
                radius,
            } => {
                let (sa, ca) = angle.sin_cos();
                let (su, cu) = u.sin_cos();
                let (x, y, z) = axes(placement);
                let radial = x * cu + y * su;
                let tangent = x * -su + y * cu;
                let k = radius + v * sa;
                pack(
                    v3(&placement.origin) + radial * k + z * (v * ca),
                    tangent * k,
                    radial * sa + z * ca,
                    radial * -k,
                    tangent * sa,
                    zero,
                )
            }
            Surface::Torus {
                placement,
                major,
                minor,
            } => {
                let (su, cu) = u.sin_cos();
                let (sv, cv) = v.sin_cos();
                let (x, y, z) = axes(placement);
                let radial = x * cu + y * su;
                let tangent = x * -su + y * cu;
                let k = major + minor * cv;
                pack(
                    v3(&placement.origin) + radial * k + z * (minor * sv),
                    tangent * k,
                    radial * (-minor * sv) + z * (minor * cv),
                    radial * -k,
                    tangent * (-minor * sv),
                    radial * (-minor * cv) - z * (minor * sv),
                )
            }
            Surface::Trimmed { basis, .. } => basis.eval(u, v),
        }
    }

    /// Parameters and point closest to `xyz`.
    pub fn invert(&self, xyz: &Vec3) -> ([f64; 2], Vec3) {
        let uv = match self {
            Surface::Plane { placement } => {
                let l = placement.local(xyz);
                [l.x, l.y]
            }
            Surface::Cylinder { placement, .. } => {
                let l = placement.local(xyz);
                [wrap_angle(l.y.atan2(l.x)), l.z]
            }
            Surface::Sphere { placement, .. } => {
                let l = placement.local(xyz);
                let rho = (l.x * l.x + l.y * l.y).sqrt();
                [wrap_angle(l.y.atan2(l.x)), l.z.atan2(rho)]
            }
            Surface::Cone {
                placement,
                angle,
                radius,
            } => {
                let l = placement.local(xyz);
                let rho = (l.x * l.x + l.y * l.y).sqrt();
                let (sa, ca) = angle.sin_cos();
                [wrap_angle(l.y.atan2(l.x)), (rho - radius) * sa + l.z * ca]
            }
            Surface::Torus {
                placement, major, ..
            } => {
                let l = placement.local(xyz);
                let rho = (l.x * l.x + l.y * l.y).sqrt();
                [wrap_angle(l.y.atan2(l.x)), wrap_angle(l.z.atan2(rho - major))]
            }
            Surface::Trimmed { basis, u, v } => {
                let (uv, _) = basis.invert(xyz);
                [uv[0].clamp(u[0], u[1]), uv[1].clamp(v[0], v[1])]
            }
        };
        (uv, self.eval(uv[0], uv[1]).point)
    }

    /// The surface with its normal flipped.
    pub fn reversed(&self) -> Surface {
        match self {
            Surface::Plane { placement } => Surface::Plane {
                placement: placement.mirrored(),
            },
            Surface::Cylinder { placement, radius } => Surface::Cylinder {
                placement: placement.mirrored(),
                radius: *radius,
            },
            Surface::Sphere { placement, radius } => Surface::Sphere {
                placement: placement.mirrored(),
                radius: *radius,
            },
            Surface::Cone {
                placement,
                angle,
                radius,
            } => Surface::Cone {
                placement: placement.mirrored(),
                angle: *angle,
                radius: *radius,
            },
            Surface::Torus {
                placement,
                major,
                minor,
            } => Surface::Torus {
                placement: placement.mirrored(),
                major: *major,
                minor: *minor,
            },
            Surface::Trimmed { basis, u, v } => {
                let (u, v) = if basis.is_plane() {
                    (*u, [-v[1], -v[0]])
                } else {
                    ([TWO_PI - u[1], TWO_PI - u[0]], *v)
                };
                Surface::Trimmed {
                    basis: Box::new(basis.reversed()),
                    u,
                    v,
                }
            }
        }
    }

    pub fn transformed(&self, m: &Matrix) -> Surface {
        match self {
            Surface::Plane { placement } => Surface::Plane {
                placement: placement.transformed(m).0,
            },
            Surface::Cylinder { placement, radius } => {
                let (placement, s) = placement.transformed(m);
                Surface::Cylinder {
                    placement,
                    radius: radius * s,
                }
            }
            Surface::Sphere { placement, radius } => {
                let (placement, s) = placement.transformed(m);
                Surface::Sphere {
                    placement,
                    radius: radius * s,
                }
            }
            Surface::Cone {
                placement,
                angle,
                radius,
            } => {
                let (placement, s) = placement.transformed(m);
                Surface::Cone {
                    placement,
                    angle: *angle,
                    radius: radius * s,
                }
            }
            Surface::Torus {
                placement,
                major,
                minor,
            } => {
                let (placement, s) = placement.transformed(m);
                Surface::Torus {
                    placement,
                    major: major * s,
                    minor: minor * s,
                }
            }
            Surface::Trimmed { basis, u, v } => Surface::Trimmed {
                basis: Box::new(basis.transformed(m)),
                u: *u,
                v: *v,
            },
        }
    }

    /// Unit normal at `(u, v)`.
    pub fn normal(&self, u: f64, v: f64) -> Option<Vector3<f64>> {
        let e = self.eval(u, v);
        let n = v3(&e.du).cross(&v3(&e.dv));
        let len = n.norm();
        (len > TOLERANCE).then(|| n / len)
    }
}

fn axes(p: &Placement) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    (v3(&p.x), v3(&p.y), v3(&p.z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use egads_engine::Frame;

    fn cylinder() -> Surface {
        Surface::from_def(
            &SurfaceDef::Cylindrical {
                frame: Frame::xy([0.0; 3]),
                radius: 2.0,
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn plane_invert_is_projection() {
        let plane = Surface::from_def(
            &SurfaceDef::Plane {
                frame: Frame::xy([0.0, 0.0, 1.0]),
            },
            None,
        )
        .unwrap();
        let (uv, p) = plane.invert(&[3.0, 4.0, 7.0]);
        assert_relative_eq!(uv[0], 3.0);
        assert_relative_eq!(uv[1], 4.0);
        assert_relative_eq!(p[2], 1.0);
    }

    #[test]
    fn cylinder_eval_and_invert() {
        let c = cylinder();
        let e = c.eval(std::f64::consts::FRAC_PI_2, 5.0);
        assert_relative_eq!(e.point[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(e.point[2], 5.0);
        let (uv, _) = c.invert(&e.point);
        assert_relative_eq!(uv[0], std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(uv[1], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn reversal_flips_normal() {
        let c = cylinder();
        let n0 = c.normal(0.0, 0.0).unwrap();
        let n1 = c.reversed().normal(0.0, 0.0).unwrap();
        assert_relative_eq!(n0.dot(&n1), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn sphere_poles_are_in_range() {
        let s = Surface::from_def(
            &SurfaceDef::Spherical {
                frame: Frame::xy([0.0; 3]),
                radius: 1.0,
            },
            None,
        )
        .unwrap();
        let (uv, _) = s.invert(&[0.0, 0.0, 3.0]);
        assert_relative_eq!(uv[1], std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn negative_radius_is_degenerate() {
        let r = Surface::from_def(
            &SurfaceDef::Spherical {
                frame: Frame::xy([0.0; 3]),
                radius: -1.0,
            },
            None,
        );
        assert!(matches!(r, Err(EngineError::Degenerate(_))));
    }
}
