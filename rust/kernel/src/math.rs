// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Small vector helpers bridging `[f64; 3]` storage and nalgebra math.

use egads_engine::{EngineError, Frame, Matrix, Result, Vec3};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Geometric tolerance used for coincidence and degeneracy checks.
pub const TOLERANCE: f64 = 1.0e-7;

/// Stand-in for an unbounded parameter.
pub const INFINITE: f64 = 2.0e100;

pub const TWO_PI: f64 = std::f64::consts::PI * 2.0;

#[inline]
pub fn v3(a: &Vec3) -> Vector3<f64> {
    Vector3::new(a[0], a[1], a[2])
}

#[inline]
pub fn arr(v: &Vector3<f64>) -> Vec3 {
    [v.x, v.y, v.z]
}

#[inline]
pub fn distance(a: &Vec3, b: &Vec3) -> f64 {
    (v3(a) - v3(b)).norm()
}

/// Normalizes `v`, failing on zero length.
pub fn unit(v: &Vector3<f64>, what: &str) -> Result<Vector3<f64>> {
    let len = v.norm();
    if len < TOLERANCE {
        return Err(EngineError::Degenerate(format!("zero-length {what}")));
    }
    Ok(v / len)
}

/// Wraps an angle into `[0, 2π)`.
pub fn wrap_angle(a: f64) -> f64 {
    let r = a.rem_euclid(TWO_PI);
    if r >= TWO_PI - 1.0e-12 {
        0.0
    } else {
        r
    }
}

/// Orthonormal placement with an explicit axis.
///
/// The axis is kept separately from `x × y` so that a surface can be
/// reversed by mirroring `y` alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub origin: Vec3,
    pub x: Vec3,
    pub y: Vec3,
    pub z: Vec3,
}

impl Placement {
    /// Builds an orthonormal placement from a frame; `y` is re-orthogonalized
    /// against `x`.
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let x = unit(&v3(&frame.x_axis), "x axis")?;
        let z = unit(&x.cross(&v3(&frame.y_axis)), "frame normal")?;
        let y = z.cross(&x);
        Ok(Self {
            origin: frame.origin,
            x: arr(&x),
            y: arr(&y),
            z: arr(&z),
        })
    }

    pub fn to_frame(&self) -> Frame {
        Frame {
            origin: self.origin,
            x_axis: self.x,
            y_axis: self.y,
        }
    }

    /// Point at local coordinates.
    pub fn at(&self, a: f64, b: f64, c: f64) -> Vector3<f64> {
        v3(&self.origin) + v3(&self.x) * a + v3(&self.y) * b + v3(&self.z) * c
    }

    /// Local coordinates of a point.
    pub fn local(&self, p: &Vec3) -> Vector3<f64> {
        let d = v3(p) - v3(&self.origin);
        Vector3::new(d.dot(&v3(&self.x)), d.dot(&v3(&self.y)), d.dot(&v3(&self.z)))
    }

    /// Applies an affine matrix. Returns the placement and the uniform scale.
    pub fn transformed(&self, m: &Matrix) -> (Self, f64) {
        let x = v3(&egads_engine::apply_vector(m, &self.x));
        let y = v3(&egads_engine::apply_vector(m, &self.y));
        let z = v3(&egads_engine::apply_vector(m, &self.z));
        let scale = x.norm();
        let n = |v: Vector3<f64>| if scale > 0.0 { v / scale } else { v };
        (
            Self {
                origin: egads_engine::apply_point(m, &self.origin),
                x: arr(&n(x)),
                y: arr(&n(y)),
                z: arr(&n(z)),
            },
            scale,
        )
    }

    /// Mirror of `y`; reverses the angular or `v` direction.
    pub fn mirrored(&self) -> Self {
        Self {
            y: arr(&-v3(&self.y)),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn placement_orthonormalizes() {
        let frame = Frame {
            origin: [0.0, 0.0, 0.0],
            x_axis: [2.0, 0.0, 0.0],
            y_axis: [1.0, 1.0, 0.0],
        };
        let p = Placement::from_frame(&frame).unwrap();
        assert_relative_eq!(p.x[0], 1.0);
        assert_relative_eq!(p.y[1], 1.0);
        assert_relative_eq!(p.z[2], 1.0);
    }

    #[test]
    fn parallel_axes_are_degenerate() {
        let frame = Frame {
            origin: [0.0, 0.0, 0.0],
            x_axis: [1.0, 0.0, 0.0],
            y_axis: [3.0, 0.0, 0.0],
        };
        assert!(matches!(
            Placement::from_frame(&frame),
            Err(EngineError::Degenerate(_))
        ));
    }

    #[test]
    fn wrap_angle_range() {
        assert_relative_eq!(wrap_angle(-std::f64::consts::FRAC_PI_2), 1.5 * std::f64::consts::PI);
        assert_relative_eq!(wrap_angle(TWO_PI), 0.0);
    }
}
