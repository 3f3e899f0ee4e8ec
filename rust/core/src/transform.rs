// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transformation objects.

use egads_engine::{GeometryEngine, Matrix};

use crate::blind::Blind;
use crate::context::Context;
use crate::error::{EgadsError, Result};
use crate::object::{Ego, MemberType, ObjectClass};

/// Tolerance of the scaled-orthonormality checks.
const ZERO: f64 = 1.0e-5;

/// Checks that the linear part of `m` is a uniformly scaled rotation.
pub(crate) fn check_matrix(m: &Matrix) -> Result<()> {
    let row = |i: usize| [m[4 * i], m[4 * i + 1], m[4 * i + 2]];
    let dot = |a: [f64; 3], b: [f64; 3]| a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
    let (x, y, z) = (row(0), row(1), row(2));

    let xx = dot(x, x);
    if xx.sqrt() < ZERO {
        return Err(EgadsError::DegenerateGeometry("no length on transform".into()));
    }
    if ((xx - dot(y, y)) / xx).abs() > ZERO || ((xx - dot(z, z)) / xx).abs() > ZERO {
        return Err(EgadsError::BadScale);
    }
    if (dot(x, y) / xx).abs() > ZERO || (dot(x, z) / xx).abs() > ZERO || (dot(y, z) / xx).abs() > ZERO {
        return Err(EgadsError::NotOrthogonal);
    }
    Ok(())
}

impl<E: GeometryEngine> Context<E> {
    /// Creates a Transform object from a row-major 3x4 matrix.
    ///
    /// Transforms are not kept alive by the context: the first
    /// [`delete_object`](Self::delete_object) destroys them.
    pub fn make_transform(&mut self, m: &Matrix) -> Result<Ego> {
        if let Err(e) = check_matrix(m) {
            egads_log!(self, error, error = %e, "bad transform");
            return Err(e);
        }
        let key = self.alloc_record(
            ObjectClass::Transform,
            MemberType::Unset,
            Some(Blind::Transform(*m)),
            self.root,
        )?;
        Ok(self.ego(key))
    }

    pub fn get_transformation(&self, xform: Ego) -> Result<Matrix> {
        let key = self.key_of(xform)?;
        self.matrix_of(key)
    }

    pub(crate) fn matrix_of(&self, key: crate::object::ObjectKey) -> Result<Matrix> {
        match self.objects[key].blind {
            Some(Blind::Transform(m)) => Ok(m),
            _ => Err(EgadsError::NotATransform),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egads_engine::IDENTITY;

    #[test]
    fn scaled_rotation_is_accepted() {
        let m = [
            0.0, -2.0, 0.0, 1.0, //
            2.0, 0.0, 0.0, 2.0, //
            0.0, 0.0, 2.0, 3.0,
        ];
        assert!(check_matrix(&m).is_ok());
        assert!(check_matrix(&IDENTITY).is_ok());
    }

    #[test]
    fn rejections_follow_the_check_order() {
        let mut zero = IDENTITY;
        zero[0] = 0.0;
        assert!(matches!(check_matrix(&zero), Err(EgadsError::DegenerateGeometry(_))));

        let mut skew = IDENTITY;
        skew[5] = 2.0;
        assert_eq!(check_matrix(&skew), Err(EgadsError::BadScale));

        let shear = [
            1.0, 0.0, 0.0, 0.0, //
            0.6, 0.8, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0,
        ];
        assert_eq!(check_matrix(&shear), Err(EgadsError::NotOrthogonal));
    }
}
