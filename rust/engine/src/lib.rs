// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # EGADS Engine
//!
//! The interface between the EGADS object model and a B-rep kernel.
//!
//! The object model never looks inside a curve, surface or shape. It hands
//! engine handles around, asks the engine to build, explore, evaluate and
//! transform them, and drops them when the owning object is torn down.

pub mod engine;
pub mod error;
pub mod types;

pub use engine::GeometryEngine;
pub use error::{EngineError, Result};
pub use types::{
    apply_point, apply_vector, Basis, BasisKind, BooleanOp, CurveDef, CurveEval, CurveType,
    EdgeMesh, FaceMesh, FileFormat, Frame, LoftOptions, Matrix, Primitive, Range, Sense, ShapeKind,
    SurfaceDef, SurfaceEval, SurfaceType, TessParams, Vec3, IDENTITY,
};
