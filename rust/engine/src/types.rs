// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine-neutral value types exchanged between the object model and a
//! geometry engine.
//!
//! Geometry is described by [`CurveDef`] and [`SurfaceDef`]. The numeric
//! member-type codes match the classic EGADS values so that persisted data and
//! `get_info` results stay comparable across engines.

use serde::{Deserialize, Serialize};

/// A 3D point or vector.
pub type Vec3 = [f64; 3];

/// Row-major 3x4 affine matrix: `[r00 r01 r02 t0 r10 r11 r12 t1 r20 r21 r22 t2]`.
pub type Matrix = [f64; 12];

/// The identity [`Matrix`].
pub const IDENTITY: Matrix = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0,
];

/// Applies a [`Matrix`] to a point.
pub fn apply_point(m: &Matrix, p: &Vec3) -> Vec3 {
    [
        m[0] * p[0] + m[1] * p[1] + m[2] * p[2] + m[3],
        m[4] * p[0] + m[5] * p[1] + m[6] * p[2] + m[7],
        m[8] * p[0] + m[9] * p[1] + m[10] * p[2] + m[11],
    ]
}

/// Applies the linear part of a [`Matrix`] to a direction.
pub fn apply_vector(m: &Matrix, v: &Vec3) -> Vec3 {
    [
        m[0] * v[0] + m[1] * v[1] + m[2] * v[2],
        m[4] * v[0] + m[5] * v[1] + m[6] * v[2],
        m[8] * v[0] + m[9] * v[1] + m[10] * v[2],
    ]
}

/// Orientation of a sub-shape use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sense {
    Forward,
    Reverse,
}

impl Sense {
    /// Returns `1` or `-1`.
    pub fn as_i32(self) -> i32 {
        match self {
            Sense::Forward => 1,
            Sense::Reverse => -1,
        }
    }

    /// Parses `1`/`-1`. Anything else is rejected.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Sense::Forward),
            -1 => Some(Sense::Reverse),
            _ => None,
        }
    }

    /// Returns the opposite orientation.
    pub fn reversed(self) -> Self {
        match self {
            Sense::Forward => Sense::Reverse,
            Sense::Reverse => Sense::Forward,
        }
    }
}

/// Kind of a B-rep shape handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShapeKind {
    Vertex,
    Edge,
    Wire,
    Face,
    Shell,
    Solid,
    Compound,
}

/// Exchange formats an engine may read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// The engine's own B-rep dump.
    Native,
    Step,
    Iges,
}

/// Solid Boolean operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Subtraction = 1,
    Intersection = 2,
    Fusion = 3,
}

/// Curve member types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveType {
    Line = 1,
    Circle = 2,
    Ellipse = 3,
    Parabola = 4,
    Hyperbola = 5,
    Trimmed = 6,
    Bezier = 7,
    BSpline = 8,
    Offset = 9,
}

/// Surface member types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceType {
    Plane = 1,
    Spherical = 2,
    Cylindrical = 3,
    Revolution = 4,
    Toroidal = 5,
    Trimmed = 6,
    Bezier = 7,
    BSpline = 8,
    Offset = 9,
    Conical = 10,
    Extrusion = 11,
}

/// A local frame: origin plus two in-plane axes. The third axis is `x × y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub origin: Vec3,
    pub x_axis: Vec3,
    pub y_axis: Vec3,
}

impl Frame {
    /// The global XY frame at `origin`.
    pub fn xy(origin: Vec3) -> Self {
        Self {
            origin,
            x_axis: [1.0, 0.0, 0.0],
            y_axis: [0.0, 1.0, 0.0],
        }
    }
}

/// Engine-neutral curve definition.
///
/// Variants that derive from another curve (`Trimmed`, `Offset`) take the
/// basis separately when constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CurveDef {
    Line { origin: Vec3, direction: Vec3 },
    Circle { frame: Frame, radius: f64 },
    Ellipse { frame: Frame, major: f64, minor: f64 },
    Parabola { frame: Frame, focal: f64 },
    Hyperbola { frame: Frame, major: f64, minor: f64 },
    Trimmed { t_min: f64, t_max: f64 },
    Bezier { poles: Vec<Vec3>, weights: Option<Vec<f64>> },
    BSpline {
        degree: u32,
        knots: Vec<f64>,
        poles: Vec<Vec3>,
        weights: Option<Vec<f64>>,
    },
    Offset { direction: Vec3, distance: f64 },
}

impl CurveDef {
    /// Returns the member type of this definition.
    pub fn curve_type(&self) -> CurveType {
        match self {
            CurveDef::Line { .. } => CurveType::Line,
            CurveDef::Circle { .. } => CurveType::Circle,
            CurveDef::Ellipse { .. } => CurveType::Ellipse,
            CurveDef::Parabola { .. } => CurveType::Parabola,
            CurveDef::Hyperbola { .. } => CurveType::Hyperbola,
            CurveDef::Trimmed { .. } => CurveType::Trimmed,
            CurveDef::Bezier { .. } => CurveType::Bezier,
            CurveDef::BSpline { .. } => CurveType::BSpline,
            CurveDef::Offset { .. } => CurveType::Offset,
        }
    }

    /// `true` when the definition is relative to a basis curve.
    pub fn needs_basis(&self) -> bool {
        matches!(self, CurveDef::Trimmed { .. } | CurveDef::Offset { .. })
    }
}

/// Engine-neutral surface definition.
///
/// `Revolution` and `Extrusion` sweep a basis curve; `Trimmed` and `Offset`
/// derive from a basis surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SurfaceDef {
    Plane { frame: Frame },
    Spherical { frame: Frame, radius: f64 },
    Cylindrical { frame: Frame, radius: f64 },
    Revolution { origin: Vec3, axis: Vec3 },
    Toroidal { frame: Frame, major: f64, minor: f64 },
    Trimmed { u: [f64; 2], v: [f64; 2] },
    Bezier {
        nu: usize,
        nv: usize,
        poles: Vec<Vec3>,
        weights: Option<Vec<f64>>,
    },
    BSpline {
        degree: [u32; 2],
        u_knots: Vec<f64>,
        v_knots: Vec<f64>,
        poles: Vec<Vec3>,
        weights: Option<Vec<f64>>,
    },
    Offset { distance: f64 },
    Conical { frame: Frame, angle: f64, radius: f64 },
    Extrusion { direction: Vec3 },
}

impl SurfaceDef {
    /// Returns the member type of this definition.
    pub fn surface_type(&self) -> SurfaceType {
        match self {
            SurfaceDef::Plane { .. } => SurfaceType::Plane,
            SurfaceDef::Spherical { .. } => SurfaceType::Spherical,
            SurfaceDef::Cylindrical { .. } => SurfaceType::Cylindrical,
            SurfaceDef::Revolution { .. } => SurfaceType::Revolution,
            SurfaceDef::Toroidal { .. } => SurfaceType::Toroidal,
            SurfaceDef::Trimmed { .. } => SurfaceType::Trimmed,
            SurfaceDef::Bezier { .. } => SurfaceType::Bezier,
            SurfaceDef::BSpline { .. } => SurfaceType::BSpline,
            SurfaceDef::Offset { .. } => SurfaceType::Offset,
            SurfaceDef::Conical { .. } => SurfaceType::Conical,
            SurfaceDef::Extrusion { .. } => SurfaceType::Extrusion,
        }
    }

    /// Which basis the definition needs, if any.
    pub fn basis_kind(&self) -> Option<BasisKind> {
        match self {
            SurfaceDef::Revolution { .. } | SurfaceDef::Extrusion { .. } => Some(BasisKind::Curve),
            SurfaceDef::Trimmed { .. } | SurfaceDef::Offset { .. } => Some(BasisKind::Surface),
            _ => None,
        }
    }
}

/// Discriminant of a [`Basis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisKind {
    Curve,
    Surface,
}

/// Basis geometry of a derived surface. Used both borrowed
/// (`Basis<&C, &S>`) and owned.
#[derive(Debug, Clone)]
pub enum Basis<C, S> {
    Curve(C),
    Surface(S),
}

impl<C, S> Basis<C, S> {
    pub fn kind(&self) -> BasisKind {
        match self {
            Basis::Curve(_) => BasisKind::Curve,
            Basis::Surface(_) => BasisKind::Surface,
        }
    }
}

/// Parametric extent of a curve or surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Range {
    Curve { t: [f64; 2], periodic: bool },
    Surface {
        u: [f64; 2],
        v: [f64; 2],
        periodic: [bool; 2],
    },
}

/// Point and derivatives of a curve at one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveEval {
    pub point: Vec3,
    pub d1: Vec3,
    pub d2: Vec3,
}

/// Point and derivatives of a surface at one `(u, v)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceEval {
    pub point: Vec3,
    pub du: Vec3,
    pub dv: Vec3,
    pub duu: Vec3,
    pub duv: Vec3,
    pub dvv: Vec3,
}

/// Solid primitives understood by [`GeometryEngine::make_primitive`](crate::GeometryEngine::make_primitive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Box { corner: Vec3, size: Vec3 },
    Sphere { center: Vec3, radius: f64 },
    Cone { apex: Vec3, base: Vec3, radius: f64 },
    Cylinder { start: Vec3, end: Vec3, radius: f64 },
    Torus { center: Vec3, axis: Vec3, major: f64, minor: f64 },
}

/// Tessellation controls: `[max edge length, chord deviation, dihedral angle in degrees]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TessParams {
    pub max_length: f64,
    pub chord: f64,
    pub angle: f64,
}

impl TessParams {
    pub fn new(max_length: f64, chord: f64, angle: f64) -> Self {
        Self {
            max_length,
            chord,
            angle,
        }
    }
}

/// Polyline discretization of an edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeMesh {
    pub xyz: Vec<Vec3>,
    pub t: Vec<f64>,
}

/// Triangulation of a face. Triangle indices are 0-based into `xyz`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceMesh {
    pub xyz: Vec<Vec3>,
    pub uv: Vec<[f64; 2]>,
    pub tris: Vec<[usize; 3]>,
}

/// Options for lofting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoftOptions {
    pub solid: bool,
    pub ruled: bool,
}
