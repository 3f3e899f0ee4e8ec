// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The [`GeometryEngine`] trait.
//!
//! Every method has a default body that reports
//! [`EngineError::Unsupported`], so an engine implements only what it can do.
//! The object model maps such failures onto its own error codes.

use std::fmt::Debug;
use std::io::Write;

use crate::error::{EngineError, Result};
use crate::types::*;

/// A B-rep kernel wrapped by the object model.
///
/// Handles are cheap to clone and are dropped when the owning object is torn
/// down. Identity of topological handles is decided by [`is_same`](Self::is_same),
/// never by `==`.
#[allow(unused_variables)]
pub trait GeometryEngine {
    /// Any topological shape (vertex through compound).
    type Shape: Clone + Debug;
    /// A 3D curve.
    type Curve: Clone + Debug;
    /// A curve in the parameter space of a surface.
    type PCurve: Clone + Debug;
    /// A surface.
    type Surface: Clone + Debug;

    /// Short identifier for diagnostics.
    fn name(&self) -> &str {
        "unnamed"
    }

    // --- Geometry construction ---

    fn make_curve(&self, def: &CurveDef, basis: Option<&Self::Curve>) -> Result<Self::Curve> {
        Err(EngineError::Unsupported("make_curve"))
    }

    fn make_pcurve(&self, def: &CurveDef, basis: Option<&Self::PCurve>) -> Result<Self::PCurve> {
        Err(EngineError::Unsupported("make_pcurve"))
    }

    fn make_surface(
        &self,
        def: &SurfaceDef,
        basis: Option<Basis<&Self::Curve, &Self::Surface>>,
    ) -> Result<Self::Surface> {
        Err(EngineError::Unsupported("make_surface"))
    }

    // --- Geometry queries ---

    fn describe_curve(&self, curve: &Self::Curve) -> Result<(CurveDef, Option<Self::Curve>)> {
        Err(EngineError::Unsupported("describe_curve"))
    }

    fn describe_pcurve(&self, pcurve: &Self::PCurve) -> Result<(CurveDef, Option<Self::PCurve>)> {
        Err(EngineError::Unsupported("describe_pcurve"))
    }

    #[allow(clippy::type_complexity)]
    fn describe_surface(
        &self,
        surface: &Self::Surface,
    ) -> Result<(SurfaceDef, Option<Basis<Self::Curve, Self::Surface>>)> {
        Err(EngineError::Unsupported("describe_surface"))
    }

    fn curve_range(&self, curve: &Self::Curve) -> Result<Range> {
        Err(EngineError::Unsupported("curve_range"))
    }

    fn pcurve_range(&self, pcurve: &Self::PCurve) -> Result<Range> {
        Err(EngineError::Unsupported("pcurve_range"))
    }

    fn surface_range(&self, surface: &Self::Surface) -> Result<Range> {
        Err(EngineError::Unsupported("surface_range"))
    }

    fn eval_curve(&self, curve: &Self::Curve, t: f64) -> Result<CurveEval> {
        Err(EngineError::Unsupported("eval_curve"))
    }

    fn eval_pcurve(&self, pcurve: &Self::PCurve, t: f64) -> Result<CurveEval> {
        Err(EngineError::Unsupported("eval_pcurve"))
    }

    fn eval_surface(&self, surface: &Self::Surface, u: f64, v: f64) -> Result<SurfaceEval> {
        Err(EngineError::Unsupported("eval_surface"))
    }

    /// Closest point on the curve: `(t, point)`.
    fn invert_curve(&self, curve: &Self::Curve, xyz: &Vec3) -> Result<(f64, Vec3)> {
        Err(EngineError::Unsupported("invert_curve"))
    }

    fn invert_pcurve(&self, pcurve: &Self::PCurve, uv: &[f64; 2]) -> Result<(f64, Vec3)> {
        Err(EngineError::Unsupported("invert_pcurve"))
    }

    /// Closest point on the surface: `([u, v], point)`.
    fn invert_surface(&self, surface: &Self::Surface, xyz: &Vec3) -> Result<([f64; 2], Vec3)> {
        Err(EngineError::Unsupported("invert_surface"))
    }

    fn transform_curve(&self, curve: &Self::Curve, m: &Matrix) -> Result<Self::Curve> {
        Err(EngineError::Unsupported("transform_curve"))
    }

    fn transform_surface(&self, surface: &Self::Surface, m: &Matrix) -> Result<Self::Surface> {
        Err(EngineError::Unsupported("transform_surface"))
    }

    fn reverse_curve(&self, curve: &Self::Curve) -> Result<Self::Curve> {
        Err(EngineError::Unsupported("reverse_curve"))
    }

    fn reverse_surface(&self, surface: &Self::Surface) -> Result<Self::Surface> {
        Err(EngineError::Unsupported("reverse_surface"))
    }

    // --- Topology construction ---

    fn make_vertex(&self, xyz: &Vec3) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("make_vertex"))
    }

    /// Bounded edge on `curve` between two vertices (the same vertex twice
    /// for a closed edge).
    fn make_edge(
        &self,
        curve: &Self::Curve,
        start: &Self::Shape,
        end: &Self::Shape,
        t: [f64; 2],
    ) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("make_edge"))
    }

    fn make_degenerate_edge(&self, vertex: &Self::Shape, t: [f64; 2]) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("make_degenerate_edge"))
    }

    /// Connected chain of edges. Returns the wire and whether it is closed.
    fn make_wire(&self, edges: &[(Self::Shape, Sense)]) -> Result<(Self::Shape, bool)> {
        Err(EngineError::Unsupported("make_wire"))
    }

    /// Face bounded by `wires` (outer first) on `surface`.
    fn make_face(
        &self,
        surface: &Self::Surface,
        wires: &[Self::Shape],
        sense: Sense,
    ) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("make_face"))
    }

    /// Planar face filling a closed planar wire.
    fn make_planar_face(&self, wire: &Self::Shape) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("make_planar_face"))
    }

    fn make_shell(&self, faces: &[Self::Shape]) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("make_shell"))
    }

    /// Solid from an outer shell followed by void shells.
    fn make_solid(&self, shells: &[Self::Shape]) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("make_solid"))
    }

    fn make_compound(&self, shapes: &[Self::Shape]) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("make_compound"))
    }

    fn check_valid(&self, shape: &Self::Shape) -> Result<bool> {
        Ok(true)
    }

    // --- Exploration ---

    fn shape_kind(&self, shape: &Self::Shape) -> Result<ShapeKind> {
        Err(EngineError::Unsupported("shape_kind"))
    }

    /// Same underlying entity, regardless of orientation.
    fn is_same(&self, a: &Self::Shape, b: &Self::Shape) -> bool {
        false
    }

    /// Unique sub-shapes of `kind` in first-visit order (an indexed map).
    fn map_shapes(&self, shape: &Self::Shape, kind: ShapeKind) -> Result<Vec<Self::Shape>> {
        Err(EngineError::Unsupported("map_shapes"))
    }

    fn vertex_point(&self, vertex: &Self::Shape) -> Result<Vec3> {
        Err(EngineError::Unsupported("vertex_point"))
    }

    /// Start and end vertex in the edge's own parameter direction.
    fn edge_vertices(&self, edge: &Self::Shape) -> Result<(Self::Shape, Self::Shape)> {
        Err(EngineError::Unsupported("edge_vertices"))
    }

    /// The edge's curve, `None` for degenerate edges.
    fn edge_curve(&self, edge: &Self::Shape) -> Result<Option<Self::Curve>> {
        Err(EngineError::Unsupported("edge_curve"))
    }

    fn edge_range(&self, edge: &Self::Shape) -> Result<[f64; 2]> {
        Err(EngineError::Unsupported("edge_range"))
    }

    fn is_degenerate(&self, edge: &Self::Shape) -> Result<bool> {
        Ok(false)
    }

    /// Edges of a wire in traversal order with their use sense.
    fn wire_edges(&self, wire: &Self::Shape) -> Result<Vec<(Self::Shape, Sense)>> {
        Err(EngineError::Unsupported("wire_edges"))
    }

    fn face_surface(&self, face: &Self::Shape) -> Result<Self::Surface> {
        Err(EngineError::Unsupported("face_surface"))
    }

    /// Wires of a face with an "is outer" flag.
    fn face_wires(&self, face: &Self::Shape) -> Result<Vec<(Self::Shape, bool)>> {
        Err(EngineError::Unsupported("face_wires"))
    }

    fn face_sense(&self, face: &Self::Shape) -> Result<Sense> {
        Ok(Sense::Forward)
    }

    /// Parameter-space curve of `edge` on `face`, when the engine keeps one.
    fn edge_pcurve(&self, edge: &Self::Shape, face: &Self::Shape) -> Result<Option<Self::PCurve>> {
        Ok(None)
    }

    fn shell_faces(&self, shell: &Self::Shape) -> Result<Vec<Self::Shape>> {
        Err(EngineError::Unsupported("shell_faces"))
    }

    /// Shells of a solid with an "is outer" flag.
    fn solid_shells(&self, solid: &Self::Shape) -> Result<Vec<(Self::Shape, bool)>> {
        Err(EngineError::Unsupported("solid_shells"))
    }

    /// Closure of a wire or shell.
    fn is_closed(&self, shape: &Self::Shape) -> Result<bool> {
        Err(EngineError::Unsupported("is_closed"))
    }

    /// Bodies of a compound in export order: free wires, free faces, free
    /// shells, then solids.
    fn model_bodies(&self, compound: &Self::Shape) -> Result<Vec<Self::Shape>> {
        Err(EngineError::Unsupported("model_bodies"))
    }

    /// Parametric extent of an edge or face.
    fn shape_range(&self, shape: &Self::Shape) -> Result<Range> {
        Err(EngineError::Unsupported("shape_range"))
    }

    // --- Transformation ---

    fn transform_shape(&self, shape: &Self::Shape, m: &Matrix) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("transform_shape"))
    }

    /// Deep copy: new underlying entities, equal geometry.
    fn copy_shape(&self, shape: &Self::Shape) -> Result<Self::Shape> {
        self.transform_shape(shape, &IDENTITY)
    }

    fn reverse_shape(&self, shape: &Self::Shape) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("reverse_shape"))
    }

    // --- Feature operations ---

    fn boolean(&self, a: &Self::Shape, b: &Self::Shape, op: BooleanOp) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("boolean"))
    }

    fn fillet(&self, solid: &Self::Shape, edges: &[Self::Shape], radius: f64) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("fillet"))
    }

    fn chamfer(
        &self,
        solid: &Self::Shape,
        edges: &[(Self::Shape, Self::Shape)],
        d1: f64,
        d2: f64,
    ) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("chamfer"))
    }

    fn hollow(
        &self,
        solid: &Self::Shape,
        faces: &[Self::Shape],
        offset: f64,
        intersect: bool,
    ) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("hollow"))
    }

    fn extrude(&self, shape: &Self::Shape, distance: f64, direction: &Vec3) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("extrude"))
    }

    /// `axis` is `[origin, direction]`, `angle` in degrees.
    fn revolve(&self, shape: &Self::Shape, angle: f64, axis: &[f64; 6]) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("revolve"))
    }

    fn sweep(&self, shape: &Self::Shape, spine: &Self::Shape, mode: i32) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("sweep"))
    }

    fn loft(&self, sections: &[Self::Shape], options: LoftOptions) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("loft"))
    }

    fn make_primitive(&self, primitive: &Primitive) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("make_primitive"))
    }

    // --- Tessellation support ---

    fn discretize_edge(&self, edge: &Self::Shape, params: &TessParams) -> Result<EdgeMesh> {
        Err(EngineError::Unsupported("discretize_edge"))
    }

    fn triangulate_face(&self, face: &Self::Shape, params: &TessParams) -> Result<FaceMesh> {
        Err(EngineError::Unsupported("triangulate_face"))
    }

    // --- I/O ---

    fn write_shape(&self, shape: &Self::Shape, format: FileFormat, out: &mut dyn Write) -> Result<()> {
        Err(EngineError::Unsupported("write_shape"))
    }

    fn read_shape(&self, format: FileFormat, data: &str) -> Result<Self::Shape> {
        Err(EngineError::Unsupported("read_shape"))
    }
}
