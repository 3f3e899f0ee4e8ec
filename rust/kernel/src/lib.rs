// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # EGADS Kernel
//!
//! A small pure-Rust geometry engine for the EGADS object model.
//!
//! It knows analytic curves (lines, circles, ellipses) and surfaces (planes,
//! cylinders, spheres, cones, tori), builds shared immutable B-rep shapes
//! with connectivity checks, and supports box primitives and linear
//! extrusion of planar faces. It is complete enough to drive the object
//! model end to end; it is not a production CAD kernel.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use egads_engine::{GeometryEngine, Primitive};
//! use egads_kernel::Kernel;
//!
//! let kernel = Kernel::default();
//! let solid = kernel.make_primitive(&Primitive::Box {
//!     corner: [0.0; 3],
//!     size: [1.0, 2.0, 3.0],
//! })?;
//! ```

pub mod construction;
pub mod curve;
pub mod features;
pub mod math;
pub mod serialization;
pub mod shape;
pub mod surface;
pub mod tessellate;
pub mod transform;
pub mod traversal;

use std::io::Write;

use egads_engine::*;

pub use curve::Curve;
pub use shape::{Shape, TShape};
pub use surface::Surface;

use crate::math::INFINITE;

/// The reference [`GeometryEngine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Kernel;

impl Kernel {
    pub fn new() -> Self {
        Self
    }
}

impl GeometryEngine for Kernel {
    type Shape = Shape;
    type Curve = Curve;
    type PCurve = Curve;
    type Surface = Surface;

    fn name(&self) -> &str {
        "egads-kernel"
    }

    // --- Geometry ---

    fn make_curve(&self, def: &CurveDef, basis: Option<&Curve>) -> Result<Curve> {
        Curve::from_def(def, basis)
    }

    fn make_pcurve(&self, def: &CurveDef, basis: Option<&Curve>) -> Result<Curve> {
        Curve::from_def(def, basis)
    }

    fn make_surface(&self, def: &SurfaceDef, basis: Option<Basis<&Curve, &Surface>>) -> Result<Surface> {
        match basis {
            None => Surface::from_def(def, None),
            Some(Basis::Surface(s)) => Surface::from_def(def, Some(s)),
            Some(Basis::Curve(_)) => Err(EngineError::Unsupported("swept surfaces")),
        }
    }

    fn describe_curve(&self, curve: &Curve) -> Result<(CurveDef, Option<Curve>)> {
        Ok(curve.describe())
    }

    fn describe_pcurve(&self, pcurve: &Curve) -> Result<(CurveDef, Option<Curve>)> {
        Ok(pcurve.describe())
    }

    fn describe_surface(&self, surface: &Surface) -> Result<(SurfaceDef, Option<Basis<Curve, Surface>>)> {
        let (def, basis) = surface.describe();
        Ok((def, basis.map(Basis::Surface)))
    }

    fn curve_range(&self, curve: &Curve) -> Result<Range> {
        Ok(curve.range())
    }

    fn pcurve_range(&self, pcurve: &Curve) -> Result<Range> {
        Ok(pcurve.range())
    }

    fn surface_range(&self, surface: &Surface) -> Result<Range> {
        Ok(surface.range())
    }

    fn eval_curve(&self, curve: &Curve, t: f64) -> Result<CurveEval> {
        Ok(curve.eval(t))
    }

    fn eval_pcurve(&self, pcurve: &Curve, t: f64) -> Result<CurveEval> {
        Ok(pcurve.eval(t))
    }

    fn eval_surface(&self, surface: &Surface, u: f64, v: f64) -> Result<SurfaceEval> {
        Ok(surface.eval(u, v))
    }

    fn invert_curve(&self, curve: &Curve, xyz: &Vec3) -> Result<(f64, Vec3)> {
        Ok(curve.invert(xyz))
    }

    fn invert_pcurve(&self, pcurve: &Curve, uv: &[f64; 2]) -> Result<(f64, Vec3)> {
        Ok(pcurve.invert(&[uv[0], uv[1], 0.0]))
    }

    fn invert_surface(&self, surface: &Surface, xyz: &Vec3) -> Result<([f64; 2], Vec3)> {
        Ok(surface.invert(xyz))
    }

    fn transform_curve(&self, curve: &Curve, m: &Matrix) -> Result<Curve> {
        Ok(curve.transformed(m))
    }

    fn transform_surface(&self, surface: &Surface, m: &Matrix) -> Result<Surface> {
        Ok(surface.transformed(m))
    }

    fn reverse_curve(&self, curve: &Curve) -> Result<Curve> {
        Ok(curve.reversed())
    }

    fn reverse_surface(&self, surface: &Surface) -> Result<Surface> {
        Ok(surface.reversed())
    }

    // --- Construction ---

    fn make_vertex(&self, xyz: &Vec3) -> Result<Shape> {
        construction::make_vertex(xyz)
    }

    fn make_edge(&self, curve: &Curve, start: &Shape, end: &Shape, t: [f64; 2]) -> Result<Shape> {
        construction::make_edge(curve, start, end, t)
    }

    fn make_degenerate_edge(&self, vertex: &Shape, t: [f64; 2]) -> Result<Shape> {
        construction::make_degenerate_edge(vertex, t)
    }

    fn make_wire(&self, edges: &[(Shape, Sense)]) -> Result<(Shape, bool)> {
        construction::make_wire(edges)
    }

    fn make_face(&self, surface: &Surface, wires: &[Shape], sense: Sense) -> Result<Shape> {
        construction::make_face(surface, wires, sense)
    }

    fn make_planar_face(&self, wire: &Shape) -> Result<Shape> {
        construction::make_planar_face(wire)
    }

    fn make_shell(&self, faces: &[Shape]) -> Result<Shape> {
        construction::make_shell(faces)
    }

    fn make_solid(&self, shells: &[Shape]) -> Result<Shape> {
        construction::make_solid(shells)
    }

    fn make_compound(&self, shapes: &[Shape]) -> Result<Shape> {
        construction::make_compound(shapes)
    }

    // --- Exploration ---

    fn shape_kind(&self, shape: &Shape) -> Result<ShapeKind> {
        Ok(shape.kind())
    }

    fn is_same(&self, a: &Shape, b: &Shape) -> bool {
        a.is_same(b)
    }

    fn map_shapes(&self, shape: &Shape, kind: ShapeKind) -> Result<Vec<Shape>> {
        Ok(traversal::map_shapes(shape, kind))
    }

    fn vertex_point(&self, vertex: &Shape) -> Result<Vec3> {
        vertex.point()
    }

    fn edge_vertices(&self, edge: &Shape) -> Result<(Shape, Shape)> {
        let (_, _, start, end) = edge.edge_data()?;
        Ok((start.clone(), end.clone()))
    }

    fn edge_curve(&self, edge: &Shape) -> Result<Option<Curve>> {
        let (curve, _, _, _) = edge.edge_data()?;
        Ok(curve.cloned())
    }

    fn edge_range(&self, edge: &Shape) -> Result<[f64; 2]> {
        let (_, range, _, _) = edge.edge_data()?;
        Ok(range)
    }

    fn is_degenerate(&self, edge: &Shape) -> Result<bool> {
        let (curve, _, _, _) = edge.edge_data()?;
        Ok(curve.is_none())
    }

    fn wire_edges(&self, wire: &Shape) -> Result<Vec<(Shape, Sense)>> {
        let (edges, _) = wire.wire_data()?;
        Ok(edges.iter().map(|e| (e.forward(), e.sense())).collect())
    }

    fn face_surface(&self, face: &Shape) -> Result<Surface> {
        let (surface, _) = face.face_data()?;
        Ok(surface.clone())
    }

    fn face_wires(&self, face: &Shape) -> Result<Vec<(Shape, bool)>> {
        let (_, wires) = face.face_data()?;
        Ok(wires.iter().enumerate().map(|(i, w)| (w.clone(), i == 0)).collect())
    }

    fn face_sense(&self, face: &Shape) -> Result<Sense> {
        face.face_data()?;
        Ok(face.sense())
    }

    fn shell_faces(&self, shell: &Shape) -> Result<Vec<Shape>> {
        Ok(shell.shell_faces()?.to_vec())
    }

    fn solid_shells(&self, solid: &Shape) -> Result<Vec<(Shape, bool)>> {
        let shells = solid.solid_shells()?;
        Ok(shells.iter().enumerate().map(|(i, s)| (s.clone(), i == 0)).collect())
    }

    fn is_closed(&self, shape: &Shape) -> Result<bool> {
        traversal::is_closed(shape)
    }

    fn model_bodies(&self, compound: &Shape) -> Result<Vec<Shape>> {
        if compound.kind() != ShapeKind::Compound {
            return Err(EngineError::Topology(format!(
                "model from a {:?}",
                compound.kind()
            )));
        }
        Ok(traversal::model_bodies(compound))
    }

    fn shape_range(&self, shape: &Shape) -> Result<Range> {
        match shape.kind() {
            ShapeKind::Edge => {
                let (curve, range, _, _) = shape.edge_data()?;
                Ok(Range::Curve {
                    t: range,
                    periodic: curve.is_some_and(Curve::is_periodic),
                })
            }
            ShapeKind::Face => face_range(shape),
            other => Err(EngineError::Topology(format!("no parametric range for a {other:?}"))),
        }
    }

    // --- Transformation ---

    fn transform_shape(&self, shape: &Shape, m: &Matrix) -> Result<Shape> {
        transform::transform_shape(shape, m)
    }

    fn reverse_shape(&self, shape: &Shape) -> Result<Shape> {
        transform::reverse_shape(shape)
    }

    // --- Features ---

    fn extrude(&self, shape: &Shape, distance: f64, direction: &Vec3) -> Result<Shape> {
        features::extrude(shape, distance, direction)
    }

    fn make_primitive(&self, primitive: &Primitive) -> Result<Shape> {
        match primitive {
            Primitive::Box { corner, size } => features::make_box(corner, size),
            _ => Err(EngineError::Unsupported("curved primitives")),
        }
    }

    // --- Tessellation ---

    fn discretize_edge(&self, edge: &Shape, params: &TessParams) -> Result<EdgeMesh> {
        tessellate::discretize_edge(edge, params)
    }

    fn triangulate_face(&self, face: &Shape, params: &TessParams) -> Result<FaceMesh> {
        tessellate::triangulate_face(face, params)
    }

    // --- I/O ---

    fn write_shape(&self, shape: &Shape, format: FileFormat, out: &mut dyn Write) -> Result<()> {
        match format {
            FileFormat::Native => serialization::write_native(shape, out),
            FileFormat::Step => Err(EngineError::Unsupported("STEP export")),
            FileFormat::Iges => Err(EngineError::Unsupported("IGES export")),
        }
    }

    fn read_shape(&self, format: FileFormat, data: &str) -> Result<Shape> {
        match format {
            FileFormat::Native => {
                let shape = serialization::from_json(data)?;
                tracing::debug!(kind = ?shape.kind(), "read native shape dump");
                Ok(shape)
            }
            FileFormat::Step => Err(EngineError::Unsupported("STEP import")),
            FileFormat::Iges => Err(EngineError::Unsupported("IGES import")),
        }
    }
}

/// Parameter bounds of a face, from its boundary samples.
fn face_range(face: &Shape) -> Result<Range> {
    let (surface, wires) = face.face_data()?;
    let mut u = [INFINITE, -INFINITE];
    let mut v = [INFINITE, -INFINITE];
    for wire in wires {
        for p in construction::wire_samples(wire)? {
            let (uv, _) = surface.invert(&math::arr(&p));
            u = [u[0].min(uv[0]), u[1].max(uv[0])];
            v = [v[0].min(uv[1]), v[1].max(uv[1])];
        }
    }
    if u[0] > u[1] || v[0] > v[1] {
        return Err(EngineError::Degenerate("face without boundary samples".into()));
    }
    let periodic = match surface.range() {
        Range::Surface { periodic, .. } => periodic,
        Range::Curve { .. } => [false, false],
    };
    Ok(Range::Surface { u, v, periodic })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn box_primitive_through_the_trait() {
        let kernel = Kernel::new();
        let solid = kernel
            .make_primitive(&Primitive::Box {
                corner: [0.0; 3],
                size: [1.0, 2.0, 3.0],
            })
            .unwrap();
        assert_eq!(kernel.shape_kind(&solid).unwrap(), ShapeKind::Solid);
        let shells = kernel.solid_shells(&solid).unwrap();
        assert_eq!(shells.len(), 1);
        assert!(shells[0].1);
        assert!(kernel.is_closed(&shells[0].0).unwrap());
    }

    #[test]
    fn unsupported_primitive() {
        let kernel = Kernel::new();
        let r = kernel.make_primitive(&Primitive::Sphere {
            center: [0.0; 3],
            radius: 1.0,
        });
        assert!(matches!(r, Err(EngineError::Unsupported(_))));
    }

    #[test]
    fn planar_face_range_spans_the_boundary() {
        let kernel = Kernel::new();
        let solid = kernel
            .make_primitive(&Primitive::Box {
                corner: [0.0; 3],
                size: [2.0, 2.0, 2.0],
            })
            .unwrap();
        let face = &kernel.map_shapes(&solid, ShapeKind::Face).unwrap()[0];
        match kernel.shape_range(face).unwrap() {
            Range::Surface { u, v, .. } => {
                assert_relative_eq!(u[1] - u[0], 2.0, epsilon = 1e-9);
                assert_relative_eq!(v[1] - v[0], 2.0, epsilon = 1e-9);
            }
            other => panic!("unexpected range {other:?}"),
        }
    }

    #[test]
    fn native_round_trip() {
        let kernel = Kernel::new();
        let solid = kernel
            .make_primitive(&Primitive::Box {
                corner: [0.0; 3],
                size: [1.0, 1.0, 1.0],
            })
            .unwrap();
        let compound = kernel.make_compound(&[solid]).unwrap();
        let mut buf = Vec::new();
        kernel.write_shape(&compound, FileFormat::Native, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let back = kernel.read_shape(FileFormat::Native, &text).unwrap();
        let bodies = kernel.model_bodies(&back).unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(kernel.shape_kind(&bodies[0]).unwrap(), ShapeKind::Solid);
    }
}
