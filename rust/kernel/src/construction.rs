// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction of shapes with validation.
//!
//! Every constructor checks that its inputs are of the right kind and
//! geometrically consistent before the node is created: edge end points must
//! lie on the curve, wires must be connected end to end, faces need closed
//! boundaries and solids need closed shells.

use egads_engine::{EngineError, Result, Sense, ShapeKind, Vec3};
use nalgebra::Vector3;

use crate::curve::Curve;
use crate::math::*;
use crate::shape::{wrong_kind, Shape, TShape};
use crate::surface::Surface;
use crate::traversal::shell_is_closed;

pub fn make_vertex(xyz: &Vec3) -> Result<Shape> {
    if xyz.iter().any(|c| !c.is_finite()) {
        return Err(EngineError::Construction("vertex with non-finite coordinates".into()));
    }
    Ok(Shape::new(TShape::Vertex { point: *xyz }))
}

/// Creates an edge on `curve` over `t`, bounded by two vertices.
///
/// The vertices must coincide with the curve ends within a relaxed
/// tolerance, mirroring how kernels widen precision to the input.
pub fn make_edge(curve: &Curve, start: &Shape, end: &Shape, t: [f64; 2]) -> Result<Shape> {
    expect_kind(start, ShapeKind::Vertex)?;
    expect_kind(end, ShapeKind::Vertex)?;
    if t[0] >= t[1] {
        return Err(EngineError::Construction(format!(
            "edge range {} >= {}",
            t[0], t[1]
        )));
    }
    let p0 = curve.eval(t[0]).point;
    let p1 = curve.eval(t[1]).point;
    let tol = 1.0e-4_f64.max(TOLERANCE * curve.length(t[0], t[1]));
    if distance(&p0, &start.point()?) > tol || distance(&p1, &end.point()?) > tol {
        return Err(EngineError::Construction(
            "edge vertices do not lie on the curve ends".into(),
        ));
    }
    if start.is_same(end) && distance(&p0, &p1) > tol {
        return Err(EngineError::Construction(
            "single-node edge on an open curve".into(),
        ));
    }
    Ok(Shape::new(TShape::Edge {
        curve: Some(curve.clone()),
        range: t,
        start: start.forward(),
        end: end.forward(),
    }))
}

pub fn make_degenerate_edge(vertex: &Shape, t: [f64; 2]) -> Result<Shape> {
    expect_kind(vertex, ShapeKind::Vertex)?;
    if t[0] >= t[1] {
        return Err(EngineError::Construction("degenerate edge with empty range".into()));
    }
    Ok(Shape::new(TShape::Edge {
        curve: None,
        range: t,
        start: vertex.forward(),
        end: vertex.forward(),
    }))
}

/// Creates a wire from edge uses.
///
/// Consecutive uses must share a vertex: the last vertex of use `i` is the
/// first vertex of use `i + 1`. The wire is closed when the chain returns to
/// its first vertex.
pub fn make_wire(edges: &[(Shape, Sense)]) -> Result<(Shape, bool)> {
    if edges.is_empty() {
        return Err(EngineError::Topology("wire must have at least one edge".into()));
    }
    for (edge, _) in edges {
        expect_kind(edge, ShapeKind::Edge)?;
    }

    let uses: Vec<Shape> = edges.iter().map(|(e, s)| e.oriented(*s)).collect();
    for i in 1..uses.len() {
        let (_, prev_end) = uses[i - 1].use_vertices()?;
        let (curr_start, _) = uses[i].use_vertices()?;
        if !prev_end.is_same(&curr_start) {
            return Err(EngineError::Topology(format!(
                "wire edges are not connected: edge {} endpoint does not match edge {} startpoint",
                i - 1,
                i
            )));
        }
    }

    let (first, _) = uses[0].use_vertices()?;
    let (_, last) = uses[uses.len() - 1].use_vertices()?;
    let closed = first.is_same(&last);
    Ok((
        Shape::new(TShape::Wire {
            edges: uses,
            closed,
        }),
        closed,
    ))
}

pub fn make_face(surface: &Surface, wires: &[Shape], sense: Sense) -> Result<Shape> {
    if wires.is_empty() {
        return Err(EngineError::Topology("face without boundary".into()));
    }
    for wire in wires {
        let (_, closed) = wire.wire_data()?;
        if !closed {
            return Err(EngineError::Construction("face boundary wire is open".into()));
        }
    }
    let face = Shape::new(TShape::Face {
        surface: surface.clone(),
        wires: wires.iter().map(Shape::forward).collect(),
    });
    Ok(face.oriented(sense))
}

/// Fills a closed planar wire with a plane whose normal follows the wire
/// winding (Newell's method over sampled boundary points).
pub fn make_planar_face(wire: &Shape) -> Result<Shape> {
    let (_, closed) = wire.wire_data()?;
    if !closed {
        return Err(EngineError::Construction("planar face from an open wire".into()));
    }
    let points = wire_samples(wire)?;
    if points.len() < 3 {
        return Err(EngineError::Degenerate("wire encloses no area".into()));
    }

    let mut normal = Vector3::new(0.0, 0.0, 0.0);
    let n = points.len();
    for i in 0..n {
        let curr = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    let normal = unit(&normal, "face normal")?;

    let origin = points[0];
    let mut x_axis = Vector3::zeros();
    for p in &points[1..] {
        let d = p - origin;
        let d = d - normal * d.dot(&normal);
        if d.norm() > TOLERANCE {
            x_axis = d.normalize();
            break;
        }
    }
    let x_axis = unit(&x_axis, "face x axis")?;
    let y_axis = normal.cross(&x_axis);

    let span = points
        .iter()
        .map(|p| (p - origin).norm())
        .fold(0.0_f64, f64::max);
    let tol = 1.0e-6_f64.max(1.0e-6 * span);
    if points.iter().any(|p| (p - origin).dot(&normal).abs() > tol) {
        return Err(EngineError::Construction("wire is not planar".into()));
    }

    let placement = Placement {
        origin: arr(&origin),
        x: arr(&x_axis),
        y: arr(&y_axis),
        z: arr(&normal),
    };
    make_face(&Surface::Plane { placement }, &[wire.clone()], Sense::Forward)
}

pub fn make_shell(faces: &[Shape]) -> Result<Shape> {
    if faces.is_empty() {
        return Err(EngineError::Topology("shell must have at least one face".into()));
    }
    for face in faces {
        expect_kind(face, ShapeKind::Face)?;
    }
    Ok(Shape::new(TShape::Shell {
        faces: faces.to_vec(),
    }))
}

pub fn make_solid(shells: &[Shape]) -> Result<Shape> {
    if shells.is_empty() {
        return Err(EngineError::Topology("solid without shells".into()));
    }
    for shell in shells {
        expect_kind(shell, ShapeKind::Shell)?;
        if !shell_is_closed(shell)? {
            return Err(EngineError::Construction("solid bounded by an open shell".into()));
        }
    }
    Ok(Shape::new(TShape::Solid {
        shells: shells.iter().map(Shape::forward).collect(),
    }))
}

pub fn make_compound(shapes: &[Shape]) -> Result<Shape> {
    Ok(Shape::new(TShape::Compound {
        children: shapes.to_vec(),
    }))
}

/// Ordered boundary samples of a wire, following the edge uses.
pub(crate) fn wire_samples(wire: &Shape) -> Result<Vec<Vector3<f64>>> {
    const PER_CURVED_EDGE: usize = 16;
    let (edges, _) = wire.wire_data()?;
    let mut points = Vec::new();
    for edge in edges {
        let (curve, range, _, _) = edge.edge_data()?;
        let Some(curve) = curve else { continue };
        let n = if curve.is_line() { 1 } else { PER_CURVED_EDGE };
        for i in 0..n {
            let f = i as f64 / n as f64;
            let t = if edge.is_reversed() {
                range[1] - (range[1] - range[0]) * f
            } else {
                range[0] + (range[1] - range[0]) * f
            };
            points.push(v3(&curve.eval(t).point));
        }
    }
    Ok(points)
}

pub(crate) fn expect_kind(shape: &Shape, kind: ShapeKind) -> Result<()> {
    if shape.kind() == kind {
        Ok(())
    } else {
        Err(wrong_kind(&format!("{kind:?}").to_lowercase(), shape.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egads_engine::CurveDef;

    fn segment(a: &Shape, b: &Shape) -> Shape {
        let pa = a.point().unwrap();
        let pb = b.point().unwrap();
        let dir = [pb[0] - pa[0], pb[1] - pa[1], pb[2] - pa[2]];
        let len = distance(&pa, &pb);
        let line = Curve::from_def(
            &CurveDef::Line {
                origin: pa,
                direction: dir,
            },
            None,
        )
        .unwrap();
        make_edge(&line, a, b, [0.0, len]).unwrap()
    }

    fn square() -> Shape {
        let v: Vec<Shape> = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]
            .iter()
            .map(|p| make_vertex(p).unwrap())
            .collect();
        let edges: Vec<(Shape, Sense)> = (0..4)
            .map(|i| (segment(&v[i], &v[(i + 1) % 4]), Sense::Forward))
            .collect();
        make_wire(&edges).unwrap().0
    }

    #[test]
    fn closed_square_wire() {
        let w = square();
        let (edges, closed) = w.wire_data().unwrap();
        assert_eq!(edges.len(), 4);
        assert!(closed);
    }

    #[test]
    fn disconnected_wire_is_rejected() {
        let a = make_vertex(&[0.0, 0.0, 0.0]).unwrap();
        let b = make_vertex(&[1.0, 0.0, 0.0]).unwrap();
        let c = make_vertex(&[2.0, 0.0, 0.0]).unwrap();
        let d = make_vertex(&[3.0, 0.0, 0.0]).unwrap();
        let r = make_wire(&[(segment(&a, &b), Sense::Forward), (segment(&c, &d), Sense::Forward)]);
        assert!(matches!(r, Err(EngineError::Topology(_))));
    }

    #[test]
    fn reversed_use_connects() {
        let a = make_vertex(&[0.0, 0.0, 0.0]).unwrap();
        let b = make_vertex(&[1.0, 0.0, 0.0]).unwrap();
        let c = make_vertex(&[1.0, 1.0, 0.0]).unwrap();
        let r = make_wire(&[
            (segment(&a, &b), Sense::Forward),
            (segment(&c, &b), Sense::Reverse),
        ]);
        let (_, closed) = r.unwrap();
        assert!(!closed);
    }

    #[test]
    fn edge_off_curve_is_rejected() {
        let a = make_vertex(&[0.0, 0.0, 0.0]).unwrap();
        let b = make_vertex(&[1.0, 5.0, 0.0]).unwrap();
        let line = Curve::from_def(
            &CurveDef::Line {
                origin: [0.0; 3],
                direction: [1.0, 0.0, 0.0],
            },
            None,
        )
        .unwrap();
        assert!(make_edge(&line, &a, &b, [0.0, 1.0]).is_err());
    }

    #[test]
    fn planar_face_normal_follows_winding() {
        let face = make_planar_face(&square()).unwrap();
        let (surface, _) = face.face_data().unwrap();
        let n = surface.normal(0.0, 0.0).unwrap();
        approx::assert_relative_eq!(n.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn open_shell_cannot_bound_a_solid() {
        let face = make_planar_face(&square()).unwrap();
        let shell = make_shell(&[face]).unwrap();
        assert!(matches!(make_solid(&[shell]), Err(EngineError::Construction(_))));
    }
}
