// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Feature operations supported by the reference engine: linear extrusion
//! of planar polygonal faces, and box primitives built on it.

use egads_engine::{CurveDef, EngineError, Result, Sense, ShapeKind, Vec3};
use nalgebra::Vector3;
use rustc_hash::FxHashMap;

use crate::construction::*;
use crate::curve::Curve;
use crate::math::*;
use crate::shape::Shape;
use crate::surface::Surface;
use crate::transform::transform_shape;

/// Axis-aligned box. Negative sizes extend from `corner` in the negative
/// direction.
pub fn make_box(corner: &Vec3, size: &Vec3) -> Result<Shape> {
    if size.iter().any(|s| s.abs() < TOLERANCE) {
        return Err(EngineError::Degenerate("box with zero extent".into()));
    }
    let lo: Vec<f64> = (0..3).map(|i| corner[i].min(corner[i] + size[i])).collect();
    let hi: Vec<f64> = (0..3).map(|i| corner[i].max(corner[i] + size[i])).collect();

    let corners = [
        [lo[0], lo[1], lo[2]],
        [hi[0], lo[1], lo[2]],
        [hi[0], hi[1], lo[2]],
        [lo[0], hi[1], lo[2]],
    ];
    let vertices = corners
        .iter()
        .map(make_vertex)
        .collect::<Result<Vec<_>>>()?;
    let mut uses = Vec::with_capacity(4);
    for i in 0..4 {
        uses.push((line_edge(&vertices[i], &vertices[(i + 1) % 4])?, Sense::Forward));
    }
    let (wire, _) = make_wire(&uses)?;
    let base = make_planar_face(&wire)?;
    extrude(&base, hi[2] - lo[2], &[0.0, 0.0, 1.0])
}

/// Sweeps a planar face along `direction` by `distance` into a solid.
pub fn extrude(face: &Shape, distance: f64, direction: &Vec3) -> Result<Shape> {
    if face.kind() != ShapeKind::Face {
        return Err(EngineError::Unsupported("extrusion of non-face shapes"));
    }
    if distance.abs() < TOLERANCE {
        return Err(EngineError::Degenerate("zero extrusion distance".into()));
    }
    let (surface, wires) = face.face_data()?;
    if !surface.is_plane() {
        return Err(EngineError::Unsupported("extrusion of curved faces"));
    }
    let normal = surface
        .normal(0.0, 0.0)
        .ok_or_else(|| EngineError::Degenerate("face normal".into()))?;
    let normal = if face.is_reversed() { -normal } else { normal };
    let offset: Vector3<f64> = unit(&v3(direction), "extrusion direction")? * distance;
    let along_normal = normal.dot(&offset) > 0.0;

    let shift = [
        1.0, 0.0, 0.0, offset.x, //
        0.0, 1.0, 0.0, offset.y, //
        0.0, 0.0, 1.0, offset.z,
    ];
    let top = transform_shape(face, &shift)?;

    // Rails: one straight edge per boundary vertex, bottom to top.
    let bottom_vertices = crate::traversal::map_shapes(face, ShapeKind::Vertex);
    let top_vertices = crate::traversal::map_shapes(&top, ShapeKind::Vertex);
    let mut rails: FxHashMap<usize, Shape> = FxHashMap::default();
    for (b, t) in bottom_vertices.iter().zip(&top_vertices) {
        rails.insert(b.id(), line_edge(b, t)?);
    }

    let bottom_edges = crate::traversal::map_shapes(face, ShapeKind::Edge);
    let top_edges = crate::traversal::map_shapes(&top, ShapeKind::Edge);
    let lifted: FxHashMap<usize, Shape> = bottom_edges
        .iter()
        .zip(&top_edges)
        .map(|(b, t)| (b.id(), t.clone()))
        .collect();

    let mut faces = Vec::new();
    faces.push(if along_normal { face.reversed() } else { face.clone() });
    faces.push(if along_normal { top.clone() } else { top.reversed() });

    for wire in wires {
        let (edges, _) = wire.wire_data()?;
        for edge in edges {
            let (curve, _, _, _) = edge.edge_data()?;
            match curve {
                Some(c) if c.is_line() => {}
                Some(_) => return Err(EngineError::Unsupported("extrusion of curved edges")),
                None => continue,
            }
            let (p, q) = edge.use_vertices()?;
            let rail_p = lookup(&rails, &p)?;
            let rail_q = lookup(&rails, &q)?;
            let upper = lookup(&lifted, edge)?;
            let (side_wire, _) = make_wire(&[
                (edge.forward(), edge.sense()),
                (rail_q.clone(), Sense::Forward),
                (upper.clone(), edge.sense().reversed()),
                (rail_p.clone(), Sense::Reverse),
            ])?;

            let pp = v3(&p.point()?);
            let x = unit(&(v3(&q.point()?) - pp), "side face edge")?;
            let y = offset.normalize();
            let plane = Surface::Plane {
                placement: Placement {
                    origin: arr(&pp),
                    x: arr(&x),
                    y: arr(&y),
                    z: arr(&x.cross(&y)),
                },
            };
            let sense = if along_normal {
                Sense::Forward
            } else {
                Sense::Reverse
            };
            faces.push(make_face(&plane, &[side_wire], sense)?);
        }
    }

    let shell = make_shell(&faces)?;
    make_solid(&[shell])
}

/// Straight edge between two vertices, parameterized by arc length.
pub fn line_edge(a: &Shape, b: &Shape) -> Result<Shape> {
    let pa = a.point()?;
    let pb = b.point()?;
    let len = distance(&pa, &pb);
    let line = Curve::from_def(
        &CurveDef::Line {
            origin: pa,
            direction: [pb[0] - pa[0], pb[1] - pa[1], pb[2] - pa[2]],
        },
        None,
    )?;
    make_edge(&line, a, b, [0.0, len])
}

fn lookup<'a>(map: &'a FxHashMap<usize, Shape>, key: &Shape) -> Result<&'a Shape> {
    map.get(&key.id())
        .ok_or_else(|| EngineError::Topology("extrusion lost track of a boundary entity".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traversal::{map_shapes, shell_is_closed};

    #[test]
    fn negative_box_size_is_normalized() {
        let solid = make_box(&[1.0, 1.0, 1.0], &[-1.0, -1.0, -1.0]).unwrap();
        let points: Vec<Vec3> = map_shapes(&solid, ShapeKind::Vertex)
            .iter()
            .map(|v| v.point().unwrap())
            .collect();
        assert!(points.iter().all(|p| p.iter().all(|c| (0.0..=1.0).contains(c))));
    }

    #[test]
    fn zero_extent_box_is_degenerate() {
        assert!(matches!(
            make_box(&[0.0; 3], &[1.0, 0.0, 1.0]),
            Err(EngineError::Degenerate(_))
        ));
    }

    #[test]
    fn extruded_face_is_a_closed_solid() {
        let solid = make_box(&[0.0; 3], &[2.0, 1.0, 1.0]).unwrap();
        let face = map_shapes(&solid, ShapeKind::Face)[0].clone();
        let prism = extrude(&face, 3.0, &[0.0, 0.0, -1.0]).unwrap();
        let shell = &map_shapes(&prism, ShapeKind::Shell)[0];
        assert!(shell_is_closed(shell).unwrap());
        assert_eq!(map_shapes(&prism, ShapeKind::Face).len(), 6);
    }
}
