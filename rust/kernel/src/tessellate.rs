// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edge sampling and planar face triangulation.
//!
//! Wrapper around earcutr for faces lying on a plane; boundary polygons are
//! taken from the same edge sampling used for edge tessellations, so face and
//! edge points agree along shared boundaries.

use egads_engine::{EdgeMesh, EngineError, FaceMesh, Result, TessParams};

use crate::shape::Shape;

/// Samples an edge between its end vertices.
///
/// Straight edges are split only by `max_length`; curved edges are also split
/// so that no segment turns by more than `angle` degrees or deviates from the
/// curve by more than `chord`.
pub fn discretize_edge(edge: &Shape, params: &TessParams) -> Result<EdgeMesh> {
    let (curve, range, start, end) = edge.edge_data()?;
    let Some(curve) = curve else {
        let p = start.point()?;
        return Ok(EdgeMesh {
            xyz: vec![p, p],
            t: vec![range[0], range[1]],
        });
    };

    let length = curve.length(range[0], range[1]);
    let mut segments = 1usize;
    if params.max_length > 0.0 {
        segments = segments.max((length / params.max_length).ceil() as usize);
    }
    if !curve.is_line() {
        let span = range[1] - range[0];
        let angle = if params.angle > 0.0 {
            params.angle.to_radians()
        } else {
            15.0_f64.to_radians()
        };
        segments = segments.max((span / angle).ceil() as usize);
        if params.chord > 0.0 && span > 0.0 {
            // Circle-equivalent radius from length and turning.
            let radius = length / span;
            if params.chord < radius {
                let step = 2.0 * (1.0 - params.chord / radius).acos();
                if step > 0.0 {
                    segments = segments.max((span / step).ceil() as usize);
                }
            }
        }
    }

    let mut mesh = EdgeMesh {
        xyz: Vec::with_capacity(segments + 1),
        t: Vec::with_capacity(segments + 1),
    };
    for i in 0..=segments {
        let t = range[0] + (range[1] - range[0]) * i as f64 / segments as f64;
        let p = if i == 0 {
            start.point()?
        } else if i == segments {
            end.point()?
        } else {
            curve.eval(t).point
        };
        mesh.xyz.push(p);
        mesh.t.push(t);
    }
    Ok(mesh)
}

/// Triangulates a planar face with holes.
pub fn triangulate_face(face: &Shape, params: &TessParams) -> Result<FaceMesh> {
    let (surface, wires) = face.face_data()?;
    if !surface.is_plane() {
        return Err(EngineError::Unsupported("triangulation of curved faces"));
    }

    let mut mesh = FaceMesh::default();
    let mut flat = Vec::new();
    let mut holes = Vec::new();
    for (i, wire) in wires.iter().enumerate() {
        if i > 0 {
            holes.push(mesh.xyz.len());
        }
        let (edges, _) = wire.wire_data()?;
        for edge in edges {
            let sampled = discretize_edge(edge, params)?;
            let mut points = sampled.xyz;
            if edge.is_reversed() {
                points.reverse();
            }
            // Drop the last point; it starts the next edge.
            points.pop();
            for p in points {
                let (uv, _) = surface.invert(&p);
                flat.push(uv[0]);
                flat.push(uv[1]);
                mesh.uv.push(uv);
                mesh.xyz.push(p);
            }
        }
    }
    if mesh.xyz.len() < 3 {
        return Err(EngineError::Degenerate("face boundary has fewer than 3 points".into()));
    }

    let indices = earcutr::earcut(&flat, &holes, 2)
        .map_err(|e| EngineError::Geometry(format!("triangulation failed: {e:?}")))?;
    for tri in indices.chunks_exact(3) {
        if face.is_reversed() {
            mesh.tris.push([tri[0], tri[2], tri[1]]);
        } else {
            mesh.tris.push([tri[0], tri[1], tri[2]]);
        }
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::make_box;
    use crate::traversal::map_shapes;
    use egads_engine::ShapeKind;

    #[test]
    fn long_edges_are_split() {
        let solid = make_box(&[0.0; 3], &[4.0, 1.0, 1.0]).unwrap();
        let edge = &map_shapes(&solid, ShapeKind::Edge)[0];
        let mesh = discretize_edge(edge, &TessParams::new(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(mesh.xyz.len(), 5);
        assert_eq!(mesh.t.len(), 5);
    }

    #[test]
    fn square_face_gives_two_triangles() {
        let solid = make_box(&[0.0; 3], &[1.0, 1.0, 1.0]).unwrap();
        let face = &map_shapes(&solid, ShapeKind::Face)[0];
        let mesh = triangulate_face(face, &TessParams::new(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(mesh.xyz.len(), 4);
        assert_eq!(mesh.tris.len(), 2);
    }
}
