// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Affine transformation of shapes.
//!
//! Shapes are immutable, so a transform rebuilds the whole tree. Nodes shared
//! in the input stay shared in the output, which keeps a transformed solid
//! closed and its maps the same size and order.

use std::sync::Arc;

use egads_engine::{apply_point, Matrix, Result};
use rustc_hash::FxHashMap;

use crate::shape::{Shape, TShape};

/// Rebuilds `shape` under `m`. The result never shares nodes with the input.
pub fn transform_shape(shape: &Shape, m: &Matrix) -> Result<Shape> {
    let mut memo: FxHashMap<usize, Arc<TShape>> = FxHashMap::default();
    Ok(rebuild(shape, m, &mut memo))
}

fn rebuild(shape: &Shape, m: &Matrix, memo: &mut FxHashMap<usize, Arc<TShape>>) -> Shape {
    if let Some(node) = memo.get(&shape.id()) {
        return Shape::from_node(Arc::clone(node), shape.is_reversed());
    }
    let all = |items: &[Shape], memo: &mut FxHashMap<usize, Arc<TShape>>| -> Vec<Shape> {
        items.iter().map(|s| rebuild(s, m, memo)).collect()
    };
    let node = match shape.node() {
        TShape::Vertex { point } => TShape::Vertex {
            point: apply_point(m, point),
        },
        TShape::Edge {
            curve,
            range,
            start,
            end,
        } => {
            let range = match curve {
                Some(c) => [
                    c.transformed_parameter(m, range[0]),
                    c.transformed_parameter(m, range[1]),
                ],
                None => *range,
            };
            TShape::Edge {
                curve: curve.as_ref().map(|c| c.transformed(m)),
                range,
                start: rebuild(start, m, memo),
                end: rebuild(end, m, memo),
            }
        }
        TShape::Wire { edges, closed } => TShape::Wire {
            edges: all(edges, memo),
            closed: *closed,
        },
        TShape::Face { surface, wires } => TShape::Face {
            surface: surface.transformed(m),
            wires: all(wires, memo),
        },
        TShape::Shell { faces } => TShape::Shell {
            faces: all(faces, memo),
        },
        TShape::Solid { shells } => TShape::Solid {
            shells: all(shells, memo),
        },
        TShape::Compound { children } => TShape::Compound {
            children: all(children, memo),
        },
    };
    let node = Arc::new(node);
    memo.insert(shape.id(), Arc::clone(&node));
    Shape::from_node(node, shape.is_reversed())
}

/// Orientation flip. Edges, faces and shells keep their node; a wire is
/// rebuilt so that its uses run the other way.
pub fn reverse_shape(shape: &Shape) -> Result<Shape> {
    match shape.node() {
        TShape::Wire { edges, closed } => {
            let edges = edges.iter().rev().map(Shape::reversed).collect();
            Ok(Shape::new(TShape::Wire {
                edges,
                closed: *closed,
            }))
        }
        TShape::Shell { faces } => Ok(Shape::new(TShape::Shell {
            faces: faces.iter().map(Shape::reversed).collect(),
        })),
        _ => Ok(shape.reversed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::make_box;
    use crate::traversal::{map_shapes, shell_is_closed};
    use approx::assert_relative_eq;
    use egads_engine::ShapeKind;

    const SHIFT: Matrix = [
        1.0, 0.0, 0.0, 10.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0,
    ];

    #[test]
    fn translation_moves_vertices() {
        let solid = make_box(&[0.0; 3], &[1.0, 1.0, 1.0]).unwrap();
        let moved = transform_shape(&solid, &SHIFT).unwrap();
        for v in map_shapes(&moved, ShapeKind::Vertex) {
            assert!(v.point().unwrap()[0] >= 10.0 - 1e-12);
        }
    }

    #[test]
    fn sharing_survives_transform() {
        let solid = make_box(&[0.0; 3], &[1.0, 1.0, 1.0]).unwrap();
        let moved = transform_shape(&solid, &SHIFT).unwrap();
        assert_eq!(map_shapes(&moved, ShapeKind::Edge).len(), 12);
        let shell = &map_shapes(&moved, ShapeKind::Shell)[0];
        assert!(shell_is_closed(shell).unwrap());
        assert!(!moved.is_same(&solid));
    }

    #[test]
    fn scaling_stretches_line_ranges() {
        let solid = make_box(&[0.0; 3], &[1.0, 1.0, 1.0]).unwrap();
        let scale: Matrix = [2.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0];
        let big = transform_shape(&solid, &scale).unwrap();
        let edge = &map_shapes(&big, ShapeKind::Edge)[0];
        let (_, range, _, _) = edge.edge_data().unwrap();
        assert_relative_eq!(range[1] - range[0], 2.0, epsilon = 1e-12);
    }
}
