// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Downward traversal of shapes.
//!
//! Maps are indexed in first-visit depth-first order, and shared sub-shapes
//! appear once. Identity is the shared node, so an edge used twice by a
//! closed shell is a single map entry.

use egads_engine::{Result, ShapeKind};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::shape::{Shape, TShape};

/// Unique sub-shapes of `kind` below (and including) `shape`.
pub fn map_shapes(shape: &Shape, kind: ShapeKind) -> Vec<Shape> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    collect(shape, kind, &mut seen, &mut out);
    out
}

fn collect(shape: &Shape, kind: ShapeKind, seen: &mut FxHashSet<usize>, out: &mut Vec<Shape>) {
    if shape.kind() == kind {
        if seen.insert(shape.id()) {
            out.push(shape.forward());
        }
        return;
    }
    // Nothing of `kind` lives below a lower-dimensional entity.
    if kind > shape.kind() && shape.kind() != ShapeKind::Compound {
        return;
    }
    for child in shape.children() {
        collect(&child, kind, seen, out);
    }
}

/// `true` when every non-degenerate edge of the shell is used exactly twice.
pub fn shell_is_closed(shell: &Shape) -> Result<bool> {
    let mut uses: FxHashMap<usize, usize> = FxHashMap::default();
    for face in shell.shell_faces()? {
        let (_, wires) = face.face_data()?;
        for wire in wires {
            let (edges, _) = wire.wire_data()?;
            for edge in edges {
                let (curve, _, _, _) = edge.edge_data()?;
                if curve.is_none() {
                    continue;
                }
                *uses.entry(edge.id()).or_insert(0) += 1;
            }
        }
    }
    Ok(!uses.is_empty() && uses.values().all(|&n| n == 2))
}

/// Closure of an edge, wire or shell. Faces and solids count as closed.
pub fn is_closed(shape: &Shape) -> Result<bool> {
    match shape.node() {
        TShape::Edge { start, end, .. } => Ok(start.is_same(end)),
        TShape::Wire { closed, .. } => Ok(*closed),
        TShape::Shell { .. } => shell_is_closed(shape),
        TShape::Face { .. } | TShape::Solid { .. } => Ok(true),
        _ => Ok(false),
    }
}

/// Bodies of a compound in export order: free wires, free faces, free
/// shells, then solids. Nested compounds are flattened.
pub fn model_bodies(compound: &Shape) -> Vec<Shape> {
    let mut flat = Vec::new();
    flatten(compound, &mut flat);
    let mut ordered = Vec::with_capacity(flat.len());
    for kind in [ShapeKind::Wire, ShapeKind::Face, ShapeKind::Shell, ShapeKind::Solid] {
        ordered.extend(flat.iter().filter(|s| s.kind() == kind).cloned());
    }
    ordered
}

fn flatten(shape: &Shape, out: &mut Vec<Shape>) {
    if shape.kind() == ShapeKind::Compound {
        for child in shape.children() {
            flatten(&child, out);
        }
    } else {
        out.push(shape.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::make_box;

    #[test]
    fn box_counts() {
        let solid = make_box(&[0.0; 3], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(map_shapes(&solid, ShapeKind::Vertex).len(), 8);
        assert_eq!(map_shapes(&solid, ShapeKind::Edge).len(), 12);
        assert_eq!(map_shapes(&solid, ShapeKind::Wire).len(), 6);
        assert_eq!(map_shapes(&solid, ShapeKind::Face).len(), 6);
        assert_eq!(map_shapes(&solid, ShapeKind::Shell).len(), 1);
    }

    #[test]
    fn box_shell_is_closed() {
        let solid = make_box(&[0.0; 3], &[1.0, 1.0, 1.0]).unwrap();
        let shell = &map_shapes(&solid, ShapeKind::Shell)[0];
        assert!(shell_is_closed(shell).unwrap());
    }

    #[test]
    fn model_bodies_order() {
        let solid = make_box(&[0.0; 3], &[1.0, 1.0, 1.0]).unwrap();
        let face = map_shapes(&solid, ShapeKind::Face)[0].clone();
        let compound = crate::construction::make_compound(&[solid, face]).unwrap();
        let bodies = model_bodies(&compound);
        assert_eq!(bodies[0].kind(), ShapeKind::Face);
        assert_eq!(bodies[1].kind(), ShapeKind::Solid);
    }
}
