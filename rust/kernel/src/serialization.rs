// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON dump of shapes, the kernel's native exchange format.
//!
//! Shared nodes are flattened post-order to sequential ids, so every
//! reference points at an earlier entry and sharing survives a round trip.
//! Curves and surfaces are stored by value.

use std::io::Write;
use std::sync::Arc;

use egads_engine::{EngineError, Result, Vec3};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::curve::Curve;
use crate::shape::{Shape, TShape};
use crate::surface::Surface;

/// Format revision written into every dump.
pub const DUMP_VERSION: u32 = 1;

/// Serializable form of a shape tree.
#[derive(Debug, Serialize, Deserialize)]
pub struct ShapeDump {
    pub version: u32,
    pub nodes: Vec<NodeDump>,
    pub root: Ref,
}

/// Oriented reference to an entry of [`ShapeDump::nodes`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ref {
    pub id: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reversed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeDump {
    Vertex {
        point: Vec3,
    },
    Edge {
        #[serde(skip_serializing_if = "Option::is_none")]
        curve: Option<Curve>,
        range: [f64; 2],
        start: Ref,
        end: Ref,
    },
    Wire {
        edges: Vec<Ref>,
        closed: bool,
    },
    Face {
        surface: Surface,
        wires: Vec<Ref>,
    },
    Shell {
        faces: Vec<Ref>,
    },
    Solid {
        shells: Vec<Ref>,
    },
    Compound {
        children: Vec<Ref>,
    },
}

/// Serializes a shape to a JSON string.
pub fn to_json(shape: &Shape) -> Result<String> {
    let dump = to_dump(shape);
    serde_json::to_string_pretty(&dump).map_err(|e| EngineError::Format(e.to_string()))
}

/// Writes the JSON dump followed by a newline.
pub fn write_native(shape: &Shape, out: &mut dyn Write) -> Result<()> {
    let text = to_json(shape)?;
    out.write_all(text.as_bytes())?;
    out.write_all(b"\n")?;
    Ok(())
}

/// Rebuilds a shape from a JSON dump.
pub fn from_json(text: &str) -> Result<Shape> {
    let dump: ShapeDump =
        serde_json::from_str(text).map_err(|e| EngineError::Format(e.to_string()))?;
    if dump.version != DUMP_VERSION {
        return Err(EngineError::Format(format!(
            "unsupported dump version {}",
            dump.version
        )));
    }

    let mut built: Vec<Arc<TShape>> = Vec::with_capacity(dump.nodes.len());
    for (index, node) in dump.nodes.into_iter().enumerate() {
        let resolve = |r: &Ref| -> Result<Shape> {
            if r.id >= index {
                return Err(EngineError::Format(format!(
                    "node {index} refers forward to node {}",
                    r.id
                )));
            }
            Ok(Shape::from_node(Arc::clone(&built[r.id]), r.reversed))
        };
        let all = |refs: &[Ref]| refs.iter().map(&resolve).collect::<Result<Vec<_>>>();
        let tshape = match node {
            NodeDump::Vertex { point } => TShape::Vertex { point },
            NodeDump::Edge {
                curve,
                range,
                start,
                end,
            } => TShape::Edge {
                curve,
                range,
                start: resolve(&start)?,
                end: resolve(&end)?,
            },
            NodeDump::Wire { edges, closed } => TShape::Wire {
                edges: all(&edges)?,
                closed,
            },
            NodeDump::Face { surface, wires } => TShape::Face {
                surface,
                wires: all(&wires)?,
            },
            NodeDump::Shell { faces } => TShape::Shell { faces: all(&faces)? },
            NodeDump::Solid { shells } => TShape::Solid {
                shells: all(&shells)?,
            },
            NodeDump::Compound { children } => TShape::Compound {
                children: all(&children)?,
            },
        };
        built.push(Arc::new(tshape));
    }

    let root = built
        .get(dump.root.id)
        .ok_or_else(|| EngineError::Format(format!("root {} out of range", dump.root.id)))?;
    Ok(Shape::from_node(Arc::clone(root), dump.root.reversed))
}

fn to_dump(shape: &Shape) -> ShapeDump {
    let mut ids: FxHashMap<usize, usize> = FxHashMap::default();
    let mut nodes = Vec::new();
    let root = flatten(shape, &mut ids, &mut nodes);
    ShapeDump {
        version: DUMP_VERSION,
        nodes,
        root,
    }
}

fn flatten(shape: &Shape, ids: &mut FxHashMap<usize, usize>, nodes: &mut Vec<NodeDump>) -> Ref {
    if let Some(&id) = ids.get(&shape.id()) {
        return Ref {
            id,
            reversed: shape.is_reversed(),
        };
    }
    let all = |items: &[Shape], ids: &mut FxHashMap<usize, usize>, nodes: &mut Vec<NodeDump>| {
        items.iter().map(|s| flatten(s, ids, nodes)).collect::<Vec<_>>()
    };
    let node = match shape.node() {
        TShape::Vertex { point } => NodeDump::Vertex { point: *point },
        TShape::Edge {
            curve,
            range,
            start,
            end,
        } => NodeDump::Edge {
            curve: curve.clone(),
            range: *range,
            start: flatten(start, ids, nodes),
            end: flatten(end, ids, nodes),
        },
        TShape::Wire { edges, closed } => NodeDump::Wire {
            edges: all(edges, ids, nodes),
            closed: *closed,
        },
        TShape::Face { surface, wires } => NodeDump::Face {
            surface: surface.clone(),
            wires: all(wires, ids, nodes),
        },
        TShape::Shell { faces } => NodeDump::Shell {
            faces: all(faces, ids, nodes),
        },
        TShape::Solid { shells } => NodeDump::Solid {
            shells: all(shells, ids, nodes),
        },
        TShape::Compound { children } => NodeDump::Compound {
            children: all(children, ids, nodes),
        },
    };
    let id = nodes.len();
    nodes.push(node);
    ids.insert(shape.id(), id);
    Ref {
        id,
        reversed: shape.is_reversed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::make_box;
    use crate::traversal::{map_shapes, shell_is_closed};
    use egads_engine::ShapeKind;

    #[test]
    fn box_survives_json() {
        let solid = make_box(&[0.0; 3], &[1.0, 2.0, 3.0]).unwrap();
        let text = to_json(&solid).unwrap();
        let back = from_json(&text).unwrap();
        assert_eq!(back.kind(), ShapeKind::Solid);
        assert_eq!(map_shapes(&back, ShapeKind::Vertex).len(), 8);
        assert_eq!(map_shapes(&back, ShapeKind::Edge).len(), 12);
        let shell = &map_shapes(&back, ShapeKind::Shell)[0];
        assert!(shell_is_closed(shell).unwrap());
    }

    #[test]
    fn forward_reference_is_rejected() {
        let text = r#"{
            "version": 1,
            "nodes": [ { "kind": "shell", "faces": [ { "id": 3 } ] } ],
            "root": { "id": 0 }
        }"#;
        assert!(matches!(from_json(text), Err(EngineError::Format(_))));
    }

    #[test]
    fn garbage_is_a_format_error() {
        assert!(matches!(from_json("not json"), Err(EngineError::Format(_))));
    }
}
