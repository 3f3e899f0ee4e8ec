// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared, immutable B-rep shapes.
//!
//! A [`Shape`] is a reference-counted node plus an orientation flag. Two
//! handles denote the same entity when they share the node, whatever their
//! orientation. Sub-shapes are stored as handles, so a wire records the use
//! sense of each edge in the edge handle itself.

use std::fmt;
use std::sync::Arc;

use egads_engine::{EngineError, Result, Sense, ShapeKind, Vec3};

use crate::curve::Curve;
use crate::surface::Surface;

/// Topological entity data.
#[derive(Debug)]
pub enum TShape {
    Vertex {
        point: Vec3,
    },
    /// `curve == None` marks a degenerate edge collapsed onto `start`.
    Edge {
        curve: Option<Curve>,
        range: [f64; 2],
        start: Shape,
        end: Shape,
    },
    Wire {
        edges: Vec<Shape>,
        closed: bool,
    },
    /// Outer wire first.
    Face {
        surface: Surface,
        wires: Vec<Shape>,
    },
    Shell {
        faces: Vec<Shape>,
    },
    /// Outer shell first.
    Solid {
        shells: Vec<Shape>,
    },
    Compound {
        children: Vec<Shape>,
    },
}

/// Handle to a shared [`TShape`] with an orientation.
#[derive(Clone)]
pub struct Shape {
    node: Arc<TShape>,
    reversed: bool,
}

impl Shape {
    pub(crate) fn new(node: TShape) -> Self {
        Self {
            node: Arc::new(node),
            reversed: false,
        }
    }

    pub(crate) fn from_node(node: Arc<TShape>, reversed: bool) -> Self {
        Self { node, reversed }
    }

    pub fn node(&self) -> &TShape {
        &self.node
    }

    /// Identity of the underlying node.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.node) as usize
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn sense(&self) -> Sense {
        if self.reversed {
            Sense::Reverse
        } else {
            Sense::Forward
        }
    }

    /// Same node with the given orientation.
    pub fn oriented(&self, sense: Sense) -> Shape {
        Shape {
            node: Arc::clone(&self.node),
            reversed: sense == Sense::Reverse,
        }
    }

    /// Same node, forward orientation.
    pub fn forward(&self) -> Shape {
        self.oriented(Sense::Forward)
    }

    pub fn reversed(&self) -> Shape {
        Shape {
            node: Arc::clone(&self.node),
            reversed: !self.reversed,
        }
    }

    pub fn is_same(&self, other: &Shape) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    pub fn kind(&self) -> ShapeKind {
        match &*self.node {
            TShape::Vertex { .. } => ShapeKind::Vertex,
            TShape::Edge { .. } => ShapeKind::Edge,
            TShape::Wire { .. } => ShapeKind::Wire,
            TShape::Face { .. } => ShapeKind::Face,
            TShape::Shell { .. } => ShapeKind::Shell,
            TShape::Solid { .. } => ShapeKind::Solid,
            TShape::Compound { .. } => ShapeKind::Compound,
        }
    }

    /// Direct children, in storage order.
    pub fn children(&self) -> Vec<Shape> {
        match &*self.node {
            TShape::Vertex { .. } => Vec::new(),
            TShape::Edge { start, end, .. } => vec![start.clone(), end.clone()],
            TShape::Wire { edges, .. } => edges.clone(),
            TShape::Face { wires, .. } => wires.clone(),
            TShape::Shell { faces } => faces.clone(),
            TShape::Solid { shells } => shells.clone(),
            TShape::Compound { children } => children.clone(),
        }
    }

    // --- Typed accessors ---

    pub fn point(&self) -> Result<Vec3> {
        match &*self.node {
            TShape::Vertex { point } => Ok(*point),
            _ => Err(wrong_kind("vertex", self.kind())),
        }
    }

    /// `(curve, range, start, end)` of an edge, in the edge's own direction.
    pub fn edge_data(&self) -> Result<(Option<&Curve>, [f64; 2], &Shape, &Shape)> {
        match &*self.node {
            TShape::Edge {
                curve,
                range,
                start,
                end,
            } => Ok((curve.as_ref(), *range, start, end)),
            _ => Err(wrong_kind("edge", self.kind())),
        }
    }

    /// First and last vertex of this edge *use* (orientation applied).
    pub fn use_vertices(&self) -> Result<(Shape, Shape)> {
        let (_, _, start, end) = self.edge_data()?;
        if self.reversed {
            Ok((end.clone(), start.clone()))
        } else {
            Ok((start.clone(), end.clone()))
        }
    }

    pub fn wire_data(&self) -> Result<(&[Shape], bool)> {
        match &*self.node {
            TShape::Wire { edges, closed } => Ok((edges, *closed)),
            _ => Err(wrong_kind("wire", self.kind())),
        }
    }

    pub fn face_data(&self) -> Result<(&Surface, &[Shape])> {
        match &*self.node {
            TShape::Face { surface, wires } => Ok((surface, wires)),
            _ => Err(wrong_kind("face", self.kind())),
        }
    }

    pub fn shell_faces(&self) -> Result<&[Shape]> {
        match &*self.node {
            TShape::Shell { faces } => Ok(faces),
            _ => Err(wrong_kind("shell", self.kind())),
        }
    }

    pub fn solid_shells(&self) -> Result<&[Shape]> {
        match &*self.node {
            TShape::Solid { shells } => Ok(shells),
            _ => Err(wrong_kind("solid", self.kind())),
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Shape({:?}@{:#x}{})",
            self.kind(),
            self.id(),
            if self.reversed { ", reversed" } else { "" }
        )
    }
}

pub(crate) fn wrong_kind(expected: &str, got: ShapeKind) -> EngineError {
    EngineError::Topology(format!("expected a {expected}, got {got:?}"))
}
