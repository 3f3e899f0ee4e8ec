// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Class-specific payloads of object records.
//!
//! Payloads hold engine handles plus the keys of the objects they reference.
//! `top_flag` marks objects built one at a time by the caller: their children
//! are released through `dereference_top_obj`. Objects created by body
//! traversal clear it and release their children directly.

use egads_engine::{EdgeMesh, FaceMesh, GeometryEngine, Matrix, Sense, TessParams, Vec3};

use crate::object::{ObjectClass, ObjectKey};

pub(crate) enum Blind<E: GeometryEngine> {
    Transform(Matrix),
    Tessellation(TessData),
    PCurve(GeomData<E::PCurve>),
    Curve(GeomData<E::Curve>),
    Surface(GeomData<E::Surface>),
    Node(NodeData<E>),
    Edge(EdgeData<E>),
    Loop(LoopData<E>),
    Face(FaceData<E>),
    Shell(ShellData<E>),
    Body(BodyData<E>),
    Model(ModelData<E>),
}

pub(crate) struct GeomData<H> {
    pub handle: H,
    pub basis: Option<ObjectKey>,
    pub top_flag: bool,
}

pub(crate) struct NodeData<E: GeometryEngine> {
    pub shape: E::Shape,
    pub xyz: Vec3,
}

pub(crate) struct EdgeData<E: GeometryEngine> {
    pub shape: E::Shape,
    /// `None` for degenerate edges.
    pub curve: Option<ObjectKey>,
    /// Start and end node; equal for one-node and degenerate edges.
    pub nodes: [ObjectKey; 2],
    pub top_flag: bool,
}

pub(crate) struct LoopData<E: GeometryEngine> {
    pub shape: E::Shape,
    /// Reference surface; `None` for loops in 3D space (and on planes).
    pub surface: Option<ObjectKey>,
    pub edges: Vec<ObjectKey>,
    /// One pcurve per edge, present only when `surface` is.
    pub pcurves: Option<Vec<ObjectKey>>,
    pub senses: Vec<Sense>,
    pub top_flag: bool,
}

pub(crate) struct FaceData<E: GeometryEngine> {
    pub shape: E::Shape,
    pub surface: ObjectKey,
    pub loops: Vec<ObjectKey>,
    /// Forward for the outer loop, reverse for holes.
    pub senses: Vec<Sense>,
    pub top_flag: bool,
}

pub(crate) struct ShellData<E: GeometryEngine> {
    pub shape: E::Shape,
    pub faces: Vec<ObjectKey>,
    pub top_flag: bool,
}

/// Indexed map from engine shapes to the objects built for them.
pub(crate) struct ShapeMap<S> {
    pub shapes: Vec<S>,
    pub objs: Vec<ObjectKey>,
}

impl<S> ShapeMap<S> {
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            objs: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.objs.len()
    }
}

pub(crate) struct BodyData<E: GeometryEngine> {
    pub shape: E::Shape,
    pub nodes: ShapeMap<E::Shape>,
    pub edges: ShapeMap<E::Shape>,
    pub loops: ShapeMap<E::Shape>,
    pub faces: ShapeMap<E::Shape>,
    pub shells: ShapeMap<E::Shape>,
    /// Shell senses of a solid body: forward for the outer shell.
    pub senses: Vec<Sense>,
}

impl<E: GeometryEngine> BodyData<E> {
    pub fn map(&self, class: ObjectClass) -> Option<&ShapeMap<E::Shape>> {
        match class {
            ObjectClass::Node => Some(&self.nodes),
            ObjectClass::Edge => Some(&self.edges),
            ObjectClass::Loop => Some(&self.loops),
            ObjectClass::Face => Some(&self.faces),
            ObjectClass::Shell => Some(&self.shells),
            _ => None,
        }
    }
}

pub(crate) struct ModelData<E: GeometryEngine> {
    pub shape: E::Shape,
    pub bodies: Vec<ObjectKey>,
}

pub(crate) struct TessData {
    /// The tessellated geometry or body.
    pub src: ObjectKey,
    pub kind: TessKind,
}

pub(crate) enum TessKind {
    /// Parameter grid over a curve (`sizes[1] == 0`) or surface.
    Geometry {
        sizes: [usize; 2],
        xyz: Vec<Vec3>,
        params: Vec<f64>,
    },
    Body {
        params: TessParams,
        edges: Vec<EdgeMesh>,
        faces: Vec<FaceMesh>,
    },
}

impl<E: GeometryEngine> Blind<E> {
    pub fn class(&self) -> ObjectClass {
        match self {
            Blind::Transform(_) => ObjectClass::Transform,
            Blind::Tessellation(_) => ObjectClass::Tessellation,
            Blind::PCurve(_) => ObjectClass::PCurve,
            Blind::Curve(_) => ObjectClass::Curve,
            Blind::Surface(_) => ObjectClass::Surface,
            Blind::Node(_) => ObjectClass::Node,
            Blind::Edge(_) => ObjectClass::Edge,
            Blind::Loop(_) => ObjectClass::Loop,
            Blind::Face(_) => ObjectClass::Face,
            Blind::Shell(_) => ObjectClass::Shell,
            Blind::Body(_) => ObjectClass::Body,
            Blind::Model(_) => ObjectClass::Model,
        }
    }

    /// The engine shape of a topological payload.
    pub fn shape(&self) -> Option<&E::Shape> {
        match self {
            Blind::Node(d) => Some(&d.shape),
            Blind::Edge(d) => Some(&d.shape),
            Blind::Loop(d) => Some(&d.shape),
            Blind::Face(d) => Some(&d.shape),
            Blind::Shell(d) => Some(&d.shape),
            Blind::Body(d) => Some(&d.shape),
            Blind::Model(d) => Some(&d.shape),
            _ => None,
        }
    }

    /// Objects this payload holds a reference on, and whether each is
    /// released through its top object.
    pub fn references(&self) -> Vec<(ObjectKey, bool)> {
        let all = |keys: &[ObjectKey], top: bool| keys.iter().map(|&k| (k, top)).collect::<Vec<_>>();
        match self {
            Blind::Transform(_) => Vec::new(),
            Blind::Tessellation(t) => vec![(t.src, true)],
            Blind::PCurve(g) => g.basis.map(|b| (b, g.top_flag)).into_iter().collect(),
            Blind::Curve(g) => g.basis.map(|b| (b, g.top_flag)).into_iter().collect(),
            Blind::Surface(g) => g.basis.map(|b| (b, g.top_flag)).into_iter().collect(),
            Blind::Node(_) => Vec::new(),
            Blind::Edge(e) => {
                let mut refs: Vec<_> = e.curve.map(|c| (c, e.top_flag)).into_iter().collect();
                refs.extend(all(&e.nodes, e.top_flag));
                refs
            }
            Blind::Loop(l) => {
                let mut refs = Vec::with_capacity(2 * l.edges.len() + 1);
                for (i, &edge) in l.edges.iter().enumerate() {
                    refs.push((edge, l.top_flag));
                    if let Some(pcurves) = &l.pcurves {
                        if let Some(&pc) = pcurves.get(i) {
                            refs.push((pc, l.top_flag));
                        }
                    }
                }
                if let Some(s) = l.surface {
                    refs.push((s, l.top_flag));
                }
                refs
            }
            Blind::Face(f) => {
                let mut refs = all(&f.loops, f.top_flag);
                refs.push((f.surface, f.top_flag));
                refs
            }
            Blind::Shell(s) => all(&s.faces, s.top_flag),
            Blind::Body(b) => {
                if !b.shells.objs.is_empty() {
                    all(&b.shells.objs, false)
                } else if !b.faces.objs.is_empty() {
                    all(&b.faces.objs, false)
                } else {
                    all(&b.loops.objs, false)
                }
            }
            Blind::Model(m) => all(&m.bodies, false),
        }
    }
}
