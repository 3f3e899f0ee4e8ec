// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topology builders and queries.
//!
//! Builders validate their children in a fixed order, ask the engine for the
//! shape, then reference each child through its top object and finally add
//! the context keepalive. Bodies are the exception: they are rebuilt from
//! the engine shape, so the inputs stay independent of the new body.

use egads_engine::{GeometryEngine, Range, Sense, SurfaceType, Vec3};

use crate::blind::*;
use crate::body::shape_kind;
use crate::context::Context;
use crate::error::{EgadsError, Result};
use crate::hlevel::guarded;
use crate::object::*;

/// Result of [`Context::get_topology`].
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyInfo {
    pub class: ObjectClass,
    pub mtype: MemberType,
    /// Curve of an edge, surface of a loop or face.
    pub geometry: Option<Ego>,
    /// Node: xyz. Edge: t range. Face: u and v ranges.
    pub limits: Vec<f64>,
    pub children: Vec<Ego>,
    /// Loop pcurves, one per edge, when the loop has a surface.
    pub pcurves: Vec<Ego>,
    pub senses: Vec<Sense>,
}

impl<E: GeometryEngine> Context<E> {
    /// Resolves a child handle and checks its class.
    fn child_key(&self, ego: Ego, want: ObjectClass) -> Result<ObjectKey> {
        let key = self.member_key(ego)?;
        let got = self.class_of(key);
        if got != want {
            egads_log!(self, error, got = %got, want = %want, "child of the wrong class");
            return Err(EgadsError::NotATopology(format!("{got} where a {want} is needed")));
        }
        self.blind(key)?;
        Ok(key)
    }

    fn surface_key(&self, ego: Ego) -> Result<ObjectKey> {
        let key = self.member_key(ego)?;
        if self.class_of(key) != ObjectClass::Surface {
            egads_log!(self, error, class = %self.class_of(key), "geometry is not a surface");
            return Err(EgadsError::NotAGeometry(self.class_of(key).to_string()));
        }
        Ok(key)
    }

    fn finish_top(&mut self, key: ObjectKey, children: &[ObjectKey]) -> Result<Ego> {
        for &child in children {
            self.add_top_owner(child, key)?;
        }
        self.add_owner(key, self.root)?;
        Ok(self.ego(key))
    }

    // --- Builders ---

    pub fn make_node(&mut self, xyz: &Vec3) -> Result<Ego> {
        let shape = self.engine.make_vertex(xyz)?;
        let blind = Blind::Node(NodeData { shape, xyz: *xyz });
        let key = self.alloc_record(ObjectClass::Node, MemberType::Unset, Some(blind), self.root)?;
        self.finish_top(key, &[])
    }

    /// Creates a one-node (closed curve) or two-node edge on `curve` over `t`.
    pub fn make_edge(&mut self, curve: Ego, nodes: &[Ego], t: [f64; 2]) -> Result<Ego> {
        if t[0] >= t[1] {
            egads_log!(self, error, t0 = t[0], t1 = t[1], "edge range is empty");
            return Err(EgadsError::RangeError(format!("edge range {} >= {}", t[0], t[1])));
        }
        let curve = self.member_key(curve)?;
        if self.class_of(curve) != ObjectClass::Curve {
            egads_log!(self, error, class = %self.class_of(curve), "edge geometry is not a curve");
            return Err(EgadsError::NotAGeometry(self.class_of(curve).to_string()));
        }
        if !(1..=2).contains(&nodes.len()) {
            egads_log!(self, error, count = nodes.len(), "edge needs one or two nodes");
            return Err(EgadsError::TopologyError(format!("{} edge nodes", nodes.len())));
        }
        let n0 = self.child_key(nodes[0], ObjectClass::Node)?;
        let n1 = match nodes.get(1) {
            Some(&n) => self.child_key(n, ObjectClass::Node)?,
            None => n0,
        };

        let shape = {
            let c = self.curve_handle(curve)?;
            let v0 = self.shape_of(n0)?;
            let v1 = self.shape_of(n1)?;
            self.engine.make_edge(c, v0, v1, t)?
        };
        let etype = if n0 == n1 { EdgeType::OneNode } else { EdgeType::TwoNode };
        let blind = Blind::Edge(EdgeData {
            shape,
            curve: Some(curve),
            nodes: [n0, n1],
            top_flag: true,
        });
        let key = self.alloc_record(ObjectClass::Edge, MemberType::Edge(etype), Some(blind), self.root)?;
        self.finish_top(key, &[curve, n0, n1])
    }

    /// Creates a zero-length edge at `node`, as found at the poles of
    /// revolved surfaces.
    pub fn make_degenerate_edge(&mut self, node: Ego, t: [f64; 2]) -> Result<Ego> {
        if t[0] >= t[1] {
            egads_log!(self, error, t0 = t[0], t1 = t[1], "edge range is empty");
            return Err(EgadsError::RangeError(format!("edge range {} >= {}", t[0], t[1])));
        }
        let n = self.child_key(node, ObjectClass::Node)?;
        let shape = self.engine.make_degenerate_edge(self.shape_of(n)?, t)?;
        let blind = Blind::Edge(EdgeData {
            shape,
            curve: None,
            nodes: [n, n],
            top_flag: true,
        });
        let key = self.alloc_record(
            ObjectClass::Edge,
            MemberType::Edge(EdgeType::Degenerate),
            Some(blind),
            self.root,
        )?;
        self.finish_top(key, &[n, n])
    }

    /// Creates a loop from edge uses.
    ///
    /// With a reference `surface`, one pcurve per edge is required. Loops on
    /// planes drop their surface.
    pub fn make_loop(&mut self, edges: &[(Ego, Sense)], surface: Option<Ego>, pcurves: &[Ego]) -> Result<Ego> {
        if edges.is_empty() {
            egads_log!(self, error, "loop without edges");
            return Err(EgadsError::RangeError("loop without edges".into()));
        }
        let surface = surface.map(|s| self.surface_key(s)).transpose()?;
        let mut keys = Vec::with_capacity(edges.len());
        for &(e, _) in edges {
            keys.push(self.child_key(e, ObjectClass::Edge)?);
        }
        let pcurves = match surface {
            None => None,
            Some(_) => {
                if pcurves.len() < edges.len() {
                    egads_log!(self, error, count = pcurves.len(), "loop on a surface needs pcurves");
                    return Err(EgadsError::NullObject("pcurve".into()));
                }
                let mut pks = Vec::with_capacity(edges.len());
                for &p in &pcurves[..edges.len()] {
                    let k = self.member_key(p)?;
                    if self.class_of(k) != ObjectClass::PCurve {
                        egads_log!(self, error, class = %self.class_of(k), "loop pcurve of the wrong class");
                        return Err(EgadsError::NotATopology(format!("{} where a PCurve is needed", self.class_of(k))));
                    }
                    pks.push(k);
                }
                Some(pks)
            }
        };

        let mut uses = Vec::with_capacity(edges.len());
        for (&k, &(_, sense)) in keys.iter().zip(edges) {
            uses.push((self.shape_of(k)?.clone(), sense));
        }
        let (shape, closed) = self.engine.make_wire(&uses)?;

        let surface = surface.filter(|&s| {
            !matches!(self.objects[s].mtype, MemberType::Surface(SurfaceType::Plane))
        });
        let pcurves = surface.and(pcurves);
        let closure = if closed { Closure::Closed } else { Closure::Open };
        let mut children = keys.clone();
        children.extend(pcurves.iter().flatten());
        children.extend(surface);
        let blind = Blind::Loop(LoopData {
            shape,
            surface,
            edges: keys,
            pcurves,
            senses: edges.iter().map(|&(_, s)| s).collect(),
            top_flag: true,
        });
        let key = self.alloc_record(ObjectClass::Loop, MemberType::Closure(closure), Some(blind), self.root)?;
        self.finish_top(key, &children)
    }

    /// Creates a face on `surface` bounded by closed loops (outer first).
    pub fn make_face(&mut self, surface: Ego, sense: Sense, loops: &[(Ego, Sense)]) -> Result<Ego> {
        let surface = self.surface_key(surface)?;
        if loops.is_empty() {
            egads_log!(self, error, "face without loops");
            return Err(EgadsError::RangeError("face without loops".into()));
        }
        let planar = matches!(self.objects[surface].mtype, MemberType::Surface(SurfaceType::Plane));
        let mut keys = Vec::with_capacity(loops.len());
        for &(l, _) in loops {
            let k = self.child_key(l, ObjectClass::Loop)?;
            if self.objects[k].mtype != MemberType::Closure(Closure::Closed) {
                egads_log!(self, error, "face loop is open");
                return Err(EgadsError::NotATopology("open loop".into()));
            }
            if !planar {
                let on = match self.blind(k)? {
                    Blind::Loop(d) => d.surface,
                    _ => None,
                };
                if on != Some(surface) {
                    egads_log!(self, error, "loop is not on the face surface");
                    return Err(EgadsError::NotAGeometry("loop surface mismatch".into()));
                }
            }
            keys.push(k);
        }

        let shape = {
            let mut wires = Vec::with_capacity(keys.len());
            for &k in &keys {
                wires.push(self.shape_of(k)?.clone());
            }
            self.engine.make_face(self.surface_handle(surface)?, &wires, sense)?
        };
        let mut children = keys.clone();
        children.push(surface);
        let blind = Blind::Face(FaceData {
            shape,
            surface,
            loops: keys,
            senses: loops.iter().map(|&(_, s)| s).collect(),
            top_flag: true,
        });
        let key = self.alloc_record(ObjectClass::Face, MemberType::Sense(sense), Some(blind), self.root)?;
        self.finish_top(key, &children)
    }

    /// Fills a closed planar loop with a new plane.
    pub fn make_face_from_loop(&mut self, lp: Ego, sense: Sense) -> Result<Ego> {
        let lk = self.child_key(lp, ObjectClass::Loop)?;
        let wire = match self.blind(lk)? {
            Blind::Loop(d) if d.surface.is_some() => {
                egads_log!(self, error, "loop already has a surface");
                return Err(EgadsError::NotAGeometry("loop with a surface".into()));
            }
            Blind::Loop(d) => d.shape.clone(),
            _ => return Err(EgadsError::NotATopology("not a loop".into())),
        };
        let mut shape = guarded("planar face", || self.engine.make_planar_face(&wire))?;
        if sense == Sense::Reverse {
            shape = self.engine.reverse_shape(&shape)?;
        }
        let handle = self.engine.face_surface(&shape)?;

        let face = self.alloc_record(ObjectClass::Face, MemberType::Sense(sense), None, self.root)?;
        let mut created = Vec::new();
        let surface = match self.adopt_surface(handle, face, &mut created) {
            Ok(s) => s,
            Err(e) => {
                self.discard(&created);
                self.discard(&[face]);
                return Err(e);
            }
        };
        self.record_mut(face)?.blind = Some(Blind::Face(FaceData {
            shape,
            surface,
            loops: vec![lk],
            senses: vec![Sense::Forward],
            top_flag: false,
        }));
        self.add_owner(surface, face)?;
        self.add_owner(lk, face)?;
        self.add_owner(face, self.root)?;
        Ok(self.ego(face))
    }

    pub fn make_shell(&mut self, faces: &[Ego]) -> Result<Ego> {
        if faces.is_empty() {
            egads_log!(self, error, "shell without faces");
            return Err(EgadsError::RangeError("shell without faces".into()));
        }
        let mut keys = Vec::with_capacity(faces.len());
        for &f in faces {
            keys.push(self.child_key(f, ObjectClass::Face)?);
        }
        let mut shapes = Vec::with_capacity(keys.len());
        for &k in &keys {
            shapes.push(self.shape_of(k)?.clone());
        }
        let shape = self.engine.make_shell(&shapes)?;
        let closure = if self.engine.is_closed(&shape)? {
            Closure::Closed
        } else {
            Closure::Open
        };
        let blind = Blind::Shell(ShellData {
            shape,
            faces: keys.clone(),
            top_flag: true,
        });
        let key = self.alloc_record(ObjectClass::Shell, MemberType::Closure(closure), Some(blind), self.root)?;
        self.finish_top(key, &keys)
    }

    /// Creates a body from a loop (wire body), a face (face body) or shells
    /// (sheet body, or solid body with the outer shell first).
    pub fn make_body(&mut self, btype: BodyType, children: &[Ego]) -> Result<Ego> {
        if children.is_empty() {
            egads_log!(self, error, "body without children");
            return Err(EgadsError::RangeError("body without children".into()));
        }
        if btype != BodyType::SolidBody && children.len() != 1 {
            egads_log!(self, error, count = children.len(), "non-solid body needs one child");
            return Err(EgadsError::RangeError(format!("{} body children", children.len())));
        }
        let want = match btype {
            BodyType::WireBody => ObjectClass::Loop,
            BodyType::FaceBody => ObjectClass::Face,
            BodyType::SheetBody | BodyType::SolidBody => ObjectClass::Shell,
        };
        let mut keys = Vec::with_capacity(children.len());
        for &c in children {
            let k = self.child_key(c, want)?;
            if btype == BodyType::SolidBody && self.objects[k].mtype != MemberType::Closure(Closure::Closed) {
                egads_log!(self, error, "solid body from an open shell");
                return Err(EgadsError::RangeError("open shell in a solid".into()));
            }
            keys.push(k);
        }

        let shape = if btype == BodyType::SolidBody {
            let mut shells = Vec::with_capacity(keys.len());
            for &k in &keys {
                shells.push(self.shape_of(k)?.clone());
            }
            self.engine.make_solid(&shells)?
        } else {
            self.shape_of(keys[0])?.clone()
        };
        let body = self.body_from_shape(shape)?;
        let sources = self.collect_topology(&keys);
        self.transfer_attrs_by_shape(&sources, body)?;
        self.add_owner(body, self.root)?;
        Ok(self.ego(body))
    }

    /// Collects top-level bodies into a model. The bodies move under the
    /// model and lose their context keepalive.
    pub fn make_model(&mut self, bodies: &[Ego]) -> Result<Ego> {
        if bodies.is_empty() {
            egads_log!(self, error, "model without bodies");
            return Err(EgadsError::RangeError("model without bodies".into()));
        }
        let mut keys = Vec::with_capacity(bodies.len());
        for &b in bodies {
            let k = self.member_key(b)?;
            if self.class_of(k) != ObjectClass::Body {
                egads_log!(self, error, class = %self.class_of(k), "model child is not a body");
                return Err(EgadsError::NotATopology(format!("{} in a model", self.class_of(k))));
            }
            if self.objects[k].top != self.root {
                egads_log!(self, error, "body already belongs to a model");
                return Err(EgadsError::ReferenceClass("body in another model".into()));
            }
            if keys.contains(&k) {
                egads_log!(self, error, "body listed twice");
                return Err(EgadsError::ReferenceClass("body listed twice in a model".into()));
            }
            if !self.objects[k].owners.contains(&self.root) {
                egads_log!(self, error, "body without a context reference");
                return Err(EgadsError::ReferenceClass("body not held by the context".into()));
            }
            keys.push(k);
        }
        let mut shapes = Vec::with_capacity(keys.len());
        for &k in &keys {
            shapes.push(self.shape_of(k)?.clone());
        }
        let shape = self.engine.make_compound(&shapes)?;
        let blind = Blind::Model(ModelData {
            shape,
            bodies: keys.clone(),
        });
        let model = self.alloc_record(ObjectClass::Model, MemberType::Unset, Some(blind), self.root)?;
        for k in keys {
            self.record_mut(k)?.top = model;
            self.add_owner(k, model)?;
            self.remove_context_owner(k)?;
        }
        self.add_owner(model, self.root)?;
        Ok(self.ego(model))
    }

    // --- Queries ---

    pub fn get_topology(&self, topo: Ego) -> Result<TopologyInfo> {
        let key = self.live_key(topo)?;
        let record = self.record(key)?;
        if !record.class.is_topology() {
            return Err(EgadsError::NotATopology(record.class.to_string()));
        }
        let egos = |keys: &[ObjectKey]| keys.iter().map(|&k| self.ego(k)).collect::<Vec<_>>();
        let mut info = TopologyInfo {
            class: record.class,
            mtype: record.mtype,
            geometry: None,
            limits: Vec::new(),
            children: Vec::new(),
            pcurves: Vec::new(),
            senses: Vec::new(),
        };
        match self.blind(key)? {
            Blind::Node(n) => info.limits = n.xyz.to_vec(),
            Blind::Edge(e) => {
                info.geometry = e.curve.map(|c| self.ego(c));
                let n = if record.mtype == MemberType::Edge(EdgeType::TwoNode) { 2 } else { 1 };
                info.children = egos(&e.nodes[..n]);
                info.limits = self.engine.edge_range(&e.shape)?.to_vec();
            }
            Blind::Loop(l) => {
                info.geometry = l.surface.map(|s| self.ego(s));
                info.children = egos(&l.edges);
                info.pcurves = l.pcurves.as_deref().map(egos).unwrap_or_default();
                info.senses = l.senses.clone();
            }
            Blind::Face(f) => {
                info.geometry = Some(self.ego(f.surface));
                info.children = egos(&f.loops);
                info.senses = f.senses.clone();
                if let Range::Surface { u, v, .. } = self.engine.shape_range(&f.shape)? {
                    info.limits = vec![u[0], u[1], v[0], v[1]];
                }
            }
            Blind::Shell(s) => info.children = egos(&s.faces),
            Blind::Body(b) => match record.mtype {
                MemberType::Body(BodyType::WireBody) => info.children = egos(&b.loops.objs),
                MemberType::Body(BodyType::FaceBody) => info.children = egos(&b.faces.objs),
                _ => {
                    info.children = egos(&b.shells.objs);
                    info.senses = b.senses.clone();
                }
            },
            Blind::Model(m) => info.children = egos(&m.bodies),
            other => return Err(EgadsError::NotATopology(other.class().to_string())),
        }
        Ok(info)
    }

    /// Objects of `class` in `body`: all of them, those below `src`, or
    /// those containing `src`.
    pub fn get_body_topos(&self, body: Ego, src: Option<Ego>, class: ObjectClass) -> Result<Vec<Ego>> {
        let bk = self.live_key(body)?;
        if self.class_of(bk) != ObjectClass::Body {
            return Err(EgadsError::NotABody);
        }
        let data = self.body_data(bk)?;
        let (Some(map), Some(kind)) = (data.map(class), shape_kind(class)) else {
            egads_log!(self, error, class = %class, "not a body topology class");
            return Err(EgadsError::NotATopology(class.to_string()));
        };
        let Some(src) = src else {
            return Ok(map.objs.iter().map(|&k| self.ego(k)).collect());
        };

        let sk = self.member_key(src)?;
        let src_class = self.class_of(sk);
        let Some(src_kind) = shape_kind(src_class) else {
            egads_log!(self, error, class = %src_class, "source is not a body topology");
            return Err(EgadsError::NotATopology(src_class.to_string()));
        };
        if src_class == class {
            egads_log!(self, error, class = %class, "source has the requested class");
            return Err(EgadsError::TopologyError(format!("source is a {class}")));
        }
        let shape = self.shape_of(sk)?;

        let mut out = Vec::new();
        if src_class > class {
            for sub in self.engine.map_shapes(shape, kind)? {
                match self.find_shape(map, &sub) {
                    Some(i) => out.push(self.ego(map.objs[i])),
                    None => egads_log!(self, warn, class = %class, "sub-shape not in the body"),
                }
            }
        } else {
            for (i, candidate) in map.shapes.iter().enumerate() {
                let subs = self.engine.map_shapes(candidate, src_kind)?;
                if subs.iter().any(|s| self.engine.is_same(s, shape)) {
                    out.push(self.ego(map.objs[i]));
                }
            }
        }
        Ok(out)
    }

    /// 1-based index of a topology object within its class in `body`.
    pub fn index_body_topo(&self, body: Ego, topo: Ego) -> Result<usize> {
        let bk = self.live_key(body)?;
        if self.class_of(bk) != ObjectClass::Body {
            return Err(EgadsError::NotABody);
        }
        let data = self.body_data(bk)?;
        let tk = self.member_key(topo)?;
        let class = self.class_of(tk);
        let Some(map) = data.map(class) else {
            egads_log!(self, error, class = %class, "not a body topology class");
            return Err(EgadsError::NotATopology(class.to_string()));
        };
        let shape = self.shape_of(tk)?;
        self.find_shape(map, shape)
            .map(|i| i + 1)
            .ok_or_else(|| EgadsError::NotFound(format!("{class} in body")))
    }
}
