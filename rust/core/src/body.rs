// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building objects from engine shapes.
//!
//! An [`Explorer`] walks a shape and creates one object per unique
//! sub-shape, sharing objects between uses the way the engine shares
//! entities. Every object it creates gets the same `top` (a body, or the
//! copied topology object) and is owned directly by its parent.

use egads_engine::{GeometryEngine, Sense, ShapeKind, SurfaceType};

use crate::blind::*;
use crate::context::Context;
use crate::error::{EgadsError, Result};
use crate::object::*;

/// Engine shape kind matching a topology class.
pub(crate) fn shape_kind(class: ObjectClass) -> Option<ShapeKind> {
    match class {
        ObjectClass::Node => Some(ShapeKind::Vertex),
        ObjectClass::Edge => Some(ShapeKind::Edge),
        ObjectClass::Loop => Some(ShapeKind::Wire),
        ObjectClass::Face => Some(ShapeKind::Face),
        ObjectClass::Shell => Some(ShapeKind::Shell),
        _ => None,
    }
}

/// Shared-shape bookkeeping for one exploration.
pub(crate) struct Explorer<S> {
    top: ObjectKey,
    nodes: ShapeMap<S>,
    edges: ShapeMap<S>,
    loops: ShapeMap<S>,
    faces: ShapeMap<S>,
    shells: ShapeMap<S>,
    /// Faces whose wires may be explored, for finding a loop's surface.
    face_shapes: Vec<S>,
    /// Surface objects per face shape, built on first use.
    surfaces: Vec<(S, ObjectKey)>,
    pub created: Vec<ObjectKey>,
}

impl<S> Explorer<S> {
    pub fn new(top: ObjectKey) -> Self {
        Self {
            top,
            nodes: ShapeMap::new(),
            edges: ShapeMap::new(),
            loops: ShapeMap::new(),
            faces: ShapeMap::new(),
            shells: ShapeMap::new(),
            face_shapes: Vec::new(),
            surfaces: Vec::new(),
            created: Vec::new(),
        }
    }

    fn register(&mut self, class: ObjectClass, shape: S, key: ObjectKey) {
        self.created.push(key);
        let map = match class {
            ObjectClass::Node => &mut self.nodes,
            ObjectClass::Edge => &mut self.edges,
            ObjectClass::Loop => &mut self.loops,
            ObjectClass::Face => &mut self.faces,
            _ => &mut self.shells,
        };
        map.shapes.push(shape);
        map.objs.push(key);
    }
}

impl<E: GeometryEngine> Context<E> {
    pub(crate) fn shape_of(&self, key: ObjectKey) -> Result<&E::Shape> {
        let blind = self.blind(key)?;
        blind
            .shape()
            .ok_or_else(|| EgadsError::NotATopology(blind.class().to_string()))
    }

    /// 0-based position of `shape` in `map`, by engine identity.
    pub(crate) fn find_shape(&self, map: &ShapeMap<E::Shape>, shape: &E::Shape) -> Option<usize> {
        map.shapes.iter().position(|s| self.engine.is_same(s, shape))
    }

    // --- Per-class exploration ---

    pub(crate) fn explore_node(&mut self, ex: &mut Explorer<E::Shape>, shape: &E::Shape) -> Result<ObjectKey> {
        if let Some(i) = self.find_shape(&ex.nodes, shape) {
            return Ok(ex.nodes.objs[i]);
        }
        let xyz = self.engine.vertex_point(shape)?;
        let blind = Blind::Node(NodeData {
            shape: shape.clone(),
            xyz,
        });
        let key = self.alloc_record(ObjectClass::Node, MemberType::Unset, Some(blind), ex.top)?;
        ex.register(ObjectClass::Node, shape.clone(), key);
        Ok(key)
    }

    pub(crate) fn explore_edge(&mut self, ex: &mut Explorer<E::Shape>, shape: &E::Shape) -> Result<ObjectKey> {
        if let Some(i) = self.find_shape(&ex.edges, shape) {
            return Ok(ex.edges.objs[i]);
        }
        let curve = match self.engine.edge_curve(shape)? {
            Some(c) => Some(self.adopt_curve(c, ex.top, &mut ex.created)?),
            None => None,
        };
        let (start, end) = self.engine.edge_vertices(shape)?;
        let n0 = self.explore_node(ex, &start)?;
        let n1 = self.explore_node(ex, &end)?;
        let etype = if curve.is_none() {
            EdgeType::Degenerate
        } else if n0 == n1 {
            EdgeType::OneNode
        } else {
            EdgeType::TwoNode
        };
        let blind = Blind::Edge(EdgeData {
            shape: shape.clone(),
            curve,
            nodes: [n0, n1],
            top_flag: false,
        });
        let key = self.alloc_record(ObjectClass::Edge, MemberType::Edge(etype), Some(blind), ex.top)?;
        ex.register(ObjectClass::Edge, shape.clone(), key);
        if let Some(c) = curve {
            self.add_owner(c, key)?;
        }
        self.add_owner(n0, key)?;
        self.add_owner(n1, key)?;
        Ok(key)
    }

    /// Surface object of a face, created once per face.
    fn face_surface_key(&mut self, ex: &mut Explorer<E::Shape>, face: &E::Shape) -> Result<ObjectKey> {
        if let Some((_, key)) = ex.surfaces.iter().find(|(s, _)| self.engine.is_same(s, face)) {
            return Ok(*key);
        }
        let handle = self.engine.face_surface(face)?;
        let key = self.adopt_surface(handle, ex.top, &mut ex.created)?;
        ex.surfaces.push((face.clone(), key));
        Ok(key)
    }

    fn is_plane(&self, surface: ObjectKey) -> bool {
        matches!(
            self.objects.get(surface).map(|r| r.mtype),
            Some(MemberType::Surface(SurfaceType::Plane))
        )
    }

    /// The explored face that uses `wire`, if any.
    fn owning_face(&self, ex: &Explorer<E::Shape>, wire: &E::Shape) -> Result<Option<E::Shape>> {
        for face in &ex.face_shapes {
            let wires = self.engine.face_wires(face)?;
            if wires.iter().any(|(w, _)| self.engine.is_same(w, wire)) {
                return Ok(Some(face.clone()));
            }
        }
        Ok(None)
    }

    pub(crate) fn explore_loop(&mut self, ex: &mut Explorer<E::Shape>, shape: &E::Shape) -> Result<ObjectKey> {
        if let Some(i) = self.find_shape(&ex.loops, shape) {
            return Ok(ex.loops.objs[i]);
        }
        let face = self.owning_face(ex, shape)?;
        let surface = match &face {
            Some(f) => {
                let s = self.face_surface_key(ex, f)?;
                (!self.is_plane(s)).then_some(s)
            }
            None => None,
        };

        let uses = self.engine.wire_edges(shape)?;
        let mut edges = Vec::with_capacity(uses.len());
        let mut senses = Vec::with_capacity(uses.len());
        for (edge, sense) in &uses {
            edges.push(self.explore_edge(ex, edge)?);
            senses.push(*sense);
        }

        let mut pcurves = None;
        if let (Some(_), Some(f)) = (surface, &face) {
            let mut handles = Vec::with_capacity(uses.len());
            for (edge, _) in &uses {
                handles.push(self.engine.edge_pcurve(edge, f)?);
            }
            if let Some(handles) = handles.into_iter().collect::<Option<Vec<_>>>() {
                let mut keys = Vec::with_capacity(handles.len());
                for h in handles {
                    keys.push(self.adopt_pcurve(h, ex.top, &mut ex.created)?);
                }
                pcurves = Some(keys);
            }
        }

        let closure = if self.engine.is_closed(shape)? {
            Closure::Closed
        } else {
            Closure::Open
        };
        let owned: Vec<ObjectKey> = edges
            .iter()
            .chain(pcurves.iter().flatten())
            .chain(surface.iter())
            .copied()
            .collect();
        let blind = Blind::Loop(LoopData {
            shape: shape.clone(),
            surface,
            edges,
            pcurves,
            senses,
            top_flag: false,
        });
        let key = self.alloc_record(ObjectClass::Loop, MemberType::Closure(closure), Some(blind), ex.top)?;
        ex.register(ObjectClass::Loop, shape.clone(), key);
        for child in owned {
            self.add_owner(child, key)?;
        }
        Ok(key)
    }

    pub(crate) fn explore_face(&mut self, ex: &mut Explorer<E::Shape>, shape: &E::Shape) -> Result<ObjectKey> {
        if let Some(i) = self.find_shape(&ex.faces, shape) {
            return Ok(ex.faces.objs[i]);
        }
        if !ex.face_shapes.iter().any(|f| self.engine.is_same(f, shape)) {
            ex.face_shapes.push(shape.clone());
        }
        let surface = self.face_surface_key(ex, shape)?;
        let wires = self.engine.face_wires(shape)?;
        let mut loops = Vec::with_capacity(wires.len());
        let mut senses = Vec::with_capacity(wires.len());
        for (wire, outer) in &wires {
            loops.push(self.explore_loop(ex, wire)?);
            senses.push(if *outer { Sense::Forward } else { Sense::Reverse });
        }
        let sense = self.engine.face_sense(shape)?;
        let blind = Blind::Face(FaceData {
            shape: shape.clone(),
            surface,
            loops: loops.clone(),
            senses,
            top_flag: false,
        });
        let key = self.alloc_record(ObjectClass::Face, MemberType::Sense(sense), Some(blind), ex.top)?;
        ex.register(ObjectClass::Face, shape.clone(), key);
        self.add_owner(surface, key)?;
        for l in loops {
            self.add_owner(l, key)?;
        }
        Ok(key)
    }

    pub(crate) fn explore_shell(&mut self, ex: &mut Explorer<E::Shape>, shape: &E::Shape) -> Result<ObjectKey> {
        if let Some(i) = self.find_shape(&ex.shells, shape) {
            return Ok(ex.shells.objs[i]);
        }
        let face_shapes = self.engine.shell_faces(shape)?;
        for f in &face_shapes {
            if !ex.face_shapes.iter().any(|s| self.engine.is_same(s, f)) {
                ex.face_shapes.push(f.clone());
            }
        }
        let mut faces = Vec::with_capacity(face_shapes.len());
        for f in &face_shapes {
            faces.push(self.explore_face(ex, f)?);
        }
        let closure = if self.engine.is_closed(shape)? {
            Closure::Closed
        } else {
            Closure::Open
        };
        let blind = Blind::Shell(ShellData {
            shape: shape.clone(),
            faces: faces.clone(),
            top_flag: false,
        });
        let key = self.alloc_record(ObjectClass::Shell, MemberType::Closure(closure), Some(blind), ex.top)?;
        ex.register(ObjectClass::Shell, shape.clone(), key);
        for f in faces {
            self.add_owner(f, key)?;
        }
        Ok(key)
    }

    // --- Bodies ---

    /// Builds a Body (and all of its sub-objects) for a wire, face, shell or
    /// solid shape. The body has no owners yet.
    pub(crate) fn body_from_shape(&mut self, shape: E::Shape) -> Result<ObjectKey> {
        let btype = match self.engine.shape_kind(&shape)? {
            ShapeKind::Wire => BodyType::WireBody,
            ShapeKind::Face => BodyType::FaceBody,
            ShapeKind::Shell => BodyType::SheetBody,
            ShapeKind::Solid => BodyType::SolidBody,
            other => {
                egads_log!(self, error, kind = ?other, "shape cannot be a body");
                return Err(EgadsError::NotATopology(format!("{other:?} body")));
            }
        };
        let body = self.alloc_record(ObjectClass::Body, MemberType::Body(btype), None, self.root)?;
        let mut ex = Explorer::new(body);
        match self.traverse_body(&mut ex, &shape, btype) {
            Ok(senses) => {
                let data = BodyData {
                    shape,
                    nodes: ex.nodes,
                    edges: ex.edges,
                    loops: ex.loops,
                    faces: ex.faces,
                    shells: ex.shells,
                    senses,
                };
                let record = self.record_mut(body)?;
                record.blind = Some(Blind::Body(data));
                egads_log!(self, debug, mtype = btype as i32, "body traversed");
                Ok(body)
            }
            Err(e) => {
                self.discard(&ex.created);
                self.discard(&[body]);
                Err(e)
            }
        }
    }

    fn traverse_body(
        &mut self,
        ex: &mut Explorer<E::Shape>,
        shape: &E::Shape,
        btype: BodyType,
    ) -> Result<Vec<Sense>> {
        let body = ex.top;
        ex.face_shapes = self.engine.map_shapes(shape, ShapeKind::Face)?;

        for v in self.engine.map_shapes(shape, ShapeKind::Vertex)? {
            self.explore_node(ex, &v)?;
        }
        for e in self.engine.map_shapes(shape, ShapeKind::Edge)? {
            self.explore_edge(ex, &e)?;
        }
        for w in self.engine.map_shapes(shape, ShapeKind::Wire)? {
            self.explore_loop(ex, &w)?;
        }
        for f in self.engine.map_shapes(shape, ShapeKind::Face)? {
            self.explore_face(ex, &f)?;
        }
        for s in self.engine.map_shapes(shape, ShapeKind::Shell)? {
            self.explore_shell(ex, &s)?;
        }

        let mut senses = Vec::new();
        if btype == BodyType::SolidBody {
            let shells = self.engine.solid_shells(shape)?;
            for s in &ex.shells.shapes {
                let outer = shells
                    .iter()
                    .find(|(sh, _)| self.engine.is_same(sh, s))
                    .is_some_and(|(_, outer)| *outer);
                senses.push(if outer { Sense::Forward } else { Sense::Reverse });
            }
        }

        let owned = match btype {
            BodyType::WireBody => ex.loops.objs.clone(),
            BodyType::FaceBody => ex.faces.objs.clone(),
            BodyType::SheetBody | BodyType::SolidBody => ex.shells.objs.clone(),
        };
        for child in owned {
            self.add_owner(child, body)?;
        }
        Ok(senses)
    }

    pub(crate) fn body_data(&self, key: ObjectKey) -> Result<&BodyData<E>> {
        match self.blind(key)? {
            Blind::Body(b) => Ok(b),
            _ => Err(EgadsError::NotABody),
        }
    }

    /// Builds a Model from a compound: one body per free wire, face, shell
    /// and solid. The model has no owners yet.
    pub(crate) fn model_from_compound(&mut self, compound: E::Shape) -> Result<ObjectKey> {
        let shapes = self.engine.model_bodies(&compound)?;
        let mut bodies = Vec::with_capacity(shapes.len());
        for shape in shapes {
            match self.body_from_shape(shape) {
                Ok(b) => bodies.push(b),
                Err(e) => {
                    for &b in &bodies {
                        self.destroy(b);
                    }
                    return Err(e);
                }
            }
        }
        let blind = Blind::Model(ModelData {
            shape: compound,
            bodies: bodies.clone(),
        });
        let model = self.alloc_record(ObjectClass::Model, MemberType::Unset, Some(blind), self.root)?;
        for b in bodies {
            self.record_mut(b)?.top = model;
            self.add_owner(b, model)?;
        }
        Ok(model)
    }

    // --- Attribute transfer ---

    /// Topology objects reachable from `roots` (roots included).
    pub(crate) fn collect_topology(&self, roots: &[ObjectKey]) -> Vec<ObjectKey> {
        let mut seen = rustc_hash::FxHashSet::default();
        let mut stack: Vec<ObjectKey> = roots.to_vec();
        let mut out = Vec::new();
        while let Some(key) = stack.pop() {
            if !seen.insert(key) {
                continue;
            }
            let class = self.class_of(key);
            if !(ObjectClass::Node..=ObjectClass::Shell).contains(&class) {
                continue;
            }
            out.push(key);
            if let Ok(blind) = self.blind(key) {
                stack.extend(blind.references().into_iter().map(|(k, _)| k));
            }
        }
        out
    }

    /// Copies attributes of `sources` onto the objects of `body` that share
    /// their engine entity.
    pub(crate) fn transfer_attrs_by_shape(&mut self, sources: &[ObjectKey], body: ObjectKey) -> Result<()> {
        let mut pairs = Vec::new();
        {
            let data = self.body_data(body)?;
            for &src in sources {
                if self.attrs_of(src).map_or(true, |a| a.len() == 0) {
                    continue;
                }
                let Some(map) = data.map(self.class_of(src)) else {
                    continue;
                };
                let Ok(shape) = self.shape_of(src) else {
                    continue;
                };
                if let Some(i) = self.find_shape(map, shape) {
                    pairs.push((src, map.objs[i]));
                }
            }
        }
        for (src, dst) in pairs {
            self.merge_attrs(src, dst)?;
        }
        Ok(())
    }

    /// Copies attributes of a source body onto a body of identical
    /// structure, matching sub-objects by map index.
    pub(crate) fn copy_attrs_by_index(&mut self, src: ObjectKey, dst: ObjectKey) -> Result<()> {
        let mut pairs = vec![(src, dst)];
        {
            let from = self.body_data(src)?;
            let to = self.body_data(dst)?;
            for class in [
                ObjectClass::Node,
                ObjectClass::Edge,
                ObjectClass::Loop,
                ObjectClass::Face,
                ObjectClass::Shell,
            ] {
                if let (Some(a), Some(b)) = (from.map(class), to.map(class)) {
                    if a.len() != b.len() {
                        egads_log!(self, warn, class = %class, "body maps differ in size");
                        continue;
                    }
                    pairs.extend(a.objs.iter().copied().zip(b.objs.iter().copied()));
                }
            }
        }
        for (a, b) in pairs {
            self.merge_attrs(a, b)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use egads_engine::Primitive;
    use egads_kernel::Kernel;

    fn ctx() -> Context<Kernel> {
        Context::open_with_config(
            Kernel,
            Config {
                out_level: 0,
                overwrite_files: false,
                tess_max_points: 10000,
            },
        )
    }

    fn box_body(ctx: &mut Context<Kernel>) -> ObjectKey {
        let solid = ctx
            .engine
            .make_primitive(&Primitive::Box {
                corner: [0.0; 3],
                size: [1.0, 2.0, 3.0],
            })
            .unwrap();
        ctx.body_from_shape(solid).unwrap()
    }

    #[test]
    fn box_traversal_counts() {
        let mut ctx = ctx();
        let body = box_body(&mut ctx);
        let data = ctx.body_data(body).unwrap();
        assert_eq!(data.nodes.len(), 8);
        assert_eq!(data.edges.len(), 12);
        assert_eq!(data.loops.len(), 6);
        assert_eq!(data.faces.len(), 6);
        assert_eq!(data.shells.len(), 1);
        assert_eq!(data.senses, vec![Sense::Forward]);
    }

    #[test]
    fn sub_objects_point_at_the_body() {
        let mut ctx = ctx();
        let body = box_body(&mut ctx);
        let data = ctx.body_data(body).unwrap();
        for &k in data.nodes.objs.iter().chain(&data.faces.objs) {
            assert_eq!(ctx.objects[k].top, body);
        }
        // Each box edge is shared by two loops.
        for &e in &data.edges.objs {
            assert_eq!(ctx.objects[e].owners.len(), 2);
        }
        // Planar faces keep their surface on the face only.
        for &l in &data.loops.objs {
            match ctx.blind(l).unwrap() {
                Blind::Loop(l) => assert!(l.surface.is_none()),
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn destroying_the_body_releases_everything() {
        let mut ctx = ctx();
        let body = box_body(&mut ctx);
        assert!(ctx.active_count() > 1);
        ctx.destroy(body);
        assert_eq!(ctx.active_count(), 0);
    }

    #[test]
    fn compound_becomes_a_model() {
        let mut ctx = ctx();
        let solid = ctx
            .engine
            .make_primitive(&Primitive::Box {
                corner: [0.0; 3],
                size: [1.0; 3],
            })
            .unwrap();
        let compound = ctx.engine.make_compound(&[solid]).unwrap();
        let model = ctx.model_from_compound(compound).unwrap();
        let bodies = match ctx.blind(model).unwrap() {
            Blind::Model(m) => m.bodies.clone(),
            _ => unreachable!(),
        };
        assert_eq!(bodies.len(), 1);
        assert_eq!(ctx.objects[bodies[0]].top, model);
        assert_eq!(ctx.objects[bodies[0]].owners.as_slice(), &[model]);
    }
}
