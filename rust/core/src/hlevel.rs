// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Feature operations: Booleans, blends, sweeps and primitives.
//!
//! Every engine call runs under [`guarded`], so a panic inside the engine
//! comes back as [`EgadsError::NativeFault`] and the context stays usable.
//! Results are explored into new bodies that inherit the attributes of the
//! entities they were built from.

use std::panic::{self, AssertUnwindSafe};

use egads_engine::{BooleanOp, GeometryEngine, LoftOptions, Primitive, ShapeKind, Vec3};

use crate::blind::Blind;
use crate::context::Context;
use crate::error::{EgadsError, Result};
use crate::object::*;

/// Runs an engine operation, turning a panic into a native fault.
pub(crate) fn guarded<T>(what: &str, op: impl FnOnce() -> egads_engine::Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(result) => result.map_err(EgadsError::from),
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            Err(EgadsError::NativeFault(format!("{what}: {msg}")))
        }
    }
}

impl<E: GeometryEngine> Context<E> {
    fn run<T>(&self, what: &str, op: impl FnOnce(&E) -> egads_engine::Result<T>) -> Result<T> {
        let engine = &self.engine;
        let result = guarded(what, || op(engine));
        if let Err(e) = &result {
            egads_log!(self, error, operation = what, error = %e, "feature operation failed");
        }
        result
    }

    fn solid_key(&self, ego: Ego) -> Result<ObjectKey> {
        let key = self.member_key(ego)?;
        match self.objects[key].mtype {
            MemberType::Body(BodyType::SolidBody) if self.class_of(key) == ObjectClass::Body => Ok(key),
            _ => {
                egads_log!(self, error, class = %self.class_of(key), "expected a solid body");
                Err(EgadsError::NotABody)
            }
        }
    }

    /// Sub-objects of `body` whose engine entities feed an operation.
    fn body_members(&self, body: ObjectKey, egos: &[Ego], class: ObjectClass) -> Result<Vec<E::Shape>> {
        let mut shapes = Vec::with_capacity(egos.len());
        for &e in egos {
            let k = self.member_key(e)?;
            if self.class_of(k) != class {
                return Err(EgadsError::NotATopology(format!("{} where a {class} is needed", self.class_of(k))));
            }
            self.index_body_topo(self.ego(body), e)?;
            shapes.push(self.shape_of(k)?.clone());
        }
        Ok(shapes)
    }

    /// Every attribute carrier below a body, the body excluded.
    fn body_sources(&self, body: ObjectKey) -> Result<Vec<ObjectKey>> {
        let data = self.body_data(body)?;
        Ok(data
            .nodes
            .objs
            .iter()
            .chain(&data.edges.objs)
            .chain(&data.loops.objs)
            .chain(&data.faces.objs)
            .chain(&data.shells.objs)
            .copied()
            .collect())
    }

    /// Explores an operation result into a context-owned body carrying the
    /// attributes of `from`.
    fn result_body(&mut self, shape: E::Shape, from: Option<ObjectKey>, extra: &[ObjectKey]) -> Result<Ego> {
        let body = self.body_from_shape(shape)?;
        let mut sources = extra.to_vec();
        if let Some(src) = from {
            if self.class_of(src) == ObjectClass::Body {
                sources.extend(self.body_sources(src)?);
                self.merge_attrs(src, body)?;
            }
        }
        self.transfer_attrs_by_shape(&sources, body)?;
        self.add_owner(body, self.root)?;
        Ok(self.ego(body))
    }

    /// Shape of a loop, face, wire body or face body.
    fn profile_shape(&self, src: Ego) -> Result<(ObjectKey, E::Shape)> {
        let key = self.member_key(src)?;
        let ok = match self.objects[key].class {
            ObjectClass::Loop | ObjectClass::Face => true,
            ObjectClass::Body => matches!(
                self.objects[key].mtype,
                MemberType::Body(BodyType::WireBody | BodyType::FaceBody)
            ),
            _ => false,
        };
        if !ok {
            egads_log!(self, error, class = %self.class_of(key), "cannot sweep this object");
            return Err(EgadsError::NotATopology(self.class_of(key).to_string()));
        }
        Ok((key, self.shape_of(key)?.clone()))
    }

    /// Attribute sources of a profile: the body's members, or the loop or
    /// face with everything below it.
    fn profile_sources(&self, key: ObjectKey) -> Result<Vec<ObjectKey>> {
        if self.class_of(key) == ObjectClass::Body {
            self.body_sources(key)
        } else {
            Ok(self.collect_topology(&[key]))
        }
    }

    // --- Operations ---

    /// Boolean of a solid body (or every body of a model) with a solid tool.
    /// The result is a new model.
    pub fn solid_boolean(&mut self, src: Ego, tool: Ego, op: BooleanOp) -> Result<Ego> {
        let sk = self.member_key(src)?;
        let src_bodies = match self.blind(sk)? {
            Blind::Model(m) => m.bodies.clone(),
            Blind::Body(_) => vec![self.solid_key(src)?],
            _ => {
                egads_log!(self, error, class = %self.class_of(sk), "boolean source is not a body or model");
                return Err(EgadsError::NotATopology(self.class_of(sk).to_string()));
            }
        };
        let tk = self.solid_key(tool)?;

        let a = self.shape_of(sk)?.clone();
        let b = self.shape_of(tk)?.clone();
        let mut shape = self.run("boolean", |e| e.boolean(&a, &b, op))?;
        if self.engine.shape_kind(&shape)? != ShapeKind::Compound {
            shape = self.engine.make_compound(&[shape])?;
        }

        let mut sources = Vec::new();
        for &key in src_bodies.iter().chain([&tk]) {
            sources.extend(self.body_sources(key)?);
        }
        let model = self.model_from_compound(shape)?;
        let bodies = match self.blind(model)? {
            Blind::Model(m) => m.bodies.clone(),
            _ => Vec::new(),
        };
        for body in bodies {
            self.transfer_attrs_by_shape(&sources, body)?;
        }
        self.add_owner(model, self.root)?;
        egads_log!(self, debug, op = op as i32, "boolean done");
        Ok(self.ego(model))
    }

    /// Rounds `edges` of a solid body.
    pub fn fillet_body(&mut self, body: Ego, edges: &[Ego], radius: f64) -> Result<Ego> {
        let bk = self.solid_key(body)?;
        if edges.is_empty() {
            return Err(EgadsError::RangeError("fillet without edges".into()));
        }
        let es = self.body_members(bk, edges, ObjectClass::Edge)?;
        let shape = self.shape_of(bk)?.clone();
        let result = self.run("fillet", |e| e.fillet(&shape, &es, radius))?;
        self.result_body(result, Some(bk), &[])
    }

    /// Bevels edges of a solid body. `faces[i]` is the reference face of
    /// `edges[i]` for the first distance.
    pub fn chamfer_body(&mut self, body: Ego, edges: &[Ego], faces: &[Ego], d1: f64, d2: f64) -> Result<Ego> {
        let bk = self.solid_key(body)?;
        if edges.is_empty() || edges.len() != faces.len() {
            return Err(EgadsError::RangeError(format!(
                "{} edges with {} faces",
                edges.len(),
                faces.len()
            )));
        }
        let es = self.body_members(bk, edges, ObjectClass::Edge)?;
        let fs = self.body_members(bk, faces, ObjectClass::Face)?;
        let pairs: Vec<_> = es.into_iter().zip(fs).collect();
        let shape = self.shape_of(bk)?.clone();
        let result = self.run("chamfer", |e| e.chamfer(&shape, &pairs, d1, d2))?;
        self.result_body(result, Some(bk), &[])
    }

    /// Offsets a solid body into a thick shell, removing `faces`.
    pub fn hollow_body(&mut self, body: Ego, faces: &[Ego], offset: f64, intersect: bool) -> Result<Ego> {
        let bk = self.solid_key(body)?;
        let fs = self.body_members(bk, faces, ObjectClass::Face)?;
        let shape = self.shape_of(bk)?.clone();
        let result = self.run("hollow", |e| e.hollow(&shape, &fs, offset, intersect))?;
        self.result_body(result, Some(bk), &[])
    }

    /// Linear extrusion of a loop, face, wire body or face body.
    pub fn extrude(&mut self, src: Ego, distance: f64, direction: &Vec3) -> Result<Ego> {
        let (key, shape) = self.profile_shape(src)?;
        let result = self.run("extrude", |e| e.extrude(&shape, distance, direction))?;
        let sources = self.profile_sources(key)?;
        self.result_body(result, Some(key), &sources)
    }

    /// Revolution about `axis` (`[origin, direction]`) by `angle` degrees.
    pub fn rotate(&mut self, src: Ego, angle: f64, axis: &[f64; 6]) -> Result<Ego> {
        let (key, shape) = self.profile_shape(src)?;
        let result = self.run("revolve", |e| e.revolve(&shape, angle, axis))?;
        let sources = self.profile_sources(key)?;
        self.result_body(result, Some(key), &sources)
    }

    /// Sweeps a profile along an edge.
    pub fn sweep(&mut self, src: Ego, spine: Ego, mode: i32) -> Result<Ego> {
        let (key, shape) = self.profile_shape(src)?;
        let spine = self.member_key(spine)?;
        if self.class_of(spine) != ObjectClass::Edge {
            return Err(EgadsError::NotATopology(format!("{} spine", self.class_of(spine))));
        }
        let path = self.shape_of(spine)?.clone();
        let result = self.run("sweep", |e| e.sweep(&shape, &path, mode))?;
        let sources = self.profile_sources(key)?;
        self.result_body(result, Some(key), &sources)
    }

    /// Lofts through loop sections, in order.
    pub fn loft(&mut self, sections: &[Ego], options: LoftOptions) -> Result<Ego> {
        if sections.len() < 2 {
            return Err(EgadsError::RangeError(format!("{} loft sections", sections.len())));
        }
        let mut keys = Vec::with_capacity(sections.len());
        let mut shapes = Vec::with_capacity(sections.len());
        for &s in sections {
            let k = self.member_key(s)?;
            if self.class_of(k) != ObjectClass::Loop {
                return Err(EgadsError::NotATopology(format!("{} section", self.class_of(k))));
            }
            shapes.push(self.shape_of(k)?.clone());
            keys.push(k);
        }
        let result = self.run("loft", |e| e.loft(&shapes, options))?;
        let sources = self.collect_topology(&keys);
        self.result_body(result, None, &sources)
    }

    pub fn make_solid_body(&mut self, primitive: &Primitive) -> Result<Ego> {
        let shape = self.run("primitive", |e| e.make_primitive(primitive))?;
        self.result_body(shape, None, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use egads_engine::EngineError;
    use egads_kernel::Kernel;

    fn quiet() -> Config {
        Config {
            out_level: 0,
            overwrite_files: false,
            tess_max_points: 10000,
        }
    }

    fn unit_box(ctx: &mut Context<Kernel>) -> Ego {
        ctx.make_solid_body(&Primitive::Box {
            corner: [0.0; 3],
            size: [1.0, 1.0, 1.0],
        })
        .unwrap()
    }

    /// Engine whose every primitive panics.
    struct Faulty;

    impl GeometryEngine for Faulty {
        type Shape = ();
        type Curve = ();
        type PCurve = ();
        type Surface = ();

        fn make_primitive(&self, _: &Primitive) -> egads_engine::Result<()> {
            panic!("kernel exploded")
        }
    }

    #[test]
    fn box_body_is_context_owned() {
        let mut ctx = Context::open_with_config(Kernel, quiet());
        let body = unit_box(&mut ctx);
        assert_eq!(ctx.get_info(body).unwrap().mtype, MemberType::Body(BodyType::SolidBody));
        assert_eq!(ctx.owners(body).unwrap(), vec![ctx.context_handle()]);
        assert_eq!(ctx.get_body_topos(body, None, ObjectClass::Face).unwrap().len(), 6);
    }

    #[test]
    fn panics_become_native_faults() {
        let mut ctx = Context::open_with_config(Faulty, quiet());
        let r = ctx.make_solid_body(&Primitive::Box {
            corner: [0.0; 3],
            size: [1.0; 3],
        });
        assert!(matches!(r, Err(EgadsError::NativeFault(msg)) if msg.contains("kernel exploded")));
        // Still usable afterwards.
        assert!(ctx.make_object().is_ok());
    }

    #[test]
    fn guarded_passes_engine_errors_through() {
        let r: Result<()> = guarded("test", || Err(EngineError::Degenerate("flat".into())));
        assert!(matches!(r, Err(EgadsError::DegenerateGeometry(_))));
    }

    #[test]
    fn extruded_face_keeps_its_attributes() {
        let mut ctx = Context::open_with_config(Kernel, quiet());
        let body = unit_box(&mut ctx);
        ctx.attribute_add(body, "name", crate::AttrData::Str("block")).unwrap();
        let faces = ctx.get_body_topos(body, None, ObjectClass::Face).unwrap();
        ctx.attribute_add(faces[0], "color", crate::AttrData::Ints(&[1, 2, 3])).unwrap();
        let sheet = ctx.make_body(BodyType::FaceBody, &[faces[0]]).unwrap();
        let face = ctx.get_body_topos(sheet, None, ObjectClass::Face).unwrap()[0];
        assert_eq!(ctx.attribute_num(face).unwrap(), 1);

        let solid = ctx.extrude(sheet, 2.0, &[0.0, 0.0, 1.0]).unwrap();
        assert_eq!(ctx.get_info(solid).unwrap().mtype, MemberType::Body(BodyType::SolidBody));
        let tagged = ctx
            .get_body_topos(solid, None, ObjectClass::Face)
            .unwrap()
            .into_iter()
            .filter(|&f| ctx.attribute_num(f).unwrap() > 0)
            .count();
        assert_eq!(tagged, 1);
    }

    #[test]
    fn boolean_requires_solids() {
        let mut ctx = Context::open_with_config(Kernel, quiet());
        let body = unit_box(&mut ctx);
        let faces = ctx.get_body_topos(body, None, ObjectClass::Face).unwrap();
        let sheet = ctx.make_body(BodyType::FaceBody, &[faces[0]]).unwrap();
        assert_eq!(
            ctx.solid_boolean(body, sheet, BooleanOp::Fusion),
            Err(EgadsError::NotABody)
        );
        // The reference kernel has no Booleans.
        let other = unit_box(&mut ctx);
        assert!(matches!(
            ctx.solid_boolean(body, other, BooleanOp::Fusion),
            Err(EgadsError::GeometryError(_))
        ));
    }
}
