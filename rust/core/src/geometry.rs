// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry objects: pcurves, curves and surfaces.
//!
//! Geometry built by the caller is top-level and holds its basis through
//! the basis' top object. Geometry found while exploring a body or a copied
//! shape is owned by the topology that uses it and holds its basis directly.

use egads_engine::{Basis, BasisKind, CurveDef, CurveEval, GeometryEngine, Range, SurfaceDef, SurfaceEval, Vec3};

use crate::blind::{Blind, GeomData};
use crate::context::Context;
use crate::error::{EgadsError, Result};
use crate::object::{Ego, MemberType, ObjectClass, ObjectKey};

/// Definition of a curve (or pcurve) or a surface.
#[derive(Debug, Clone, PartialEq)]
pub enum GeomDef {
    Curve(CurveDef),
    Surface(SurfaceDef),
}

/// Result of [`Context::get_geometry`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryInfo {
    pub class: ObjectClass,
    pub mtype: MemberType,
    pub def: GeomDef,
    pub basis: Option<Ego>,
}

/// Result of [`Context::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// A node's position.
    Point(Vec3),
    Curve(CurveEval),
    Surface(SurfaceEval),
}

impl Evaluation {
    pub fn point(&self) -> Vec3 {
        match self {
            Evaluation::Point(p) => *p,
            Evaluation::Curve(c) => c.point,
            Evaluation::Surface(s) => s.point,
        }
    }
}

/// Result of [`Context::inv_evaluate`]. Curves use `params[0]` only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inversion {
    pub params: [f64; 2],
    pub point: Vec3,
}

impl<E: GeometryEngine> Context<E> {
    // --- Payload access ---

    pub(crate) fn curve_handle(&self, key: ObjectKey) -> Result<&E::Curve> {
        match self.blind(key)? {
            Blind::Curve(g) => Ok(&g.handle),
            other => Err(EgadsError::NotAGeometry(format!("{} is not a curve", other.class()))),
        }
    }

    pub(crate) fn pcurve_handle(&self, key: ObjectKey) -> Result<&E::PCurve> {
        match self.blind(key)? {
            Blind::PCurve(g) => Ok(&g.handle),
            other => Err(EgadsError::NotAGeometry(format!("{} is not a pcurve", other.class()))),
        }
    }

    pub(crate) fn surface_handle(&self, key: ObjectKey) -> Result<&E::Surface> {
        match self.blind(key)? {
            Blind::Surface(g) => Ok(&g.handle),
            other => Err(EgadsError::NotAGeometry(format!("{} is not a surface", other.class()))),
        }
    }

    // --- Wrapping engine handles ---

    /// Wraps an engine curve (and its basis chain) as objects under `top`.
    pub(crate) fn adopt_curve(
        &mut self,
        handle: E::Curve,
        top: ObjectKey,
        created: &mut Vec<ObjectKey>,
    ) -> Result<ObjectKey> {
        let (def, basis) = self.engine.describe_curve(&handle)?;
        let basis = match basis {
            Some(b) => Some(self.adopt_curve(b, top, created)?),
            None => None,
        };
        let blind = Blind::Curve(GeomData {
            handle,
            basis,
            top_flag: false,
        });
        let key = self.alloc_record(ObjectClass::Curve, MemberType::Curve(def.curve_type()), Some(blind), top)?;
        created.push(key);
        if let Some(b) = basis {
            self.add_owner(b, key)?;
        }
        Ok(key)
    }

    pub(crate) fn adopt_pcurve(
        &mut self,
        handle: E::PCurve,
        top: ObjectKey,
        created: &mut Vec<ObjectKey>,
    ) -> Result<ObjectKey> {
        let (def, basis) = self.engine.describe_pcurve(&handle)?;
        let basis = match basis {
            Some(b) => Some(self.adopt_pcurve(b, top, created)?),
            None => None,
        };
        let blind = Blind::PCurve(GeomData {
            handle,
            basis,
            top_flag: false,
        });
        let key = self.alloc_record(ObjectClass::PCurve, MemberType::Curve(def.curve_type()), Some(blind), top)?;
        created.push(key);
        if let Some(b) = basis {
            self.add_owner(b, key)?;
        }
        Ok(key)
    }

    pub(crate) fn adopt_surface(
        &mut self,
        handle: E::Surface,
        top: ObjectKey,
        created: &mut Vec<ObjectKey>,
    ) -> Result<ObjectKey> {
        let (def, basis) = self.engine.describe_surface(&handle)?;
        let basis = match basis {
            Some(Basis::Curve(c)) => Some(self.adopt_curve(c, top, created)?),
            Some(Basis::Surface(s)) => Some(self.adopt_surface(s, top, created)?),
            None => None,
        };
        let blind = Blind::Surface(GeomData {
            handle,
            basis,
            top_flag: false,
        });
        let key = self.alloc_record(
            ObjectClass::Surface,
            MemberType::Surface(def.surface_type()),
            Some(blind),
            top,
        )?;
        created.push(key);
        if let Some(b) = basis {
            self.add_owner(b, key)?;
        }
        Ok(key)
    }

    /// Wraps a geometry handle as a new top-level object owned by the context.
    pub(crate) fn adopt_top_geometry(&mut self, handle: GeomHandle<E>) -> Result<ObjectKey> {
        let mut created = Vec::new();
        let root = self.root;
        let key = match handle {
            GeomHandle::Curve(c) => self.adopt_curve(c, root, &mut created),
            GeomHandle::Surface(s) => self.adopt_surface(s, root, &mut created),
        };
        match key {
            Ok(key) => {
                self.add_owner(key, root)?;
                Ok(key)
            }
            Err(e) => {
                self.discard(&created);
                Err(e)
            }
        }
    }

    /// Releases records built by a failed operation, newest first.
    pub(crate) fn discard(&mut self, created: &[ObjectKey]) {
        for &key in created.iter().rev() {
            if let Some(record) = self.objects.get_mut(key) {
                record.blind = None;
                record.attrs = None;
            }
            self.release_to_pool(key);
        }
    }

    // --- Builders ---

    /// Creates a pcurve, curve or surface.
    ///
    /// Trimmed and offset definitions (and swept surfaces) need a `basis` of
    /// the matching class; for other definitions `basis` is ignored.
    pub fn make_geometry(&mut self, class: ObjectClass, def: &GeomDef, basis: Option<Ego>) -> Result<Ego> {
        if !class.is_geometry() {
            egads_log!(self, error, class = %class, "make_geometry with a non-geometry class");
            return Err(EgadsError::NotAGeometry(class.to_string()));
        }

        let needed = match (class, def) {
            (ObjectClass::PCurve, GeomDef::Curve(d)) => d.needs_basis().then_some(ObjectClass::PCurve),
            (ObjectClass::Curve, GeomDef::Curve(d)) => d.needs_basis().then_some(ObjectClass::Curve),
            (ObjectClass::Surface, GeomDef::Surface(d)) => d.basis_kind().map(|k| match k {
                BasisKind::Curve => ObjectClass::Curve,
                BasisKind::Surface => ObjectClass::Surface,
            }),
            _ => {
                egads_log!(self, error, class = %class, "definition does not match the class");
                return Err(EgadsError::RangeError(format!("{class} definition")));
            }
        };

        let basis = match needed {
            None => None,
            Some(want) => {
                let Some(b) = basis else {
                    egads_log!(self, error, class = %class, "derived geometry without a basis");
                    return Err(EgadsError::NullObject("basis".into()));
                };
                let key = self.member_key(b)?;
                let got = self.class_of(key);
                if got != want {
                    egads_log!(self, error, basis = %got, "basis of the wrong class");
                    return Err(EgadsError::NotAGeometry(format!("basis is a {got}")));
                }
                self.blind(key)?;
                Some(key)
            }
        };

        let (blind, mtype) = match (class, def) {
            (ObjectClass::PCurve, GeomDef::Curve(d)) => {
                let b = basis.map(|k| self.pcurve_handle(k)).transpose()?;
                let handle = self.engine.make_pcurve(d, b)?;
                let data = GeomData { handle, basis, top_flag: true };
                (Blind::PCurve(data), MemberType::Curve(d.curve_type()))
            }
            (ObjectClass::Curve, GeomDef::Curve(d)) => {
                let b = basis.map(|k| self.curve_handle(k)).transpose()?;
                let handle = self.engine.make_curve(d, b)?;
                let data = GeomData { handle, basis, top_flag: true };
                (Blind::Curve(data), MemberType::Curve(d.curve_type()))
            }
            (_, GeomDef::Surface(d)) => {
                let b = match basis {
                    None => None,
                    Some(k) => match self.blind(k)? {
                        Blind::Curve(g) => Some(Basis::Curve(&g.handle)),
                        Blind::Surface(g) => Some(Basis::Surface(&g.handle)),
                        _ => None,
                    },
                };
                let handle = self.engine.make_surface(d, b)?;
                let data = GeomData { handle, basis, top_flag: true };
                (Blind::Surface(data), MemberType::Surface(d.surface_type()))
            }
            _ => return Err(EgadsError::RangeError(format!("{class} definition"))),
        };

        let key = self.alloc_record(class, mtype, Some(blind), self.root)?;
        self.add_owner(key, self.root)?;
        if let Some(b) = basis {
            self.add_top_owner(b, key)?;
        }
        egads_log!(self, debug, class = %class, mtype = mtype.code(), "geometry created");
        Ok(self.ego(key))
    }

    // --- Queries ---

    pub fn get_geometry(&self, geom: Ego) -> Result<GeometryInfo> {
        let key = self.live_key(geom)?;
        let record = &self.objects[key];
        let (def, basis) = match self.blind(key)? {
            Blind::PCurve(g) => (GeomDef::Curve(self.engine.describe_pcurve(&g.handle)?.0), g.basis),
            Blind::Curve(g) => (GeomDef::Curve(self.engine.describe_curve(&g.handle)?.0), g.basis),
            Blind::Surface(g) => (GeomDef::Surface(self.engine.describe_surface(&g.handle)?.0), g.basis),
            other => return Err(EgadsError::NotAGeometry(other.class().to_string())),
        };
        Ok(GeometryInfo {
            class: record.class,
            mtype: record.mtype,
            def,
            basis: basis.map(|k| self.ego(k)),
        })
    }

    /// Parametric range of geometry, an Edge or a Face.
    pub fn get_range(&self, ego: Ego) -> Result<Range> {
        let key = self.live_key(ego)?;
        let range = match self.blind(key)? {
            Blind::PCurve(g) => self.engine.pcurve_range(&g.handle)?,
            Blind::Curve(g) => self.engine.curve_range(&g.handle)?,
            Blind::Surface(g) => self.engine.surface_range(&g.handle)?,
            Blind::Edge(e) => self.engine.shape_range(&e.shape)?,
            Blind::Face(f) => self.engine.shape_range(&f.shape)?,
            other => return Err(EgadsError::NotAGeometry(format!("no range for a {}", other.class()))),
        };
        Ok(range)
    }

    /// Evaluates at `params`: one value for curves and edges, two for
    /// surfaces and faces, none for nodes.
    pub fn evaluate(&self, ego: Ego, params: &[f64]) -> Result<Evaluation> {
        let key = self.live_key(ego)?;
        let need = |n: usize| {
            if params.len() < n {
                Err(EgadsError::IndexError(format!("{n} parameters needed, {} given", params.len())))
            } else {
                Ok(())
            }
        };
        let eval = match self.blind(key)? {
            Blind::Node(n) => Evaluation::Point(n.xyz),
            Blind::PCurve(g) => {
                need(1)?;
                Evaluation::Curve(self.engine.eval_pcurve(&g.handle, params[0])?)
            }
            Blind::Curve(g) => {
                need(1)?;
                Evaluation::Curve(self.engine.eval_curve(&g.handle, params[0])?)
            }
            Blind::Edge(e) => {
                need(1)?;
                match e.curve {
                    Some(c) => Evaluation::Curve(self.engine.eval_curve(self.curve_handle(c)?, params[0])?),
                    None => Evaluation::Curve(CurveEval {
                        point: self.node_xyz(e.nodes[0])?,
                        d1: [0.0; 3],
                        d2: [0.0; 3],
                    }),
                }
            }
            Blind::Surface(g) => {
                need(2)?;
                Evaluation::Surface(self.engine.eval_surface(&g.handle, params[0], params[1])?)
            }
            Blind::Face(f) => {
                need(2)?;
                let s = self.surface_handle(f.surface)?;
                Evaluation::Surface(self.engine.eval_surface(s, params[0], params[1])?)
            }
            other => return Err(EgadsError::NotAGeometry(format!("cannot evaluate a {}", other.class()))),
        };
        Ok(eval)
    }

    /// Closest point and its parameters. For pcurves `xyz` holds `(u, v)`.
    pub fn inv_evaluate(&self, ego: Ego, xyz: &Vec3) -> Result<Inversion> {
        let key = self.live_key(ego)?;
        let curve = |(t, point): (f64, Vec3)| Inversion { params: [t, 0.0], point };
        let surface = |(uv, point): ([f64; 2], Vec3)| Inversion { params: uv, point };
        let inv = match self.blind(key)? {
            Blind::Node(n) => Inversion {
                params: [0.0; 2],
                point: n.xyz,
            },
            Blind::PCurve(g) => curve(self.engine.invert_pcurve(&g.handle, &[xyz[0], xyz[1]])?),
            Blind::Curve(g) => curve(self.engine.invert_curve(&g.handle, xyz)?),
            Blind::Edge(e) => match e.curve {
                Some(c) => {
                    let (t, point) = self.engine.invert_curve(self.curve_handle(c)?, xyz)?;
                    let [t0, t1] = self.engine.edge_range(&e.shape)?;
                    let t = t.clamp(t0, t1);
                    let point = self.engine.eval_curve(self.curve_handle(c)?, t).map(|ev| ev.point).unwrap_or(point);
                    curve((t, point))
                }
                None => curve((self.engine.edge_range(&e.shape)?[0], self.node_xyz(e.nodes[0])?)),
            },
            Blind::Surface(g) => surface(self.engine.invert_surface(&g.handle, xyz)?),
            Blind::Face(f) => surface(self.engine.invert_surface(self.surface_handle(f.surface)?, xyz)?),
            other => return Err(EgadsError::NotAGeometry(format!("cannot invert on a {}", other.class()))),
        };
        Ok(inv)
    }

    pub(crate) fn node_xyz(&self, key: ObjectKey) -> Result<Vec3> {
        match self.blind(key)? {
            Blind::Node(n) => Ok(n.xyz),
            other => Err(EgadsError::NotATopology(format!("{} is not a node", other.class()))),
        }
    }
}

/// An owned engine geometry handle.
pub(crate) enum GeomHandle<E: GeometryEngine> {
    Curve(E::Curve),
    Surface(E::Surface),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use approx::assert_relative_eq;
    use egads_engine::{CurveType, Frame};
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

    fn line(ctx: &mut Context<Kernel>) -> Ego {
        let def = GeomDef::Curve(CurveDef::Line {
            origin: [0.0; 3],
            direction: [1.0, 0.0, 0.0],
        });
        ctx.make_geometry(ObjectClass::Curve, &def, None).unwrap()
    }

    #[test]
    fn line_evaluates_and_inverts() {
        let mut ctx = ctx();
        let l = line(&mut ctx);
        let info = ctx.get_info(l).unwrap();
        assert_eq!(info.mtype, MemberType::Curve(CurveType::Line));
        let p = ctx.evaluate(l, &[2.0]).unwrap().point();
        assert_relative_eq!(p[0], 2.0);
        let inv = ctx.inv_evaluate(l, &[3.0, 1.0, 0.0]).unwrap();
        assert_relative_eq!(inv.params[0], 3.0, epsilon = 1e-9);
        assert!(matches!(ctx.evaluate(l, &[]), Err(EgadsError::IndexError(_))));
    }

    #[test]
    fn trimmed_curve_holds_its_basis() {
        let mut ctx = ctx();
        let l = line(&mut ctx);
        let def = GeomDef::Curve(CurveDef::Trimmed { t_min: 0.0, t_max: 1.0 });
        assert!(matches!(
            ctx.make_geometry(ObjectClass::Curve, &def, None),
            Err(EgadsError::NullObject(_))
        ));
        let t = ctx.make_geometry(ObjectClass::Curve, &def, Some(l)).unwrap();
        assert_eq!(ctx.owner_count(l).unwrap(), 2);
        assert_eq!(ctx.get_geometry(t).unwrap().basis, Some(l));

        // The basis survives its own delete while the trimmed curve holds it.
        assert_eq!(ctx.delete_object(l).unwrap(), crate::DerefStatus::InUse(1));
        assert_eq!(ctx.delete_object(t).unwrap(), crate::DerefStatus::Destroyed);
        assert_eq!(ctx.owner_count(l).unwrap(), 1);
        assert_eq!(ctx.delete_object(l).unwrap(), crate::DerefStatus::Destroyed);
    }

    #[test]
    fn class_and_definition_must_agree() {
        let mut ctx = ctx();
        let def = GeomDef::Surface(egads_engine::SurfaceDef::Plane {
            frame: Frame::xy([0.0; 3]),
        });
        assert!(matches!(
            ctx.make_geometry(ObjectClass::Curve, &def, None),
            Err(EgadsError::RangeError(_))
        ));
        assert!(matches!(
            ctx.make_geometry(ObjectClass::Node, &def, None),
            Err(EgadsError::NotAGeometry(_))
        ));
        let plane = ctx.make_geometry(ObjectClass::Surface, &def, None).unwrap();
        let range = ctx.get_range(plane).unwrap();
        assert!(matches!(range, Range::Surface { .. }));
    }
}
