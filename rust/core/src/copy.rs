// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Copying and flipping objects.
//!
//! Copies never share objects with their source. Geometry is rebuilt from a
//! transformed (or reversed) engine handle; topology is rebuilt by exploring
//! the new engine shape, so every sub-object of a copied edge, loop, face or
//! shell points at the copy as its top object. Attributes follow the copy.

use egads_engine::{GeometryEngine, Matrix, IDENTITY};

use crate::blind::Blind;
use crate::body::Explorer;
use crate::context::Context;
use crate::error::{EgadsError, Result};
use crate::geometry::GeomHandle;
use crate::object::*;

impl<E: GeometryEngine> Context<E> {
    /// Common checks on the object handed to copy and flip.
    fn copy_source(&self, object: Ego) -> Result<ObjectKey> {
        let key = self.key_of(object)?;
        match self.class_of(key) {
            ObjectClass::Empty | ObjectClass::Nil => Err(EgadsError::Empty),
            ObjectClass::Context => Err(EgadsError::NotAContext),
            ObjectClass::Transform => Err(EgadsError::NotATransform),
            _ => Ok(key),
        }
    }

    /// Copies an object, optionally through a transform.
    ///
    /// Tessellations cannot be copied, and neither can pcurves (they live in
    /// a surface's parameter space).
    pub fn copy_object(&mut self, object: Ego, xform: Option<Ego>) -> Result<Ego> {
        let key = self.copy_source(object)?;
        let matrix = match xform {
            Some(x) => {
                if x.ctx != self.id {
                    egads_log!(self, error, "transform from another context");
                    return Err(EgadsError::MixedContext);
                }
                let xk = self.key_of(x)?;
                if self.class_of(xk) != ObjectClass::Transform {
                    egads_log!(self, error, class = %self.class_of(xk), "second argument is not a transform");
                    return Err(EgadsError::NotATransform);
                }
                Some(self.matrix_of(xk)?)
            }
            None => None,
        };

        let copy = match self.class_of(key) {
            ObjectClass::Tessellation => return Err(EgadsError::NotATessellation),
            ObjectClass::PCurve => {
                egads_log!(self, error, "pcurves are 2D and cannot be copied");
                return Err(EgadsError::ConstructionError("pcurve copy".into()));
            }
            ObjectClass::Curve | ObjectClass::Surface => self.copy_geometry(key, matrix.as_ref())?,
            _ => self.copy_topology(key, matrix.as_ref())?,
        };
        let copy = self.ego(copy);
        self.attribute_dup(object, copy)?;
        Ok(copy)
    }

    /// Creates a copy with reversed orientation.
    ///
    /// Curves reverse their parameterization and surfaces their `u`
    /// direction. Loops, faces and shells reverse their use.
    pub fn flip_object(&mut self, object: Ego) -> Result<Ego> {
        let key = self.copy_source(object)?;
        let flipped = match self.class_of(key) {
            ObjectClass::Tessellation => return Err(EgadsError::NotATessellation),
            ObjectClass::PCurve | ObjectClass::Curve | ObjectClass::Surface => self.flip_geometry(key)?,
            _ => self.flip_topology(key)?,
        };
        let flipped = self.ego(flipped);
        self.attribute_dup(object, flipped)?;
        Ok(flipped)
    }

    // --- Geometry ---

    fn copy_geometry(&mut self, key: ObjectKey, m: Option<&Matrix>) -> Result<ObjectKey> {
        let m = m.unwrap_or(&IDENTITY);
        let handle = match self.blind(key)? {
            Blind::Curve(g) => GeomHandle::Curve(self.engine.transform_curve(&g.handle, m)?),
            Blind::Surface(g) => GeomHandle::Surface(self.engine.transform_surface(&g.handle, m)?),
            other => return Err(EgadsError::NotAGeometry(other.class().to_string())),
        };
        self.adopt_top_geometry(handle)
    }

    fn flip_geometry(&mut self, key: ObjectKey) -> Result<ObjectKey> {
        let handle = match self.blind(key)? {
            Blind::Curve(g) => GeomHandle::Curve(self.engine.reverse_curve(&g.handle)?),
            Blind::Surface(g) => GeomHandle::Surface(self.engine.reverse_surface(&g.handle)?),
            other => {
                egads_log!(self, error, class = %other.class(), "only curves and surfaces can be flipped");
                return Err(EgadsError::NotAGeometry(other.class().to_string()));
            }
        };
        self.adopt_top_geometry(handle)
    }

    // --- Topology ---

    fn copy_topology(&mut self, key: ObjectKey, m: Option<&Matrix>) -> Result<ObjectKey> {
        let class = self.class_of(key);
        if !class.is_topology() {
            return Err(EgadsError::NotATopology(class.to_string()));
        }
        let shape = {
            let shape = self.shape_of(key)?;
            match m {
                Some(m) => self.engine.transform_shape(shape, m)?,
                None => self.engine.copy_shape(shape)?,
            }
        };
        match class {
            ObjectClass::Body => {
                let body = self.body_from_shape(shape)?;
                self.copy_attrs_by_index(key, body)?;
                self.add_owner(body, self.root)?;
                Ok(body)
            }
            ObjectClass::Model => {
                let model = self.model_from_compound(shape)?;
                let pairs: Vec<(ObjectKey, ObjectKey)> = match (self.blind(key)?, self.blind(model)?) {
                    (Blind::Model(a), Blind::Model(b)) if a.bodies.len() == b.bodies.len() => {
                        a.bodies.iter().copied().zip(b.bodies.iter().copied()).collect()
                    }
                    _ => {
                        egads_log!(self, warn, "copied model has a different body count");
                        Vec::new()
                    }
                };
                for (src, dst) in pairs {
                    self.copy_attrs_by_index(src, dst)?;
                }
                self.add_owner(model, self.root)?;
                Ok(model)
            }
            _ => self.rebuild_topology(class, &shape),
        }
    }

    fn flip_topology(&mut self, key: ObjectKey) -> Result<ObjectKey> {
        let class = self.class_of(key);
        if !(ObjectClass::Loop..=ObjectClass::Shell).contains(&class) {
            egads_log!(self, error, class = %class, "only loops, faces and shells can be flipped");
            return Err(EgadsError::NotATopology(class.to_string()));
        }
        let shape = {
            let shape = self.shape_of(key)?;
            self.engine.reverse_shape(shape)?
        };
        self.rebuild_topology(class, &shape)
    }

    /// Explores a node, edge, loop, face or shell shape into a new top-level
    /// object whose sub-objects name it as their top.
    fn rebuild_topology(&mut self, class: ObjectClass, shape: &E::Shape) -> Result<ObjectKey> {
        let mut ex = Explorer::new(self.root);
        let built = match class {
            ObjectClass::Node => self.explore_node(&mut ex, shape),
            ObjectClass::Edge => self.explore_edge(&mut ex, shape),
            ObjectClass::Loop => self.explore_loop(&mut ex, shape),
            ObjectClass::Face => self.explore_face(&mut ex, shape),
            ObjectClass::Shell => self.explore_shell(&mut ex, shape),
            other => Err(EgadsError::NotATopology(other.to_string())),
        };
        let key = match built {
            Ok(key) => key,
            Err(e) => {
                self.discard(&ex.created);
                return Err(e);
            }
        };
        for &child in &ex.created {
            if child != key {
                self.record_mut(child)?.top = key;
            }
        }
        self.add_owner(key, self.root)?;
        egads_log!(self, debug, class = %class, objects = ex.created.len(), "topology rebuilt");
        Ok(key)
    }
}
