// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ownership edges and teardown.
//!
//! An object lives while its owner list is non-empty. Every builder adds the
//! context as an owner (the keepalive), and every composite object adds
//! itself as an owner of its children. Removing the last edge destroys the
//! payload, which in turn releases the children.

use egads_engine::GeometryEngine;

use crate::blind::Blind;
use crate::context::Context;
use crate::error::{EgadsError, Result};
use crate::object::*;

impl<E: GeometryEngine> Context<E> {
    // --- Adding edges ---

    /// Adds `owner` to the owners of `child` and returns the new owner count.
    pub fn reference_object(&mut self, child: Ego, owner: Ego) -> Result<usize> {
        let child = self.live_key(child)?;
        let owner = self.owner_key(owner)?;
        self.add_owner(child, owner)
    }

    /// Like [`reference_object`](Self::reference_object), but references the
    /// child's body or model when the child is not top-level.
    pub fn reference_top_obj(&mut self, child: Ego, owner: Ego) -> Result<usize> {
        let child = self.live_key(child)?;
        let owner = self.owner_key(owner)?;
        self.add_top_owner(child, owner)
    }

    fn owner_key(&self, owner: Ego) -> Result<ObjectKey> {
        if owner.ctx != self.id {
            egads_log!(self, error, "reference from another context");
            return Err(EgadsError::MixedContext);
        }
        let key = self.key_of(owner)?;
        if self.objects[key].class == ObjectClass::Nil {
            egads_log!(self, error, "reference is empty");
            return Err(EgadsError::Empty);
        }
        Ok(key)
    }

    pub(crate) fn add_owner(&mut self, child: ObjectKey, owner: ObjectKey) -> Result<usize> {
        let record = self.record_mut(child)?;
        record
            .owners
            .try_reserve(1)
            .map_err(|_| EgadsError::MallocError)?;
        record.owners.push(owner);
        let count = record.owners.len();
        egads_log!(self, trace, count, "reference added");
        Ok(count)
    }

    pub(crate) fn add_top_owner(&mut self, child: ObjectKey, owner: ObjectKey) -> Result<usize> {
        let top = self.record(child)?.top;
        let target = if top == self.root { child } else { top };
        self.add_owner(target, owner)
    }

    // --- Removing edges ---

    /// Removes the ownership edge from `owner` (the context when `None`).
    ///
    /// An explicit context owner is refused while the object is top-level and
    /// still owned by something else; `None` always removes the context edge.
    pub fn dereference_object(&mut self, object: Ego, owner: Option<Ego>) -> Result<DerefStatus> {
        let key = self.key_of(object)?;
        if key == self.root {
            return Err(EgadsError::NotAContext);
        }
        let owner = owner.map(|o| self.owner_key(o)).transpose()?;
        self.deref(key, owner, false)
    }

    /// Climbs to the object's body or model and removes the edge there.
    /// A teardown triggered this way leaves the children referenced.
    pub fn dereference_top_obj(&mut self, object: Ego, owner: Option<Ego>) -> Result<DerefStatus> {
        let key = self.live_key(object)?;
        let owner = owner.map(|o| self.owner_key(o)).transpose()?;
        self.deref_top(key, owner)
    }

    pub(crate) fn deref_top(&mut self, key: ObjectKey, owner: Option<ObjectKey>) -> Result<DerefStatus> {
        let record = self.record(key)?;
        if record.class == ObjectClass::Nil {
            return Err(EgadsError::Empty);
        }
        let target = if record.top == self.root { key } else { record.top };
        self.deref(target, owner, true)
    }

    pub(crate) fn deref(
        &mut self,
        key: ObjectKey,
        owner: Option<ObjectKey>,
        shallow: bool,
    ) -> Result<DerefStatus> {
        let root = self.root;
        let record = self.record(key)?;
        if record.class == ObjectClass::Context {
            return Err(EgadsError::NotAContext);
        }

        if owner == Some(root) && !record.owners.is_empty() && record.top == root {
            let others = record.owners.iter().filter(|&&o| o != root).count();
            if others > 0 {
                egads_log!(self, warn, active = others, "dereference with active objects");
                return Ok(DerefStatus::InUse(others));
            }
        }

        if !record.owners.is_empty() {
            let wanted = owner.unwrap_or(root);
            let Some(pos) = record.owners.iter().position(|&o| o == wanted) else {
                if owner.is_some() {
                    egads_log!(
                        self,
                        error,
                        class = %record.class,
                        mtype = record.mtype.code(),
                        owner = %self.class_of(wanted),
                        "Ref Not Found"
                    );
                }
                return Err(EgadsError::NotFound("reference".into()));
            };
            let record = self.record_mut(key)?;
            record.owners.remove(pos);
            if !record.owners.is_empty() {
                return Ok(DerefStatus::Released);
            }
        }

        self.teardown(key, shallow);
        Ok(DerefStatus::Destroyed)
    }

    /// Destroys an object's attributes and payload and returns the record to
    /// the pool. Children are released unless `shallow`.
    fn teardown(&mut self, key: ObjectKey, shallow: bool) {
        let Some(record) = self.objects.get_mut(key) else {
            return;
        };
        record.attrs = None;
        let class = record.class;
        let blind = record.blind.take();
        if let Some(blind) = blind {
            match &blind {
                Blind::Tessellation(t) => {
                    let _ = self.deref_top(t.src, Some(key));
                }
                _ if !shallow => {
                    for (child, via_top) in blind.references() {
                        let _ = if via_top {
                            self.deref_top(child, Some(key))
                        } else {
                            self.deref(child, Some(key), false)
                        };
                    }
                }
                _ => {}
            }
        }
        egads_log!(self, trace, class = %class, shallow, "object destroyed");
        self.release_to_pool(key);
    }

    /// Drops every ownership edge of an object and tears it down.
    pub(crate) fn destroy(&mut self, key: ObjectKey) {
        if let Some(record) = self.objects.get_mut(key) {
            record.owners.clear();
            self.teardown(key, false);
        }
    }

    /// Removes the context keepalive without ever tearing the object down.
    pub fn remove_context_ref(&mut self, object: Ego) -> Result<()> {
        let key = self.live_key(object)?;
        self.remove_context_owner(key)
    }

    pub(crate) fn remove_context_owner(&mut self, key: ObjectKey) -> Result<()> {
        let root = self.root;
        let record = self.record_mut(key)?;
        if record.owners.is_empty() {
            return Ok(());
        }
        let pos = record
            .owners
            .iter()
            .position(|&o| o == root)
            .ok_or_else(|| EgadsError::NotFound("context reference".into()))?;
        record.owners.remove(pos);
        Ok(())
    }

    // --- Deletion ---

    /// User-facing delete.
    ///
    /// For an object this removes the context keepalive. A model is left
    /// alone while any of its bodies has outside owners. For the context
    /// handle, every unattached top-level geometry and topology object is
    /// reclaimed.
    pub fn delete_object(&mut self, object: Ego) -> Result<DerefStatus> {
        let key = self.key_of(object)?;
        if key == self.root {
            return Ok(self.sweep_unattached());
        }

        if self.objects[key].class == ObjectClass::Model {
            let bodies = match self.blind(key)? {
                Blind::Model(m) => m.bodies.clone(),
                _ => Vec::new(),
            };
            let root = self.root;
            let active: usize = bodies
                .iter()
                .filter_map(|&b| self.objects.get(b))
                .map(|r| r.owners.iter().filter(|&&o| o != key && o != root).count())
                .sum();
            if active > 0 {
                egads_log!(self, warn, active, "Model delete with active Body refs");
                return Ok(DerefStatus::InUse(active));
            }
        }

        self.deref(key, Some(self.root), false)
    }

    fn sweep_unattached(&mut self) -> DerefStatus {
        let level = self.out_level;
        let references_before = self.reference_count();
        self.out_level = 0;

        let root = self.root;
        let mut total = 0;
        'restart: loop {
            for key in self.active_keys() {
                let Some(r) = self.objects.get(key) else {
                    continue;
                };
                if !(ObjectClass::PCurve..=ObjectClass::Shell).contains(&r.class) || r.top != root {
                    continue;
                }
                match self.deref(key, Some(root), false) {
                    Ok(DerefStatus::Destroyed) => {
                        total += 1;
                        continue 'restart;
                    }
                    Ok(DerefStatus::Released) => continue 'restart,
                    _ => {}
                }
            }
            break;
        }

        self.out_level = level;
        if total != 0 {
            let references = references_before - self.reference_count();
            egads_log!(self, info, total, references, "unattached objects removed");
        }
        DerefStatus::Swept(total)
    }

    pub(crate) fn reference_count(&self) -> usize {
        self.objects.values().map(|r| r.owners.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
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

    fn node(ctx: &mut Context<Kernel>) -> Ego {
        ctx.make_node(&[0.0, 0.0, 0.0]).unwrap()
    }

    #[test]
    fn context_delete_reclaims_unattached_objects() {
        let mut ctx = ctx();
        let body = ctx
            .make_solid_body(&egads_engine::Primitive::Box {
                corner: [0.0; 3],
                size: [1.0; 3],
            })
            .unwrap();
        let in_body = ctx.active_count();

        let _loose = node(&mut ctx);
        let line = ctx
            .make_geometry(
                ObjectClass::Curve,
                &crate::geometry::GeomDef::Curve(egads_engine::CurveDef::Line {
                    origin: [0.0; 3],
                    direction: [1.0, 0.0, 0.0],
                }),
                None,
            )
            .unwrap();
        let a = node(&mut ctx);
        let b = ctx.make_node(&[1.0, 0.0, 0.0]).unwrap();
        ctx.make_edge(line, &[a, b], [0.0, 1.0]).unwrap();
        assert_eq!(ctx.active_count(), in_body + 5);

        let c = ctx.context_handle();
        assert_eq!(ctx.delete_object(c).unwrap(), DerefStatus::Swept(5));
        assert_eq!(ctx.active_count(), in_body);
        assert!(ctx.is_live(body));
        assert_eq!(ctx.delete_object(c).unwrap(), DerefStatus::Swept(0));
    }

    #[test]
    fn nil_objects_cannot_be_referenced() {
        let mut ctx = ctx();
        let nil = ctx.make_object().unwrap();
        let owner = node(&mut ctx);
        assert_eq!(ctx.reference_object(nil, owner), Err(EgadsError::Empty));
        assert_eq!(ctx.reference_object(owner, nil), Err(EgadsError::Empty));
    }

    #[test]
    fn context_cannot_be_a_child() {
        let mut ctx = ctx();
        let owner = node(&mut ctx);
        let c = ctx.context_handle();
        assert_eq!(ctx.reference_object(c, owner), Err(EgadsError::NotAContext));
    }

    #[test]
    fn duplicate_owners_count_separately() {
        let mut ctx = ctx();
        let child = node(&mut ctx);
        let owner = node(&mut ctx);
        assert_eq!(ctx.reference_object(child, owner).unwrap(), 2);
        assert_eq!(ctx.reference_object(child, owner).unwrap(), 3);
        assert_eq!(ctx.dereference_object(child, Some(owner)).unwrap(), DerefStatus::Released);
        assert_eq!(ctx.dereference_object(child, Some(owner)).unwrap(), DerefStatus::Released);
        assert_eq!(ctx.owner_count(child).unwrap(), 1);
    }

    #[test]
    fn missing_owner_is_not_found() {
        let mut ctx = ctx();
        let child = node(&mut ctx);
        let stranger = node(&mut ctx);
        assert!(matches!(
            ctx.dereference_object(child, Some(stranger)),
            Err(EgadsError::NotFound(_))
        ));
        assert!(ctx.is_live(child));
    }

    #[test]
    fn implicit_context_skips_the_refusal() {
        let mut ctx = ctx();
        let child = node(&mut ctx);
        let owner = node(&mut ctx);
        ctx.reference_object(child, owner).unwrap();
        assert_eq!(ctx.delete_object(child).unwrap(), DerefStatus::InUse(1));
        assert_eq!(ctx.dereference_object(child, None).unwrap(), DerefStatus::Released);
        assert_eq!(ctx.owners(child).unwrap(), vec![owner]);
    }

    #[test]
    fn remove_context_ref_never_destroys() {
        let mut ctx = ctx();
        let child = node(&mut ctx);
        ctx.remove_context_ref(child).unwrap();
        assert!(ctx.is_live(child));
        assert_eq!(ctx.owner_count(child).unwrap(), 0);
        // Nothing left to remove.
        ctx.remove_context_ref(child).unwrap();
    }

    #[test]
    fn transforms_have_no_keepalive() {
        let mut ctx = ctx();
        let xform = ctx.make_transform(&egads_engine::IDENTITY).unwrap();
        assert_eq!(ctx.owner_count(xform).unwrap(), 0);
        assert_eq!(ctx.delete_object(xform).unwrap(), DerefStatus::Destroyed);
    }

    #[test]
    fn remove_context_ref_without_keepalive() {
        let mut ctx = ctx();
        let child = node(&mut ctx);
        let owner = node(&mut ctx);
        ctx.reference_object(child, owner).unwrap();
        ctx.remove_context_ref(child).unwrap();
        assert!(matches!(ctx.remove_context_ref(child), Err(EgadsError::NotFound(_))));
    }

    #[test]
    fn unowned_object_is_destroyed_by_dereference() {
        let mut ctx = ctx();
        let nil = ctx.make_object().unwrap();
        assert_eq!(ctx.dereference_object(nil, None).unwrap(), DerefStatus::Destroyed);
        assert_eq!(ctx.get_info(nil), Err(EgadsError::Empty));
    }
}
