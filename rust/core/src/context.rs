// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Contexts and the object pool.
//!
//! A [`Context`] owns every object created through it. Records live in a
//! slot map whose free list doubles as the pool: a released record leaves a
//! vacant slot, and the next allocation takes the most recently vacated one.
//! Live records are threaded on a doubly-linked active list that starts at
//! the context's own sentinel record.

use std::sync::atomic::{AtomicU32, Ordering};

use egads_engine::GeometryEngine;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::attribute::AttrStore;
use crate::blind::Blind;
use crate::config::Config;
use crate::error::{EgadsError, Result};
use crate::object::*;

/// Version reported by [`revision`].
pub const EGADS_MAJOR: i32 = 1;
pub const EGADS_MINOR: i32 = 0;

const SIGNATURE: &str = "EGADS Rust object model";

/// Slot maps hold at most `u32::MAX - 1` entries, the context included.
const MAX_RECORDS: usize = u32::MAX as usize - 2;

static NEXT_CONTEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Returns `(major, minor)`.
pub fn revision() -> (i32, i32) {
    (EGADS_MAJOR, EGADS_MINOR)
}

/// One object record.
pub(crate) struct Record<E: GeometryEngine> {
    pub class: ObjectClass,
    pub mtype: MemberType,
    pub attrs: Option<AttrStore>,
    pub blind: Option<Blind<E>>,
    /// Body, model or the context itself.
    pub top: ObjectKey,
    /// One entry per ownership edge; duplicates allowed.
    pub owners: SmallVec<[ObjectKey; 2]>,
    pub prev: Option<ObjectKey>,
    pub next: Option<ObjectKey>,
}

/// Summary produced by [`Context::close`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseReport {
    /// Live objects when close started.
    pub active: usize,
    /// Ownership edges when close started.
    pub references: usize,
    /// Records ever allocated (live plus pooled), references included.
    pub total: usize,
    /// Objects reclaimed by the initial sweep.
    pub swept: usize,
    /// Class and member type of objects that could not be deleted.
    pub undeleted: Vec<(ObjectClass, i32)>,
}

/// An independent object-model session over one geometry engine.
pub struct Context<E: GeometryEngine> {
    pub(crate) engine: E,
    pub(crate) config: Config,
    pub(crate) id: u32,
    pub(crate) out_level: u8,
    pub(crate) objects: SlotMap<ObjectKey, Record<E>>,
    pub(crate) root: ObjectKey,
    pub(crate) last: ObjectKey,
    allocated: usize,
    /// Fresh records allowed beyond the pool.
    pub(crate) record_limit: usize,
}

impl<E: GeometryEngine> Context<E> {
    /// Opens a context configured from the environment.
    pub fn open(engine: E) -> Self {
        Self::open_with_config(engine, Config::default())
    }

    pub fn open_with_config(engine: E, config: Config) -> Self {
        let mut objects = SlotMap::with_key();
        let root = objects.insert_with_key(|k| Record {
            class: ObjectClass::Context,
            mtype: MemberType::Unset,
            attrs: None,
            blind: None,
            top: k,
            owners: SmallVec::new(),
            prev: None,
            next: None,
        });
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        let out_level = config.out_level.min(3);
        tracing::debug!(context = id, engine = engine.name(), "context opened");
        Self {
            engine,
            config,
            id,
            out_level,
            objects,
            root,
            last: root,
            allocated: 0,
            record_limit: MAX_RECORDS,
        }
    }

    /// Handle of the context itself.
    pub fn context_handle(&self) -> Ego {
        self.ego(self.root)
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn signature(&self) -> &'static str {
        SIGNATURE
    }

    pub fn out_level(&self) -> u8 {
        self.out_level
    }

    /// Sets the output level (0..=3) and returns the previous one.
    pub fn set_output_level(&mut self, level: i32) -> Result<u8> {
        if !(0..=3).contains(&level) {
            return Err(EgadsError::RangeError(format!("output level {level}")));
        }
        let old = self.out_level;
        self.out_level = level as u8;
        Ok(old)
    }

    // --- Pool operations ---

    /// Takes a record from the pool (or allocates one) and appends it to the
    /// active list with class `Nil`.
    pub fn make_object(&mut self) -> Result<Ego> {
        let key = self.alloc_record(ObjectClass::Nil, MemberType::Unset, None, self.root)?;
        Ok(self.ego(key))
    }

    /// Number of records ever allocated fresh.
    pub fn allocation_count(&self) -> usize {
        self.allocated
    }

    /// Number of released records waiting for reuse.
    pub fn pool_len(&self) -> usize {
        self.allocated - self.active_count()
    }

    /// Number of live objects, the context itself excluded.
    pub fn active_count(&self) -> usize {
        self.objects.len() - 1
    }

    pub(crate) fn alloc_record(
        &mut self,
        class: ObjectClass,
        mtype: MemberType,
        blind: Option<Blind<E>>,
        top: ObjectKey,
    ) -> Result<ObjectKey> {
        if self.pool_len() == 0 {
            if self.allocated >= self.record_limit {
                egads_log!(self, error, allocated = self.allocated, "object pool exhausted");
                return Err(EgadsError::MallocError);
            }
            self.allocated += 1;
        }
        let prev = self.last;
        let key = self.objects.insert(Record {
            class,
            mtype,
            attrs: None,
            blind,
            top,
            owners: SmallVec::new(),
            prev: Some(prev),
            next: None,
        });
        if let Some(p) = self.objects.get_mut(prev) {
            p.next = Some(key);
        }
        self.last = key;
        Ok(key)
    }

    /// Unlinks a record from the active list and returns its slot to the pool.
    pub(crate) fn release_to_pool(&mut self, key: ObjectKey) {
        let Some(record) = self.objects.remove(key) else {
            return;
        };
        match record.next {
            Some(n) => {
                if let Some(next) = self.objects.get_mut(n) {
                    next.prev = record.prev;
                }
            }
            None => self.last = record.prev.unwrap_or(self.root),
        }
        if let Some(p) = record.prev {
            if let Some(prev) = self.objects.get_mut(p) {
                prev.next = record.next;
            }
        }
    }

    // --- Handle validation ---

    pub(crate) fn ego(&self, key: ObjectKey) -> Ego {
        Ego { ctx: self.id, key }
    }

    /// Resolves a handle of this context. Released handles give `Empty`.
    pub(crate) fn key_of(&self, ego: Ego) -> Result<ObjectKey> {
        if ego.ctx != self.id {
            return Err(EgadsError::NotAnObject);
        }
        if !self.objects.contains_key(ego.key) {
            return Err(EgadsError::Empty);
        }
        Ok(ego.key)
    }

    /// Like [`key_of`](Self::key_of), but also rejects `Nil` objects and the
    /// context itself.
    pub(crate) fn live_key(&self, ego: Ego) -> Result<ObjectKey> {
        let key = self.key_of(ego)?;
        match self.objects[key].class {
            ObjectClass::Context => Err(EgadsError::NotAContext),
            ObjectClass::Nil => Err(EgadsError::Empty),
            _ => Ok(key),
        }
    }

    /// Resolves a handle passed alongside another object: foreign handles
    /// give `MixedContext`.
    pub(crate) fn member_key(&self, ego: Ego) -> Result<ObjectKey> {
        if ego.ctx != self.id {
            egads_log!(self, error, "object from another context");
            return Err(EgadsError::MixedContext);
        }
        self.live_key(ego)
    }

    pub(crate) fn record(&self, key: ObjectKey) -> Result<&Record<E>> {
        self.objects.get(key).ok_or(EgadsError::Empty)
    }

    pub(crate) fn record_mut(&mut self, key: ObjectKey) -> Result<&mut Record<E>> {
        self.objects.get_mut(key).ok_or(EgadsError::Empty)
    }

    pub(crate) fn class_of(&self, key: ObjectKey) -> ObjectClass {
        self.objects
            .get(key)
            .map(|r| r.class)
            .unwrap_or(ObjectClass::Empty)
    }

    pub(crate) fn blind(&self, key: ObjectKey) -> Result<&Blind<E>> {
        self.record(key)?
            .blind
            .as_ref()
            .ok_or_else(|| EgadsError::NoData(format!("{} without payload", self.class_of(key))))
    }

    /// Keys of the active list in order, the context excluded.
    pub(crate) fn active_keys(&self) -> Vec<ObjectKey> {
        let mut keys = Vec::with_capacity(self.active_count());
        let mut cursor = self.objects[self.root].next;
        while let Some(k) = cursor {
            keys.push(k);
            cursor = self.objects.get(k).and_then(|r| r.next);
        }
        keys
    }

    // --- Queries ---

    pub fn get_info(&self, ego: Ego) -> Result<ObjectInfo> {
        let key = self.key_of(ego)?;
        let r = &self.objects[key];
        Ok(ObjectInfo {
            class: r.class,
            mtype: r.mtype,
            top: self.ego(r.top),
            prev: r.prev.map(|k| self.ego(k)),
            next: r.next.map(|k| self.ego(k)),
        })
    }

    /// Context handle owning `ego`.
    pub fn get_context(&self, ego: Ego) -> Result<Ego> {
        self.key_of(ego)?;
        Ok(self.context_handle())
    }

    /// Number of owners of an object.
    pub fn owner_count(&self, ego: Ego) -> Result<usize> {
        let key = self.key_of(ego)?;
        Ok(self.objects[key].owners.len())
    }

    /// Owners of an object, in the order the edges were added.
    pub fn owners(&self, ego: Ego) -> Result<Vec<Ego>> {
        let key = self.key_of(ego)?;
        Ok(self.objects[key].owners.iter().map(|&k| self.ego(k)).collect())
    }

    /// `true` while the handle refers to a live record.
    pub fn is_live(&self, ego: Ego) -> bool {
        self.key_of(ego).is_ok()
    }

    // --- Teardown ---

    /// Tears down every object and reports what was found.
    ///
    /// Unattached geometry and topology go first, then tessellations,
    /// models and bodies; whatever remains is released until a full pass
    /// makes no progress. Never fails.
    pub fn close(mut self) -> CloseReport {
        let active = self.active_count();
        let references: usize = self.objects.values().map(|r| r.owners.len()).sum();
        let total = self.allocated + references;
        egads_log!(self, warn, active, references, total, "objects in use at close");
        let mut report = CloseReport {
            active,
            references,
            total,
            ..Default::default()
        };

        if let Ok(DerefStatus::Swept(n)) = self.delete_object(self.context_handle()) {
            report.swept = n;
        }

        for class in [ObjectClass::Tessellation, ObjectClass::Model, ObjectClass::Body] {
            'restart: loop {
                for key in self.active_keys() {
                    if self.class_of(key) != class {
                        continue;
                    }
                    let ego = self.ego(key);
                    if matches!(self.delete_object(ego), Ok(s) if s.removed()) {
                        continue 'restart;
                    }
                }
                break;
            }
        }

        loop {
            self.prune_dead_owners();
            let mut progress = false;
            for key in self.active_keys() {
                if self.objects.contains_key(key)
                    && matches!(self.deref_top(key, None), Ok(s) if s.removed())
                {
                    progress = true;
                    break;
                }
            }
            if progress {
                continue;
            }
            for key in self.active_keys() {
                if self.objects.contains_key(key)
                    && matches!(self.deref(key, None, false), Ok(s) if s.removed())
                {
                    progress = true;
                    break;
                }
            }
            if !progress {
                break;
            }
        }

        for key in self.active_keys() {
            let r = &self.objects[key];
            report.undeleted.push((r.class, r.mtype.code()));
        }
        if !report.undeleted.is_empty() {
            egads_log!(self, info, count = report.undeleted.len(), "undeleted objects in cleanup");
            for (i, (class, mtype)) in report.undeleted.iter().enumerate() {
                egads_log!(self, info, index = i, class = %class, mtype, "undeleted object");
            }
        }
        tracing::debug!(context = self.id, "context closed");
        report
    }

    /// Drops owner entries whose owner record no longer exists.
    fn prune_dead_owners(&mut self) {
        let live: rustc_hash::FxHashSet<ObjectKey> = self.objects.keys().collect();
        for record in self.objects.values_mut() {
            record.owners.retain(|o| live.contains(o));
        }
    }
}
