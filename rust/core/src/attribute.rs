// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Named attributes attached to objects.
//!
//! Each object may carry a lazily created store of `(name, value)` entries.
//! Values are integer or real vectors, or a string. Single numbers are kept
//! inline; longer vectors spill to the heap.

use std::fmt::Write as _;

use egads_engine::GeometryEngine;
use smallvec::SmallVec;

use crate::context::Context;
use crate::error::{EgadsError, Result};
use crate::memory::{try_push, try_small, try_string, try_vec};
use crate::object::{Ego, ObjectClass, ObjectKey};

/// Attribute value type, with the EGADS codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrType {
    Int = 1,
    Real = 2,
    String = 3,
}

impl AttrType {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(AttrType::Int),
            2 => Some(AttrType::Real),
            3 => Some(AttrType::String),
            _ => None,
        }
    }
}

/// Owned attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Ints(SmallVec<[i32; 1]>),
    Reals(SmallVec<[f64; 1]>),
    Str(String),
}

impl AttrValue {
    pub fn attr_type(&self) -> AttrType {
        match self {
            AttrValue::Ints(_) => AttrType::Int,
            AttrValue::Reals(_) => AttrType::Real,
            AttrValue::Str(_) => AttrType::String,
        }
    }

    /// Number of values; the byte length for strings.
    pub fn len(&self) -> usize {
        self.as_data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_data(&self) -> AttrData<'_> {
        match self {
            AttrValue::Ints(v) => AttrData::Ints(v),
            AttrValue::Reals(v) => AttrData::Reals(v),
            AttrValue::Str(s) => AttrData::Str(s),
        }
    }
}

/// Borrowed attribute value, used both for input and for lookups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrData<'a> {
    Ints(&'a [i32]),
    Reals(&'a [f64]),
    Str(&'a str),
}

impl<'a> AttrData<'a> {
    pub fn attr_type(&self) -> AttrType {
        match self {
            AttrData::Ints(_) => AttrType::Int,
            AttrData::Reals(_) => AttrType::Real,
            AttrData::Str(_) => AttrType::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AttrData::Ints(v) => v.len(),
            AttrData::Reals(v) => v.len(),
            AttrData::Str(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_value(&self) -> Result<AttrValue> {
        Ok(match self {
            AttrData::Ints(v) => AttrValue::Ints(try_small(v)?),
            AttrData::Reals(v) => AttrValue::Reals(try_small(v)?),
            AttrData::Str(s) => AttrValue::Str(try_string(s)?),
        })
    }
}

/// An entry returned by [`Context::attribute_get`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttrRef<'a> {
    pub name: &'a str,
    pub data: AttrData<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Attribute {
    pub name: String,
    pub value: AttrValue,
}

/// Ordered attribute entries of one object. Names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct AttrStore {
    entries: Vec<Attribute>,
}

impl AttrStore {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.iter()
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|a| a.name == name)
    }

    pub fn get(&self, index: usize) -> Option<&Attribute> {
        self.entries.get(index)
    }

    /// Replaces the value of an existing name, or appends a new entry.
    pub fn set(&mut self, name: &str, value: AttrValue) -> Result<()> {
        match self.find(name) {
            Some(i) => self.entries[i].value = value,
            None => try_push(
                &mut self.entries,
                Attribute {
                    name: try_string(name)?,
                    value,
                },
            )?,
        }
        Ok(())
    }

    /// Deep copy with every buffer reserved fallibly.
    pub fn try_clone(&self) -> Result<AttrStore> {
        let mut entries = try_vec(self.entries.len())?;
        for attr in &self.entries {
            entries.push(Attribute {
                name: try_string(&attr.name)?,
                value: attr.value.as_data().to_value()?,
            });
        }
        Ok(AttrStore { entries })
    }

    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        self.find(name).map(|i| self.entries.remove(i))
    }
}

/// Names must be non-empty and free of blanks and control characters.
pub(crate) fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c > ' ')
}

impl<E: GeometryEngine> Context<E> {
    /// Resolves a handle that may carry attributes: the context or any
    /// assigned object.
    fn attr_key(&self, ego: Ego) -> Result<ObjectKey> {
        let key = self.key_of(ego)?;
        if self.objects[key].class == ObjectClass::Nil {
            return Err(EgadsError::Empty);
        }
        Ok(key)
    }

    pub(crate) fn attrs_of(&self, key: ObjectKey) -> Option<&AttrStore> {
        self.objects.get(key).and_then(|r| r.attrs.as_ref())
    }

    pub(crate) fn set_attr(&mut self, key: ObjectKey, name: &str, value: AttrValue) -> Result<()> {
        let record = self.record_mut(key)?;
        record.attrs.get_or_insert_with(AttrStore::default).set(name, value)
    }

    /// Copies every attribute of `from` onto `to`, keeping what `to` has
    /// under other names.
    pub(crate) fn merge_attrs(&mut self, from: ObjectKey, to: ObjectKey) -> Result<()> {
        let Some(store) = self.attrs_of(from).map(AttrStore::try_clone).transpose()? else {
            return Ok(());
        };
        for attr in store.entries {
            self.set_attr(to, &attr.name, attr.value)?;
        }
        Ok(())
    }

    /// Adds or replaces a named attribute.
    pub fn attribute_add(&mut self, ego: Ego, name: &str, data: AttrData<'_>) -> Result<()> {
        let key = self.attr_key(ego)?;
        if !valid_name(name) {
            egads_log!(self, error, name, "bad attribute name");
            return Err(EgadsError::IndexError(format!("attribute name {name:?}")));
        }
        if data.is_empty() && data.attr_type() != AttrType::String {
            egads_log!(self, error, name, "attribute without values");
            return Err(EgadsError::IndexError(format!("empty value for {name}")));
        }
        let value = data.to_value()?;
        self.set_attr(key, name, value)
    }

    /// Deletes one attribute by name, or the whole store when `name` is `None`.
    pub fn attribute_del(&mut self, ego: Ego, name: Option<&str>) -> Result<()> {
        let key = self.attr_key(ego)?;
        let record = self.record_mut(key)?;
        let Some(name) = name else {
            record.attrs = None;
            return Ok(());
        };
        let removed = record.attrs.as_mut().and_then(|s| s.remove(name));
        if removed.is_none() {
            return Err(EgadsError::NotFound(format!("attribute {name}")));
        }
        Ok(())
    }

    pub fn attribute_num(&self, ego: Ego) -> Result<usize> {
        let key = self.attr_key(ego)?;
        Ok(self.attrs_of(key).map_or(0, AttrStore::len))
    }

    /// Returns the attribute at a 1-based index.
    pub fn attribute_get(&self, ego: Ego, index: usize) -> Result<AttrRef<'_>> {
        let key = self.attr_key(ego)?;
        let attr = index
            .checked_sub(1)
            .and_then(|i| self.attrs_of(key)?.get(i))
            .ok_or_else(|| EgadsError::IndexError(format!("attribute index {index}")))?;
        Ok(AttrRef {
            name: &attr.name,
            data: attr.value.as_data(),
        })
    }

    /// Looks an attribute up by name.
    pub fn attribute_ret(&self, ego: Ego, name: &str) -> Result<AttrData<'_>> {
        let key = self.attr_key(ego)?;
        if name.is_empty() {
            return Err(EgadsError::NoName);
        }
        self.attrs_of(key)
            .and_then(|s| s.find(name).and_then(|i| s.get(i)))
            .map(|a| a.value.as_data())
            .ok_or_else(|| EgadsError::NotFound(format!("attribute {name}")))
    }

    /// Replaces every attribute of `dst` with a copy of those of `src`.
    pub fn attribute_dup(&mut self, src: Ego, dst: Ego) -> Result<()> {
        if src.ctx != dst.ctx {
            return Err(EgadsError::MixedContext);
        }
        let src = self.attr_key(src)?;
        let dst = self.attr_key(dst)?;
        let copy = self.attrs_of(src).map(AttrStore::try_clone).transpose()?;
        self.record_mut(dst)?.attrs = copy;
        Ok(())
    }

    /// Renders every attribute of an object, one per line, and logs it.
    pub fn attribute_print(&self, ego: Ego) -> Result<String> {
        let key = self.attr_key(ego)?;
        let mut out = String::new();
        if let Some(store) = self.attrs_of(key) {
            for attr in store.iter() {
                let _ = write!(out, "{}: ", attr.name);
                match &attr.value {
                    AttrValue::Ints(v) => {
                        let items: Vec<String> = v.iter().map(i32::to_string).collect();
                        out.push_str(&items.join(" "));
                    }
                    AttrValue::Reals(v) => {
                        let items: Vec<String> = v.iter().map(|r| format!("{r:.6}")).collect();
                        out.push_str(&items.join(" "));
                    }
                    AttrValue::Str(s) => out.push_str(s),
                }
                out.push('\n');
            }
        }
        egads_log!(self, info, class = %self.class_of(key), "attributes:\n{}", out);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use approx::assert_relative_eq;
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

    #[test]
    fn store_copies_are_deep_and_equal() {
        let mut store = AttrStore::default();
        store.set("n", AttrValue::Ints(SmallVec::from_slice(&[1, 2, 3]))).unwrap();
        store.set("r", AttrValue::Reals(SmallVec::from_slice(&[0.5]))).unwrap();
        store.set("s", AttrValue::Str("label".into())).unwrap();
        let copy = store.try_clone().unwrap();
        assert_eq!(copy, store);

        store.set("n", AttrValue::Ints(SmallVec::from_slice(&[9]))).unwrap();
        assert_eq!(copy.get(0).unwrap().value.as_data(), AttrData::Ints(&[1, 2, 3]));
        assert_eq!(AttrStore::default().try_clone().unwrap().len(), 0);
    }

    #[test]
    fn names_reject_blanks_and_controls() {
        assert!(valid_name("thickness"));
        assert!(!valid_name(""));
        assert!(!valid_name("two words"));
        assert!(!valid_name("tab\there"));
    }

    #[test]
    fn add_replaces_in_place() {
        let mut ctx = ctx();
        let obj = ctx.make_transform(&egads_engine::IDENTITY).unwrap();
        ctx.attribute_add(obj, "a", AttrData::Ints(&[1])).unwrap();
        ctx.attribute_add(obj, "b", AttrData::Str("x")).unwrap();
        ctx.attribute_add(obj, "a", AttrData::Reals(&[1.5, 2.5])).unwrap();
        assert_eq!(ctx.attribute_num(obj).unwrap(), 2);
        let first = ctx.attribute_get(obj, 1).unwrap();
        assert_eq!(first.name, "a");
        match first.data {
            AttrData::Reals(v) => {
                assert_relative_eq!(v[0], 1.5);
                assert_relative_eq!(v[1], 2.5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_inputs() {
        let mut ctx = ctx();
        let obj = ctx.make_transform(&egads_engine::IDENTITY).unwrap();
        assert!(matches!(
            ctx.attribute_add(obj, "bad name", AttrData::Ints(&[1])),
            Err(EgadsError::IndexError(_))
        ));
        assert!(matches!(
            ctx.attribute_add(obj, "n", AttrData::Reals(&[])),
            Err(EgadsError::IndexError(_))
        ));
        assert!(matches!(ctx.attribute_get(obj, 0), Err(EgadsError::IndexError(_))));
        assert!(matches!(ctx.attribute_get(obj, 1), Err(EgadsError::IndexError(_))));
        assert_eq!(ctx.attribute_ret(obj, ""), Err(EgadsError::NoName));
        assert!(matches!(ctx.attribute_ret(obj, "n"), Err(EgadsError::NotFound(_))));
        let nil = ctx.make_object().unwrap();
        assert_eq!(ctx.attribute_add(nil, "n", AttrData::Ints(&[1])), Err(EgadsError::Empty));
    }

    #[test]
    fn delete_shifts_left() {
        let mut ctx = ctx();
        let obj = ctx.make_transform(&egads_engine::IDENTITY).unwrap();
        for name in ["a", "b", "c"] {
            ctx.attribute_add(obj, name, AttrData::Str(name)).unwrap();
        }
        ctx.attribute_del(obj, Some("a")).unwrap();
        assert_eq!(ctx.attribute_get(obj, 1).unwrap().name, "b");
        assert!(matches!(ctx.attribute_del(obj, Some("a")), Err(EgadsError::NotFound(_))));
        ctx.attribute_del(obj, None).unwrap();
        assert_eq!(ctx.attribute_num(obj).unwrap(), 0);
    }

    #[test]
    fn context_carries_attributes() {
        let mut ctx = ctx();
        let c = ctx.context_handle();
        ctx.attribute_add(c, "units", AttrData::Str("mm")).unwrap();
        assert_eq!(ctx.attribute_ret(c, "units").unwrap(), AttrData::Str("mm"));
    }

    #[test]
    fn print_lists_every_entry() {
        let mut ctx = ctx();
        let obj = ctx.make_transform(&egads_engine::IDENTITY).unwrap();
        ctx.attribute_add(obj, "n", AttrData::Ints(&[1, 2])).unwrap();
        ctx.attribute_add(obj, "s", AttrData::Str("hi")).unwrap();
        assert_eq!(ctx.attribute_print(obj).unwrap(), "n: 1 2\ns: hi\n");
    }

    #[test]
    fn dup_across_contexts_is_rejected() {
        let mut a = ctx();
        let mut b = ctx();
        let x = a.make_transform(&egads_engine::IDENTITY).unwrap();
        let y = b.make_transform(&egads_engine::IDENTITY).unwrap();
        assert_eq!(a.attribute_dup(x, y), Err(EgadsError::MixedContext));
    }
}
