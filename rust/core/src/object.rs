// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Object handles, classes and member types.
//!
//! An [`Ego`] is a copyable handle into a context's object pool. It carries
//! the context id and a generational key, so a handle to a record that went
//! back to the pool (or was reused) is detected on the next access.

use egads_engine::{CurveType, Sense, SurfaceType};
use slotmap::{new_key_type, Key};

new_key_type! {
    /// Key of an object record inside a context's pool.
    pub struct ObjectKey;
}

/// Handle to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ego {
    pub(crate) ctx: u32,
    pub(crate) key: ObjectKey,
}

impl Ego {
    /// Id of the context that minted this handle.
    pub fn context_id(&self) -> u32 {
        self.ctx
    }

    /// Pool slot of the record. Reused slots keep their number.
    pub fn slot(&self) -> u32 {
        (self.key.data().as_ffi() & 0xffff_ffff) as u32
    }
}

/// Object class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectClass {
    Context = 0,
    Transform = 1,
    Tessellation = 2,
    /// Allocated but not yet assigned.
    Nil = 3,
    /// Released to the pool.
    Empty = 4,
    PCurve = 10,
    Curve = 11,
    Surface = 12,
    Node = 20,
    Edge = 21,
    Loop = 22,
    Face = 23,
    Shell = 24,
    Body = 25,
    Model = 26,
}

impl ObjectClass {
    /// Returns the EGADS class code.
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_geometry(self) -> bool {
        matches!(
            self,
            ObjectClass::PCurve | ObjectClass::Curve | ObjectClass::Surface
        )
    }

    pub fn is_topology(self) -> bool {
        self >= ObjectClass::Node
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectClass::Context => "Context",
            ObjectClass::Transform => "Transform",
            ObjectClass::Tessellation => "Tessellation",
            ObjectClass::Nil => "Nil",
            ObjectClass::Empty => "Empty",
            ObjectClass::PCurve => "PCurve",
            ObjectClass::Curve => "Curve",
            ObjectClass::Surface => "Surface",
            ObjectClass::Node => "Node",
            ObjectClass::Edge => "Edge",
            ObjectClass::Loop => "Loop",
            ObjectClass::Face => "Face",
            ObjectClass::Shell => "Shell",
            ObjectClass::Body => "Body",
            ObjectClass::Model => "Model",
        }
    }
}

impl std::fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeType {
    OneNode = 1,
    TwoNode = 2,
    Degenerate = 5,
}

/// Closure of a loop or shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Closure {
    Open = 3,
    Closed = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyType {
    WireBody = 6,
    FaceBody = 7,
    SheetBody = 8,
    SolidBody = 9,
}

impl BodyType {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            6 => Some(BodyType::WireBody),
            7 => Some(BodyType::FaceBody),
            8 => Some(BodyType::SheetBody),
            9 => Some(BodyType::SolidBody),
            _ => None,
        }
    }
}

/// Member type of an object, interpreted per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberType {
    Unset,
    Curve(CurveType),
    Surface(SurfaceType),
    /// Face orientation relative to its surface.
    Sense(Sense),
    Edge(EdgeType),
    Closure(Closure),
    Body(BodyType),
    /// Class of the object a tessellation was built from.
    Source(ObjectClass),
}

impl MemberType {
    /// Returns the EGADS numeric member type.
    pub fn code(self) -> i32 {
        match self {
            MemberType::Unset => 0,
            MemberType::Curve(t) => t as i32,
            MemberType::Surface(t) => t as i32,
            MemberType::Sense(s) => s.as_i32(),
            MemberType::Edge(t) => t as i32,
            MemberType::Closure(c) => c as i32,
            MemberType::Body(b) => b as i32,
            MemberType::Source(c) => c.code(),
        }
    }
}

/// Result of [`Context::get_info`](crate::Context::get_info).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectInfo {
    pub class: ObjectClass,
    pub mtype: MemberType,
    pub top: Ego,
    pub prev: Option<Ego>,
    pub next: Option<Ego>,
}

/// Outcome of a dereference or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerefStatus {
    /// One ownership edge was removed; others remain.
    Released,
    /// The last ownership edge was removed and the object torn down.
    Destroyed,
    /// Refused: the object still has this many non-context owners.
    InUse(usize),
    /// Context sweep: this many unattached objects were reclaimed.
    Swept(usize),
}

impl DerefStatus {
    /// `true` for [`Released`](Self::Released) and [`Destroyed`](Self::Destroyed).
    pub fn removed(self) -> bool {
        matches!(self, DerefStatus::Released | DerefStatus::Destroyed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_codes() {
        assert_eq!(ObjectClass::Context.code(), 0);
        assert_eq!(ObjectClass::PCurve.code(), 10);
        assert_eq!(ObjectClass::Model.code(), 26);
        assert!(ObjectClass::Shell.is_topology());
        assert!(!ObjectClass::Surface.is_topology());
        assert!(ObjectClass::Surface.is_geometry());
    }

    #[test]
    fn member_type_codes() {
        assert_eq!(MemberType::Sense(Sense::Reverse).code(), -1);
        assert_eq!(MemberType::Edge(EdgeType::Degenerate).code(), 5);
        assert_eq!(MemberType::Closure(Closure::Closed).code(), 4);
        assert_eq!(MemberType::Body(BodyType::SolidBody).code(), 9);
        assert_eq!(MemberType::Surface(SurfaceType::Conical).code(), 10);
        assert_eq!(BodyType::from_code(7), Some(BodyType::FaceBody));
        assert_eq!(BodyType::from_code(5), None);
    }
}
