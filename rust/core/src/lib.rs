// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # EGADS
//!
//! Handle-based object model for boundary-representation geometry.
//!
//! A [`Context`] wraps one [`GeometryEngine`] and owns every object created
//! through it. Objects are addressed by copyable [`Ego`] handles and kept
//! alive by ownership edges:
//!
//! - **Pool**: released records are reused, most recent first
//! - **References**: an object is torn down when its last owner lets go
//! - **Attributes**: named int, real and string values on any object
//! - **Builders**: geometry, topology, bodies, models and tessellations
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use egads::{AttrData, Context, DerefStatus};
//! use egads_kernel::Kernel;
//!
//! let mut ctx = Context::open(Kernel::default());
//! let node = ctx.make_node(&[0.0, 0.0, 0.0])?;
//! ctx.attribute_add(node, "thickness", AttrData::Reals(&[3.5]))?;
//! assert_eq!(ctx.delete_object(node)?, DerefStatus::Destroyed);
//! let report = ctx.close();
//! assert!(report.undeleted.is_empty());
//! ```
//!
//! ## Logging
//!
//! Diagnostics are emitted as [`tracing`] events, gated by the context's
//! output level (0 silent, 1 errors and warnings, 2 info and debug,
//! 3 trace). The library never installs a subscriber.

/// Emits a `tracing` event when the context's output level allows it.
macro_rules! egads_log {
    ($ctx:expr, error, $($arg:tt)+) => {
        if $ctx.out_level() >= 1 {
            tracing::error!($($arg)+);
        }
    };
    ($ctx:expr, warn, $($arg:tt)+) => {
        if $ctx.out_level() >= 1 {
            tracing::warn!($($arg)+);
        }
    };
    ($ctx:expr, info, $($arg:tt)+) => {
        if $ctx.out_level() >= 2 {
            tracing::info!($($arg)+);
        }
    };
    ($ctx:expr, debug, $($arg:tt)+) => {
        if $ctx.out_level() >= 2 {
            tracing::debug!($($arg)+);
        }
    };
    ($ctx:expr, trace, $($arg:tt)+) => {
        if $ctx.out_level() >= 3 {
            tracing::trace!($($arg)+);
        }
    };
}

pub mod attribute;
mod blind;
mod body;
pub mod config;
pub mod context;
mod copy;
pub mod error;
pub mod geometry;
mod hlevel;
pub mod io;
pub mod memory;
pub mod object;
mod reference;
pub mod tessellation;
pub mod topology;
mod transform;

pub use attribute::{AttrData, AttrRef, AttrType, AttrValue};
pub use config::Config;
pub use context::{revision, CloseReport, Context, EGADS_MAJOR, EGADS_MINOR};
pub use error::{EgadsError, Result};
pub use geometry::{Evaluation, GeomDef, GeometryInfo, Inversion};
pub use object::{
    BodyType, Closure, DerefStatus, EdgeType, Ego, MemberType, ObjectClass, ObjectInfo,
};
pub use tessellation::{TessEdge, TessFace, TessGeom};
pub use topology::TopologyInfo;

// Re-export the engine vocabulary so callers need a single import.
pub use egads_engine::{
    BooleanOp, CurveDef, CurveEval, CurveType, Frame, GeometryEngine, LoftOptions, Matrix,
    Primitive, Range, Sense, SurfaceDef, SurfaceEval, SurfaceType, TessParams, Vec3, IDENTITY,
};
