// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for object-model operations.

use egads_engine::EngineError;

/// Result type alias for object-model operations.
pub type Result<T> = std::result::Result<T, EgadsError>;

/// Errors reported by the object model.
///
/// Each variant carries a fixed integer code (see [`EgadsError::code`]) that
/// matches the classic EGADS status values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EgadsError {
    /// The geometry engine panicked during a feature operation.
    #[error("native fault in the geometry engine: {0}")]
    NativeFault(String),

    /// Transform rows have unequal lengths.
    #[error("transform has skew scaling")]
    BadScale,

    /// Transform rows are not orthogonal.
    #[error("transform is not orthogonal")]
    NotOrthogonal,

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("construction error: {0}")]
    ConstructionError(String),

    #[error("topology error: {0}")]
    TopologyError(String),

    #[error("geometry error: {0}")]
    GeometryError(String),

    #[error("object is not a body")]
    NotABody,

    #[error("write failed: {0}")]
    WriteError(String),

    #[error("object is not a model")]
    NotAModel,

    #[error("load failed: {0}")]
    LoadFailed(String),

    #[error("value out of range: {0}")]
    RangeError(String),

    #[error("object is not a geometry: {0}")]
    NotAGeometry(String),

    #[error("object is not a tessellation")]
    NotATessellation,

    /// The handle refers to a released or unassigned (Nil) object.
    #[error("object is empty")]
    Empty,

    #[error("object is not a topology: {0}")]
    NotATopology(String),

    /// An object of the wrong class was used where an owner was expected.
    #[error("reference class mismatch: {0}")]
    ReferenceClass(String),

    #[error("object is not a transform")]
    NotATransform,

    #[error("object is not a context")]
    NotAContext,

    /// Two handles from different contexts were combined.
    #[error("objects belong to different contexts")]
    MixedContext,

    #[error("no data: {0}")]
    NoData(String),

    #[error("missing name")]
    NoName,

    #[error("index error: {0}")]
    IndexError(String),

    #[error("allocation failed")]
    MallocError,

    /// The handle was not minted by this context.
    #[error("not an object of this context")]
    NotAnObject,

    #[error("null object: {0}")]
    NullObject(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl EgadsError {
    /// Returns the EGADS integer status code.
    pub fn code(&self) -> i32 {
        match self {
            EgadsError::NativeFault(_) => -27,
            EgadsError::BadScale => -26,
            EgadsError::NotOrthogonal => -25,
            EgadsError::DegenerateGeometry(_) => -24,
            EgadsError::ConstructionError(_) => -23,
            EgadsError::TopologyError(_) => -22,
            EgadsError::GeometryError(_) => -21,
            EgadsError::NotABody => -20,
            EgadsError::WriteError(_) => -19,
            EgadsError::NotAModel => -18,
            EgadsError::LoadFailed(_) => -17,
            EgadsError::RangeError(_) => -16,
            EgadsError::NotAGeometry(_) => -15,
            EgadsError::NotATessellation => -14,
            EgadsError::Empty => -13,
            EgadsError::NotATopology(_) => -12,
            EgadsError::ReferenceClass(_) => -11,
            EgadsError::NotATransform => -10,
            EgadsError::NotAContext => -9,
            EgadsError::MixedContext => -8,
            EgadsError::NoData(_) => -7,
            EgadsError::NoName => -6,
            EgadsError::IndexError(_) => -5,
            EgadsError::MallocError => -4,
            EgadsError::NotAnObject => -3,
            EgadsError::NullObject(_) => -2,
            EgadsError::NotFound(_) => -1,
        }
    }
}

impl From<EngineError> for EgadsError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Construction(msg) => EgadsError::ConstructionError(msg),
            EngineError::Geometry(msg) => EgadsError::GeometryError(msg),
            EngineError::Topology(msg) => EgadsError::TopologyError(msg),
            EngineError::Degenerate(msg) => EgadsError::DegenerateGeometry(msg),
            EngineError::Unsupported(what) => {
                EgadsError::GeometryError(format!("{what} is not supported by the engine"))
            }
            EngineError::Io(err) => EgadsError::LoadFailed(err.to_string()),
            EngineError::Format(msg) => EgadsError::LoadFailed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_span_the_classic_range() {
        assert_eq!(EgadsError::NotFound("x".into()).code(), -1);
        assert_eq!(EgadsError::Empty.code(), -13);
        assert_eq!(EgadsError::NativeFault("boom".into()).code(), -27);
    }

    #[test]
    fn engine_errors_map_onto_the_taxonomy() {
        let e: EgadsError = EngineError::Degenerate("zero".into()).into();
        assert_eq!(e.code(), -24);
        let e: EgadsError = EngineError::Unsupported("loft").into();
        assert!(matches!(e, EgadsError::GeometryError(_)));
        let e: EgadsError = EngineError::Format("bad".into()).into();
        assert!(matches!(e, EgadsError::LoadFailed(_)));
    }
}
