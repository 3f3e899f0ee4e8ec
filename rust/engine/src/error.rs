// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types reported by geometry engines.

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures raised by a [`GeometryEngine`](crate::GeometryEngine).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Shape construction failed (bad input, invalid result).
    #[error("construction failed: {0}")]
    Construction(String),

    /// A geometric computation failed (evaluation, projection, transform).
    #[error("geometry error: {0}")]
    Geometry(String),

    /// The topology handed to the engine is inconsistent.
    #[error("topology error: {0}")]
    Topology(String),

    /// The input collapses to a point, zero length or zero area.
    #[error("degenerate input: {0}")]
    Degenerate(String),

    /// The engine does not implement the named operation.
    #[error("operation not supported by this engine: {0}")]
    Unsupported(&'static str),

    /// Reading or writing a shape stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A shape stream could not be parsed.
    #[error("format error: {0}")]
    Format(String),
}
