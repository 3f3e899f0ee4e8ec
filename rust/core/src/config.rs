// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Context configuration loaded from environment variables.

/// Context configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Initial output level (0 silent .. 3 trace).
    pub out_level: u8,
    /// Allow `save_model` to replace an existing file.
    pub overwrite_files: bool,
    /// Upper bound on points per tessellated edge or face.
    pub tess_max_points: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            out_level: std::env::var("EGADS_OUTLEVEL")
                .unwrap_or_else(|_| "1".into())
                .parse::<u8>()
                .map(|level| level.min(3))
                .unwrap_or(1),
            overwrite_files: std::env::var("EGADS_OVERWRITE")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false),
            tess_max_points: std::env::var("EGADS_TESS_MAXPTS")
                .unwrap_or_else(|_| "10000".into())
                .parse()
                .unwrap_or(10000),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
