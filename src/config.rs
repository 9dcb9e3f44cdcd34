//! Simulator configuration
//!
//! The memory geometry defaults to the compile-time constants in
//! [`crate::buddy::geometry`]. It can be overridden from a TOML file and
//! from environment variables, the latter taking precedence:
//!
//! ```toml
//! [memory]
//! total_bytes = 65536
//! min_block_bytes = 4096
//! ```
//!
//! `BUDDYSIM_MEMORY__TOTAL_BYTES=65536` sets the same key from the
//! environment.

use crate::buddy::geometry::{Geometry, MIN_BLOCK_SIZE, TOTAL_MEMORY};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "BUDDYSIM";

/// Size of the simulated region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Total managed memory in bytes
    pub total_bytes: u64,
    /// Size of one slot in bytes
    pub min_block_bytes: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            total_bytes: TOTAL_MEMORY,
            min_block_bytes: MIN_BLOCK_SIZE,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub memory: MemoryConfig,
}

impl SimConfig {
    /// Load the configuration, layering the environment over `path`.
    ///
    /// Without a file only the environment and the defaults apply. A file
    /// that is given but missing is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(::config::File::from(path));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Validated geometry described by this configuration
    pub fn geometry(&self) -> Result<Geometry> {
        Geometry::new(self.memory.total_bytes, self.memory.min_block_bytes)
    }
}
