//! Engine configuration
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file is a valid configuration.
//!
//! ```toml
//! [engine]
//! max_nesting = 256
//!
//! [run]
//! dump_state = true
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default limit on nested blocks (loops, branches, calls)
pub const DEFAULT_MAX_NESTING: usize = 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub engine: EngineConfig,
    pub run: RunConfig,
}

/// Settings shared by every machine of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Deepest allowed nesting of blocks before `NestingTooDeep`
    pub max_nesting: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

/// Settings for the `run` command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Print the final global bindings as JSON after a successful run
    pub dump_state: bool,
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::config_error(e.message()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }
}
