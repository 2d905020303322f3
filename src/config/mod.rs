//! Sync layer configuration.
//!
//! Every field has a default matching the reference protocol constants;
//! a TOML file can override any of them. The connection target itself is
//! not configuration - it is supplied by the CLI per invocation.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default chunk size for uploads (2 × 65536, the reference constant).
pub const DEFAULT_CHUNK_SIZE: u64 = 65536 * 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config file parsing error")]
    Toml(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SyncConfig {
    pub tree: TreeConfig,
    pub upload: UploadConfig,
    pub event: EventConfig,
}

/// Tree fragment constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// `class` value marking a node as a tree-fragment row.
    pub marker_class: String,

    /// Designated root placeholder id: content is replaced wholesale,
    /// the root never wraps.
    pub root_id: String,

    /// Attribute carrying the expansion state, so the state lives with
    /// the externally-owned document.
    pub state_attr: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            marker_class: "tree-node".to_string(),
            root_id: "tree-root".to_string(),
            state_attr: "data-tree-expanded".to_string(),
        }
    }
}

/// Upload constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Chunk size announced in outbound file requests.
    pub chunk_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Interaction event constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Attribute holding the percent-encoded declarative event
    /// descriptor.
    pub descriptor_attr: String,

    /// Attribute attaching local files to a node (headless stand-in for
    /// a browser file selection).
    pub file_attr: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            descriptor_attr: "data-event".to_string(),
            file_attr: "data-file".to_string(),
        }
    }
}

impl SyncConfig {
    /// Load configuration. `None` means defaults only; a path means the
    /// file must exist and parse.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Ok(toml::from_str(&text)?)
    }
}

// =============================================================================
// Tests
// =============================================================================
