//! Graph configuration
//!
//! Settings are plain serde data, so they can be embedded in a larger
//! settings file or loaded on their own from RON text.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a [`Graph`](crate::Graph)
///
/// # Example
///
/// ```
/// use strand_core::GraphConfig;
///
/// let config = GraphConfig::from_ron("(id_width: 8)").unwrap();
/// assert_eq!(config.id_width, 8);
/// assert!(config.rollback_on_connect_failure);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Byte width of generated entity ids
    pub id_width: usize,

    /// Seed of the id generator
    pub id_seed: u64,

    /// Attempts before id generation gives up
    pub max_id_attempts: usize,

    /// Undo a failed component connect
    ///
    /// When set, a failing connect removes the component, every component
    /// it auto-added and every property it created. When cleared, whatever
    /// was attached before the failure stays attached.
    pub rollback_on_connect_failure: bool,
}

impl GraphConfig {
    /// Parse a configuration from RON text; missing fields take defaults
    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Create a configuration with the given id width
    pub fn with_id_width(id_width: usize) -> Self {
        Self {
            id_width,
            ..Self::default()
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            id_width: 4,
            id_seed: 12345,
            max_id_attempts: 64,
            rollback_on_connect_failure: true,
        }
    }
}
