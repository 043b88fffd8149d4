//! Install-time configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::identity::DEFAULT_IDENTITY_MAX_LEN;
use crate::target::VolatileSelector;

fn default_identity_max_len() -> usize {
    DEFAULT_IDENTITY_MAX_LEN
}

/// Configuration accepted by `install`.
///
/// Every field has a default, so `{}` and `{"debug": true}` are both valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Emit diagnostic notifications.
    #[serde(default)]
    pub debug: bool,

    /// Characters of source text kept when identifying anonymous callables.
    #[serde(default = "default_identity_max_len")]
    pub identity_max_len: usize,

    /// Which targets count as volatile surfaces.
    #[serde(default)]
    pub volatile: VolatileSelector,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            identity_max_len: DEFAULT_IDENTITY_MAX_LEN,
            volatile: VolatileSelector::default(),
        }
    }
}

impl ManagerConfig {
    /// Default configuration with diagnostics on.
    pub fn debug() -> Self {
        Self {
            debug: true,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}
