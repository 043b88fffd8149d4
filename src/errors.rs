//! Error types for listener-guard.
//!
//! Nothing in the interception path turns these into panics. Host errors on the
//! caller's own registration are returned unchanged; host errors while cleaning
//! up stale registrations are discarded through [`best_effort`].

use thiserror::Error;

/// Failure reported by a [`ListenerHost`](crate::host::ListenerHost) primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The target has already been torn down on the host side.
    #[error("target is detached from the host")]
    Detached,

    /// The host refused the operation.
    #[error("host rejected the operation: {reason}")]
    Rejected { reason: String },
}

impl HostError {
    /// Convenience constructor for [`HostError::Rejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Errors from loading a [`ManagerConfig`](crate::config::ManagerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration text is not valid JSON for the config schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Discard the failure of a cleanup removal.
///
/// Stale registrations may already be gone on the host side, so their removal
/// is best-effort: the failure is logged at debug level and dropped. Returns
/// whether the removal succeeded.
pub fn best_effort(result: Result<(), HostError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            log::debug!(target: "listener_guard", "ignoring stale removal failure: {}", e);
            false
        }
    }
}
