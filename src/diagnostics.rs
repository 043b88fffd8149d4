//! Diagnostic notifications.
//!
//! Diagnostics are side information only: the manager emits them when debug
//! mode is on and never consults the sink for decisions. The default
//! [`LogSink`] forwards to the `log` facade.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

const PREFIX: &str = "[EventListenerManager]";

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
}

/// A structured notification from the interception layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The same callback was registered again under the same slot.
    DuplicateRejected {
        target: String,
        event_type: String,
        identity: String,
    },
    /// A different callback with the same identity replaced the old one.
    Replaced {
        target: String,
        event_type: String,
        identity: String,
    },
    /// Stale registrations were cleared from a volatile surface.
    Swept {
        target: String,
        event_type: String,
        count: usize,
    },
    Installed,
    Uninstalled,
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Self::DuplicateRejected { .. } => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRejected {
                target,
                event_type,
                identity,
            } => write!(
                f,
                "blocked: \"{event_type}\" is already registered on {target} (id: {identity})"
            ),
            Self::Replaced {
                target,
                event_type,
                identity,
            } => write!(
                f,
                "replaced: a similar \"{event_type}\" listener on {target} was removed before adding the new one (id: {identity})"
            ),
            Self::Swept {
                target,
                event_type,
                count,
            } => write!(
                f,
                "volatile cleanup: removed {count} stale \"{event_type}\" listener(s) from {target}"
            ),
            Self::Installed => f.write_str("interception installed and active"),
            Self::Uninstalled => f.write_str("original primitives restored"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receiver of diagnostic notifications.
pub trait DiagnosticSink: Send + Sync {
    fn notify(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to the `log` facade under the `listener_guard` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn notify(&self, diagnostic: &Diagnostic) {
        match diagnostic.severity() {
            Severity::Warning => {
                log::warn!(target: "listener_guard", "{} {}", PREFIX, diagnostic)
            }
            Severity::Info => {
                log::info!(target: "listener_guard", "{} {}", PREFIX, diagnostic)
            }
        }
    }
}

/// Keeps every diagnostic it receives. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    received: Arc<Mutex<Vec<Diagnostic>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything received so far.
    pub fn received(&self) -> Vec<Diagnostic> {
        self.received.lock().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn notify(&self, diagnostic: &Diagnostic) {
        self.received.lock().push(diagnostic.clone());
    }
}

/// Debug-gated handle to a sink.
#[derive(Clone)]
pub(crate) struct Diagnostics {
    enabled: bool,
    sink: Arc<dyn DiagnosticSink>,
}

impl Diagnostics {
    pub(crate) fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            enabled: false,
            sink,
        }
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn enabled(&self) -> bool {
        self.enabled
    }

    /// Emit lazily so nothing is formatted while debug mode is off.
    pub(crate) fn emit(&self, diagnostic: impl FnOnce() -> Diagnostic) {
        if self.enabled {
            self.sink.notify(&diagnostic());
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
