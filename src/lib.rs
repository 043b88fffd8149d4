//! # listener-guard
//!
//! Interception layer for event-listener registration. Applications that
//! re-attach callbacks on every render, without tracking what they attached
//! before, route their register/unregister calls through an
//! [`EventListenerManager`]. The manager:
//!
//! - rejects a callback that is already attached to the same target under the
//!   same event type and phase;
//! - replaces an attachment whose callback has the same identity but is a
//!   different value;
//! - clears stale attachments from volatile surfaces (dialogs, overlays, map
//!   containers) that get torn down and rebuilt without unregistering.
//!
//! The host environment supplies the native primitives through
//! [`ListenerHost`]; targets implement [`EventTarget`]. The registry never
//! keeps a target alive.
//!
//! ```
//! use std::sync::Arc;
//! use listener_guard::{listener, EventListenerManager, EventTarget, ManagerConfig, MemoryHost};
//!
//! struct Button;
//! impl EventTarget for Button {}
//!
//! let mut manager = EventListenerManager::new(MemoryHost::new());
//! manager.install(ManagerConfig::default());
//!
//! let button: Arc<dyn EventTarget> = Arc::new(Button);
//! let on_click = listener!("onClick" => |_event| {});
//! manager.add_event_listener(&button, "click", &on_click, false).unwrap();
//! let again = manager.add_event_listener(&button, "click", &on_click, false).unwrap();
//! assert!(again.is_rejected());
//! assert_eq!(manager.host().active_count(&button, "click"), 1);
//! ```

pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod host;
pub mod identity;
pub mod lifecycle;
pub mod listener;
pub mod manager;
pub mod policy;
pub mod registry;
pub mod target;

pub use config::ManagerConfig;
pub use diagnostics::{Diagnostic, DiagnosticSink, LogSink, RecordingSink, Severity};
pub use errors::{best_effort, ConfigError, HostError};
pub use host::{ListenerHost, MemoryHost};
pub use identity::{identify, IdentityToken};
pub use lifecycle::LifecycleState;
pub use listener::{
    AddEventListenerOptions, Callback, Event, HandleEvent, Listener, ListenerOptions,
};
pub use manager::EventListenerManager;
pub use policy::{Decision, RegistrationPolicy};
pub use registry::{RegistrationKey, RegistrationRecord, Registrations};
pub use target::{EventTarget, VolatileSelector};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
