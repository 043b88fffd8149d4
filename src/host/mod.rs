//! The host runtime's native register/unregister primitives.
//!
//! [`ListenerHost`] is the seam between the interception layer and whatever
//! actually attaches callbacks (a DOM binding, a widget toolkit, a custom
//! dispatcher). [`MemoryHost`] is an in-process implementation.

pub mod memory;

use std::sync::Arc;

use crate::errors::HostError;
use crate::listener::{Listener, ListenerOptions};
use crate::target::EventTarget;

pub use memory::MemoryHost;

/// Native listener primitives of the host environment.
pub trait ListenerHost {
    /// Whether the environment has event targets at all.
    ///
    /// Read once when a manager is constructed.
    fn supports_event_targets(&self) -> bool {
        true
    }

    /// Attach `listener` to `target` for `event_type`.
    fn add_event_listener(
        &mut self,
        target: &Arc<dyn EventTarget>,
        event_type: &str,
        listener: &Listener,
        options: &ListenerOptions,
    ) -> Result<(), HostError>;

    /// Detach `listener` from `target` for `event_type`.
    fn remove_event_listener(
        &mut self,
        target: &Arc<dyn EventTarget>,
        event_type: &str,
        listener: &Listener,
        options: &ListenerOptions,
    ) -> Result<(), HostError>;
}
