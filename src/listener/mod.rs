//! Callback values accepted by the interception layer.
//!
//! A registration's callback is a [`Listener`]: either a callable
//! ([`Callback`]), a callback object implementing [`HandleEvent`], or one of the
//! malformed shapes a host may still be handed ([`Listener::Absent`],
//! [`Listener::Primitive`]). Only the first two are tracked; the others are
//! passed through to the host untouched.

pub mod options;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use options::{AddEventListenerOptions, ListenerOptions};

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Event payload handed to callbacks by the host when it dispatches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name, e.g. `"click"`.
    pub event_type: String,
    /// Arbitrary event detail.
    #[serde(default)]
    pub detail: Value,
}

impl Event {
    /// Create an event with no detail.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            detail: Value::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Callback
// ---------------------------------------------------------------------------

/// Shared callable behind a [`Callback`].
pub type CallbackFn = Arc<dyn Fn(&Event) + Send + Sync>;

/// A callable listener.
///
/// Cloning a `Callback` clones the reference, not the closure: clones compare
/// equal under [`Callback::ptr_eq`]. Two callbacks built from separate
/// closures never do, even if their source text is identical.
///
/// The manager and the host hold the closure strongly. A closure that
/// captures an `Arc` of the target it is registered on keeps that target
/// alive until the registration is removed or the target is released;
/// capture a `Weak` to avoid the cycle.
#[derive(Clone)]
pub struct Callback {
    func: CallbackFn,
    name: Option<String>,
    source: Option<String>,
}

impl Callback {
    /// A callback with a declared name. The name is its identity.
    pub fn named(
        name: impl Into<String>,
        func: impl Fn(&Event) + Send + Sync + 'static,
    ) -> Self {
        Self {
            func: Arc::new(func),
            name: Some(name.into()),
            source: None,
        }
    }

    /// An anonymous callback identified by its source text.
    ///
    /// Prefer the [`listener!`](crate::listener!) macro, which captures the
    /// source text of the closure for you.
    pub fn anonymous(
        source: impl Into<String>,
        func: impl Fn(&Event) + Send + Sync + 'static,
    ) -> Self {
        Self {
            func: Arc::new(func),
            name: None,
            source: Some(source.into()),
        }
    }

    /// A callback with neither name nor source text.
    pub fn from_fn(func: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        Self {
            func: Arc::new(func),
            name: None,
            source: None,
        }
    }

    /// Declared name, if any. Empty names count as undeclared.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// Source text, if known.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Invoke the callback.
    pub fn call(&self, event: &Event) {
        (self.func)(event)
    }

    /// Reference equality.
    pub fn ptr_eq(&self, other: &Callback) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Callback objects
// ---------------------------------------------------------------------------

/// An object-style listener: the host calls `handle_event` on it.
pub trait HandleEvent: Send + Sync + 'static {
    fn handle_event(&self, event: &Event);
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// The callback argument of a register/unregister call.
#[derive(Clone)]
pub enum Listener {
    /// A callable.
    Function(Callback),
    /// A callback object.
    Object(Arc<dyn HandleEvent>),
    /// No listener at all (`null`).
    Absent,
    /// Some other non-callable value.
    Primitive(Value),
}

impl Listener {
    /// Wrap a callback object.
    pub fn object(handler: impl HandleEvent) -> Self {
        Self::Object(Arc::new(handler))
    }

    /// Whether this value is callable.
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Whether the interception layer tracks this shape at all.
    pub fn is_trackable(&self) -> bool {
        matches!(self, Self::Function(_) | Self::Object(_))
    }

    /// Whether `self` and `other` are the same callback value.
    pub fn same_reference(&self, other: &Listener) -> bool {
        match (self, other) {
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            (Self::Absent, Self::Absent) => true,
            (Self::Primitive(a), Self::Primitive(b)) => a == b,
            _ => false,
        }
    }

    /// Deliver an event the way a host would.
    pub fn invoke(&self, event: &Event) {
        match self {
            Self::Function(cb) => cb.call(event),
            Self::Object(handler) => handler.handle_event(event),
            Self::Absent | Self::Primitive(_) => {}
        }
    }
}

impl From<Callback> for Listener {
    fn from(cb: Callback) -> Self {
        Self::Function(cb)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(cb) => f.debug_tuple("Function").field(cb).finish(),
            Self::Object(_) => f.write_str("Object(..)"),
            Self::Absent => f.write_str("Absent"),
            Self::Primitive(v) => f.debug_tuple("Primitive").field(v).finish(),
        }
    }
}

/// Build a [`Listener::Function`] from a closure, capturing its source text.
///
/// ```
/// use listener_guard::listener;
///
/// let anonymous = listener!(|_event| {});
/// let named = listener!("onClick" => |_event| {});
/// ```
///
/// Closures should capture their own target weakly (see [`Callback`]).
#[macro_export]
macro_rules! listener {
    ($name:literal => $func:expr) => {
        $crate::listener::Listener::Function($crate::listener::Callback::named($name, $func))
    };
    ($func:expr) => {
        $crate::listener::Listener::Function($crate::listener::Callback::anonymous(
            stringify!($func),
            $func,
        ))
    };
}
