//! Targets that callbacks are registered on, and the volatile-surface predicate.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Any addressable object that can receive registered callbacks.
///
/// The structural accessors describe where the target sits in a UI tree.
/// Window-like objects and custom dispatchers keep the defaults, which makes
/// them never match a [`VolatileSelector`].
///
/// The manager never keeps a target alive, but it does keep registered
/// callbacks alive: a callback holding an `Arc` to this target pins it until
/// the registration is removed or the manager releases the target.
pub trait EventTarget: Send + Sync + 'static {
    /// Element id, if the target has one.
    fn element_id(&self) -> Option<String> {
        None
    }

    /// Class names carried by the target.
    fn class_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Structural parent, if any.
    fn parent_target(&self) -> Option<Arc<dyn EventTarget>> {
        None
    }

    /// Short human-readable label for diagnostics.
    fn describe(&self) -> String {
        match self.element_id() {
            Some(id) => format!("#{id}"),
            None => "<target>".to_string(),
        }
    }
}

impl fmt::Debug for dyn EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Address of the target allocation, used as its identity.
pub(crate) fn target_addr(target: &Arc<dyn EventTarget>) -> usize {
    Arc::as_ptr(target) as *const () as usize
}

// ---------------------------------------------------------------------------
// VolatileSelector
// ---------------------------------------------------------------------------

fn default_classes() -> Vec<String> {
    vec!["modal".to_string(), "map-container".to_string()]
}

fn default_id_fragments() -> Vec<String> {
    vec!["Modal".to_string(), "modal".to_string()]
}

/// Structural predicate for volatile surfaces (dialogs, overlays, maps).
///
/// A target is volatile when it, or any of its ancestors, carries one of
/// `classes` or has an id containing one of `id_fragments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolatileSelector {
    /// Exact class names that mark a volatile container.
    #[serde(default = "default_classes")]
    pub classes: Vec<String>,
    /// Substrings of an element id that mark a volatile container.
    #[serde(default = "default_id_fragments")]
    pub id_fragments: Vec<String>,
}

impl Default for VolatileSelector {
    fn default() -> Self {
        Self {
            classes: default_classes(),
            id_fragments: default_id_fragments(),
        }
    }
}

impl VolatileSelector {
    /// A selector that matches nothing.
    pub fn none() -> Self {
        Self {
            classes: Vec::new(),
            id_fragments: Vec::new(),
        }
    }

    /// Whether `target` itself matches, ignoring ancestors.
    pub fn matches_node(&self, target: &dyn EventTarget) -> bool {
        if !self.classes.is_empty() {
            let classes = target.class_names();
            if classes.iter().any(|c| self.classes.contains(c)) {
                return true;
            }
        }
        if self.id_fragments.is_empty() {
            return false;
        }
        target.element_id().is_some_and(|id| {
            self.id_fragments
                .iter()
                .any(|fragment| id.contains(fragment.as_str()))
        })
    }

    /// Whether `target` is, or is contained within, a volatile surface.
    pub fn is_volatile(&self, target: &Arc<dyn EventTarget>) -> bool {
        if self.matches_node(target.as_ref()) {
            return true;
        }
        let mut current = target.parent_target();
        while let Some(node) = current {
            if self.matches_node(node.as_ref()) {
                return true;
            }
            current = node.parent_target();
        }
        false
    }
}
