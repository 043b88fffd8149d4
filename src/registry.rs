//! Per-target registration bookkeeping.
//!
//! [`TargetRegistry`] associates each target with its own [`SubRegistry`]
//! without keeping the target alive. Entries hold a [`Weak`] handle keyed by
//! the target's allocation address; the weak handle pins the allocation, so an
//! address is never reused while its entry exists. Entries whose target has
//! lost all strong owners are dead and get pruned.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::identity::IdentityToken;
use crate::listener::{Listener, ListenerOptions};
use crate::target::{target_addr, EventTarget};

/// Entry count at which the first amortized prune runs.
const INITIAL_PRUNE_THRESHOLD: usize = 64;

// ---------------------------------------------------------------------------
// Key and record
// ---------------------------------------------------------------------------

/// The slot a registration occupies within one target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationKey {
    pub event_type: String,
    pub capture: bool,
    pub identity: IdentityToken,
}

impl RegistrationKey {
    pub fn new(event_type: impl Into<String>, capture: bool, identity: IdentityToken) -> Self {
        Self {
            event_type: event_type.into(),
            capture,
            identity,
        }
    }

    /// Whether this key belongs to the `(event_type, capture)` family.
    pub fn same_slot_family(&self, event_type: &str, capture: bool) -> bool {
        self.capture == capture && self.event_type == event_type
    }
}

impl fmt::Display for RegistrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.event_type, self.capture, self.identity)
    }
}

/// An accepted registration.
#[derive(Debug, Clone)]
pub struct RegistrationRecord {
    pub event_type: String,
    /// The caller's callback; a shared reference, not a copy.
    pub listener: Listener,
    /// Options exactly as supplied at registration.
    pub options: ListenerOptions,
    pub identity: IdentityToken,
}

/// Ordered snapshot of a target's registrations, as returned by `inspect`.
pub type Registrations = IndexMap<RegistrationKey, RegistrationRecord>;

// ---------------------------------------------------------------------------
// SubRegistry
// ---------------------------------------------------------------------------

/// One target's registrations, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SubRegistry {
    records: Registrations,
}

impl SubRegistry {
    pub fn get(&self, key: &RegistrationKey) -> Option<&RegistrationRecord> {
        self.records.get(key)
    }

    /// Store `record` at `key`, overwriting any record already there.
    pub fn insert(&mut self, key: RegistrationKey, record: RegistrationRecord) {
        self.records.insert(key, record);
    }

    /// Remove the record at `key`, keeping the order of the rest.
    pub fn remove(&mut self, key: &RegistrationKey) -> Option<RegistrationRecord> {
        self.records.shift_remove(key)
    }

    /// Remove every record in the `(event_type, capture)` family, whatever its
    /// identity, and return them in insertion order.
    pub fn drain_family(
        &mut self,
        event_type: &str,
        capture: bool,
    ) -> Vec<(RegistrationKey, RegistrationRecord)> {
        let mut drained = Vec::new();
        let mut kept = Registrations::with_capacity(self.records.len());
        for (key, record) in self.records.drain(..) {
            if key.same_slot_family(event_type, capture) {
                drained.push((key, record));
            } else {
                kept.insert(key, record);
            }
        }
        self.records = kept;
        drained
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegistrationKey, &RegistrationRecord)> {
        self.records.iter()
    }

    /// Owned copy of the records.
    pub fn snapshot(&self) -> Registrations {
        self.records.clone()
    }
}

// ---------------------------------------------------------------------------
// TargetRegistry
// ---------------------------------------------------------------------------

struct TargetEntry {
    target: Weak<dyn EventTarget>,
    registrations: SubRegistry,
}

impl TargetEntry {
    fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

/// Weakly keyed association from targets to their [`SubRegistry`].
pub struct TargetRegistry {
    entries: HashMap<usize, TargetEntry>,
    prune_threshold: usize,
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            prune_threshold: INITIAL_PRUNE_THRESHOLD,
        }
    }

    /// The sub-registry of `target`, created empty on first access.
    pub fn get_or_create(&mut self, target: &Arc<dyn EventTarget>) -> &mut SubRegistry {
        if self.entries.len() >= self.prune_threshold {
            self.prune();
            self.prune_threshold = (self.entries.len() * 2).max(INITIAL_PRUNE_THRESHOLD);
        }
        &mut self
            .entries
            .entry(target_addr(target))
            .or_insert_with(|| TargetEntry {
                target: Arc::downgrade(target),
                registrations: SubRegistry::default(),
            })
            .registrations
    }

    /// The sub-registry of `target`, or `None` if it never registered.
    pub fn lookup(&self, target: &Arc<dyn EventTarget>) -> Option<&SubRegistry> {
        self.entries
            .get(&target_addr(target))
            .map(|entry| &entry.registrations)
    }

    pub fn lookup_mut(&mut self, target: &Arc<dyn EventTarget>) -> Option<&mut SubRegistry> {
        self.entries
            .get_mut(&target_addr(target))
            .map(|entry| &mut entry.registrations)
    }

    /// Drop the sub-registry of `target`, for hosts that signal teardown.
    pub fn release(&mut self, target: &Arc<dyn EventTarget>) -> Option<SubRegistry> {
        self.entries
            .remove(&target_addr(target))
            .map(|entry| entry.registrations)
    }

    /// Drop entries whose target no longer has strong owners. Returns the count.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_alive());
        before - self.entries.len()
    }

    /// Number of sub-registries whose target is still alive.
    pub fn tracked_targets(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_alive()).count()
    }
}

impl fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetRegistry")
            .field("entries", &self.entries.len())
            .field("prune_threshold", &self.prune_threshold)
            .finish()
    }
}
