//! In-process [`ListenerHost`].
//!
//! Attachments are kept per target in native order. Two flavours:
//! [`MemoryHost::new`] accepts repeated identical attachments, which makes
//! duplicate prevention observable, while [`MemoryHost::native`] ignores an
//! exact duplicate the way a browser does.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use super::ListenerHost;
use crate::errors::HostError;
use crate::listener::{Event, Listener, ListenerOptions};
use crate::target::{target_addr, EventTarget};

#[derive(Clone)]
struct Attachment {
    event_type: String,
    capture: bool,
    listener: Listener,
}

impl Attachment {
    fn matches(&self, event_type: &str, capture: bool, listener: &Listener) -> bool {
        self.capture == capture
            && self.event_type == event_type
            && self.listener.same_reference(listener)
    }
}

struct TargetAttachments {
    // Pins the allocation so the address key stays unique.
    _target: Weak<dyn EventTarget>,
    attachments: Vec<Attachment>,
}

/// Call counters, for asserting what reached the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub add_calls: usize,
    pub remove_calls: usize,
}

pub struct MemoryHost {
    targets: HashMap<usize, TargetAttachments>,
    // Weak handles pin torn-down allocations for the same reason.
    detached: HashMap<usize, Weak<dyn EventTarget>>,
    ignore_duplicates: bool,
    fail_removals: bool,
    supported: bool,
    stats: HostStats,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// A host that attaches every call, duplicates included.
    pub fn new() -> Self {
        Self {
            targets: HashMap::new(),
            detached: HashMap::new(),
            ignore_duplicates: false,
            fail_removals: false,
            supported: true,
            stats: HostStats::default(),
        }
    }

    /// A host that ignores exact duplicate attachments.
    pub fn native() -> Self {
        Self {
            ignore_duplicates: true,
            ..Self::new()
        }
    }

    /// A host without event-target support.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    /// Make every removal fail with [`HostError::Rejected`].
    pub fn set_fail_removals(&mut self, fail: bool) {
        self.fail_removals = fail;
    }

    /// Tear `target` down: its attachments vanish and further calls on it
    /// fail with [`HostError::Detached`].
    pub fn detach(&mut self, target: &Arc<dyn EventTarget>) {
        let addr = target_addr(target);
        self.targets.remove(&addr);
        self.detached.insert(addr, Arc::downgrade(target));
    }

    pub fn stats(&self) -> HostStats {
        self.stats
    }

    /// Attachments on `target` for `event_type`, across both phases.
    pub fn active_count(&self, target: &Arc<dyn EventTarget>, event_type: &str) -> usize {
        self.attachments(target)
            .iter()
            .filter(|a| a.event_type == event_type)
            .count()
    }

    /// All attachments on `target`.
    pub fn total_active(&self, target: &Arc<dyn EventTarget>) -> usize {
        self.attachments(target).len()
    }

    /// Whether this exact listener is attached under `(event_type, capture)`.
    pub fn is_attached(
        &self,
        target: &Arc<dyn EventTarget>,
        event_type: &str,
        listener: &Listener,
        capture: bool,
    ) -> bool {
        self.attachments(target)
            .iter()
            .any(|a| a.matches(event_type, capture, listener))
    }

    /// Deliver `event` to every listener attached for its type, in
    /// attachment order. Returns how many were invoked.
    pub fn dispatch(&self, target: &Arc<dyn EventTarget>, event: &Event) -> usize {
        let listeners: Vec<Listener> = self
            .attachments(target)
            .iter()
            .filter(|a| a.event_type == event.event_type)
            .map(|a| a.listener.clone())
            .collect();
        for listener in &listeners {
            listener.invoke(event);
        }
        listeners.len()
    }

    fn attachments(&self, target: &Arc<dyn EventTarget>) -> &[Attachment] {
        self.targets
            .get(&target_addr(target))
            .map(|t| t.attachments.as_slice())
            .unwrap_or(&[])
    }

    fn check_attached(&self, target: &Arc<dyn EventTarget>) -> Result<(), HostError> {
        if self.detached.contains_key(&target_addr(target)) {
            return Err(HostError::Detached);
        }
        Ok(())
    }
}

impl ListenerHost for MemoryHost {
    fn supports_event_targets(&self) -> bool {
        self.supported
    }

    fn add_event_listener(
        &mut self,
        target: &Arc<dyn EventTarget>,
        event_type: &str,
        listener: &Listener,
        options: &ListenerOptions,
    ) -> Result<(), HostError> {
        self.stats.add_calls += 1;
        self.check_attached(target)?;
        match listener {
            Listener::Absent => return Ok(()),
            Listener::Primitive(_) => {
                return Err(HostError::rejected("listener is neither callable nor an object"))
            }
            Listener::Function(_) | Listener::Object(_) => {}
        }

        let capture = options.capture();
        let entry = self
            .targets
            .entry(target_addr(target))
            .or_insert_with(|| TargetAttachments {
                _target: Arc::downgrade(target),
                attachments: Vec::new(),
            });
        if self.ignore_duplicates
            && entry
                .attachments
                .iter()
                .any(|a| a.matches(event_type, capture, listener))
        {
            return Ok(());
        }
        entry.attachments.push(Attachment {
            event_type: event_type.to_string(),
            capture,
            listener: listener.clone(),
        });
        Ok(())
    }

    fn remove_event_listener(
        &mut self,
        target: &Arc<dyn EventTarget>,
        event_type: &str,
        listener: &Listener,
        options: &ListenerOptions,
    ) -> Result<(), HostError> {
        self.stats.remove_calls += 1;
        self.check_attached(target)?;
        if self.fail_removals {
            return Err(HostError::rejected("removal refused"));
        }

        let capture = options.capture();
        if let Some(entry) = self.targets.get_mut(&target_addr(target)) {
            if let Some(pos) = entry
                .attachments
                .iter()
                .position(|a| a.matches(event_type, capture, listener))
            {
                entry.attachments.remove(pos);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHost")
            .field("targets", &self.targets.len())
            .field("ignore_duplicates", &self.ignore_duplicates)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
