//! The registration policy: what happens to every intercepted registration.
//!
//! In order:
//! 1. normalize the options to a capture flag;
//! 2. build the [`RegistrationKey`] from event type, capture flag and identity;
//! 3. the same callback already in that slot: reject, the host is never called;
//! 4. a different callback in that slot: remove the old one from the host
//!    (best-effort) and from the registry, then continue as fresh;
//! 5. on a volatile surface, remove every record of the same event type and
//!    phase, whatever its identity (best-effort);
//! 6. hand the call to the host unmodified and record it.

use std::sync::Arc;

use crate::config::ManagerConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::errors::{best_effort, HostError};
use crate::host::ListenerHost;
use crate::identity::identify;
use crate::listener::{Listener, ListenerOptions};
use crate::registry::{RegistrationKey, RegistrationRecord, SubRegistry, TargetRegistry};
use crate::target::{EventTarget, VolatileSelector};

/// Outcome of a registration attempt.
#[derive(Debug, Clone)]
pub enum Decision {
    /// The call went straight to the host without bookkeeping.
    Bypassed,
    /// Exact duplicate; nothing was attached.
    Rejected { key: RegistrationKey },
    /// Attached and recorded. `swept` counts stale records cleared from a
    /// volatile surface on the way.
    Accepted { key: RegistrationKey, swept: usize },
    /// Attached and recorded after removing `previous` from the same slot.
    Replaced {
        key: RegistrationKey,
        previous: RegistrationRecord,
        swept: usize,
    },
}

impl Decision {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    pub fn key(&self) -> Option<&RegistrationKey> {
        match self {
            Self::Bypassed => None,
            Self::Rejected { key } | Self::Accepted { key, .. } | Self::Replaced { key, .. } => {
                Some(key)
            }
        }
    }

    /// Records swept from a volatile surface.
    pub fn swept(&self) -> usize {
        match self {
            Self::Accepted { swept, .. } | Self::Replaced { swept, .. } => *swept,
            Self::Bypassed | Self::Rejected { .. } => 0,
        }
    }
}

/// Decides and applies the outcome of each registration.
#[derive(Debug, Clone)]
pub struct RegistrationPolicy {
    identity_max_len: usize,
    volatile: VolatileSelector,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self::from_config(&ManagerConfig::default())
    }
}

impl RegistrationPolicy {
    pub fn from_config(config: &ManagerConfig) -> Self {
        Self {
            identity_max_len: config.identity_max_len,
            volatile: config.volatile.clone(),
        }
    }

    /// The slot a `(event_type, listener, options)` call refers to.
    pub fn key_for(
        &self,
        event_type: &str,
        listener: &Listener,
        options: &ListenerOptions,
    ) -> RegistrationKey {
        RegistrationKey::new(
            event_type,
            options.capture(),
            identify(listener, self.identity_max_len),
        )
    }

    /// Apply the policy to one registration.
    ///
    /// Only the host's answer to the caller's own registration is returned as
    /// an error; failed removals of stale registrations are discarded.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn on_register<H: ListenerHost>(
        &self,
        registry: &mut TargetRegistry,
        host: &mut H,
        diagnostics: &Diagnostics,
        target: &Arc<dyn EventTarget>,
        event_type: &str,
        listener: &Listener,
        options: &ListenerOptions,
    ) -> Result<Decision, HostError> {
        let key = self.key_for(event_type, listener, options);
        let registrations = registry.get_or_create(target);

        let mut previous = None;
        if let Some(existing) = registrations.get(&key) {
            if existing.listener.same_reference(listener) {
                diagnostics.emit(|| Diagnostic::DuplicateRejected {
                    target: target.describe(),
                    event_type: event_type.to_string(),
                    identity: key.identity.to_string(),
                });
                return Ok(Decision::Rejected { key });
            }

            diagnostics.emit(|| Diagnostic::Replaced {
                target: target.describe(),
                event_type: event_type.to_string(),
                identity: key.identity.to_string(),
            });
            if let Some(stale) = registrations.remove(&key) {
                best_effort(host.remove_event_listener(
                    target,
                    &stale.event_type,
                    &stale.listener,
                    &stale.options,
                ));
                previous = Some(stale);
            }
        }

        let swept = if self.volatile.is_volatile(target) {
            sweep_family(registrations, host, target, event_type, key.capture)
        } else {
            0
        };
        if swept > 0 {
            diagnostics.emit(|| Diagnostic::Swept {
                target: target.describe(),
                event_type: event_type.to_string(),
                count: swept,
            });
        }

        host.add_event_listener(target, event_type, listener, options)?;
        registrations.insert(
            key.clone(),
            RegistrationRecord {
                event_type: event_type.to_string(),
                listener: listener.clone(),
                options: options.clone(),
                identity: key.identity.clone(),
            },
        );

        Ok(match previous {
            Some(previous) => Decision::Replaced {
                key,
                previous,
                swept,
            },
            None => Decision::Accepted { key, swept },
        })
    }
}

/// Remove every `(event_type, capture)` record from the host and the
/// sub-registry. Returns how many records were dropped.
fn sweep_family<H: ListenerHost>(
    registrations: &mut SubRegistry,
    host: &mut H,
    target: &Arc<dyn EventTarget>,
    event_type: &str,
    capture: bool,
) -> usize {
    let stale = registrations.drain_family(event_type, capture);
    for (_, record) in &stale {
        best_effort(host.remove_event_listener(
            target,
            &record.event_type,
            &record.listener,
            &record.options,
        ));
    }
    stale.len()
}
