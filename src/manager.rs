//! The interception layer.
//!
//! [`EventListenerManager`] owns the host's native primitives and exposes
//! wrapped versions of them. While uninstalled every registration goes
//! straight to the host; once installed, registrations pass through the
//! [`RegistrationPolicy`]. Removals keep the registry in step with the host
//! in both states. The host itself is never modified, so uninstalling restores the
//! original primitives no matter how often install/uninstall ran.

use std::sync::Arc;

use crate::config::ManagerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink, Diagnostics, LogSink};
use crate::errors::HostError;
use crate::host::ListenerHost;
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::listener::{Listener, ListenerOptions};
use crate::policy::{Decision, RegistrationPolicy};
use crate::registry::{Registrations, TargetRegistry};
use crate::target::EventTarget;

/// Deduplicating wrapper around a [`ListenerHost`].
pub struct EventListenerManager<H: ListenerHost> {
    host: H,
    registry: TargetRegistry,
    policy: RegistrationPolicy,
    diagnostics: Diagnostics,
    lifecycle: Lifecycle,
}

impl<H: ListenerHost> EventListenerManager<H> {
    /// Wrap `host`, reporting diagnostics through the `log` facade.
    pub fn new(host: H) -> Self {
        Self::with_sink(host, Arc::new(LogSink))
    }

    /// Wrap `host`, reporting diagnostics to `sink`.
    pub fn with_sink(host: H, sink: Arc<dyn DiagnosticSink>) -> Self {
        let supported = host.supports_event_targets();
        if !supported {
            log::debug!(target: "listener_guard", "host has no event targets; interception disabled");
        }
        Self {
            host,
            registry: TargetRegistry::new(),
            policy: RegistrationPolicy::default(),
            diagnostics: Diagnostics::new(sink),
            lifecycle: Lifecycle::new(supported),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start intercepting. A second call before [`uninstall`](Self::uninstall)
    /// is a no-op, including for its configuration.
    pub fn install(&mut self, config: ManagerConfig) {
        if !self.lifecycle.install() {
            return;
        }
        self.diagnostics.set_enabled(config.debug);
        self.policy = RegistrationPolicy::from_config(&config);
        self.diagnostics.emit(|| Diagnostic::Installed);
    }

    /// Stop intercepting and route every call to the host again.
    ///
    /// Recorded registrations are kept, and removals made while uninstalled
    /// still drop their records, so the registry keeps describing what is
    /// attached on the host.
    pub fn uninstall(&mut self) {
        if self.lifecycle.uninstall() {
            self.diagnostics.emit(|| Diagnostic::Uninstalled);
        }
    }

    /// Whether the host environment has event targets at all.
    pub fn is_supported(&self) -> bool {
        self.lifecycle.is_supported()
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    pub fn debug_enabled(&self) -> bool {
        self.diagnostics.enabled()
    }

    // -----------------------------------------------------------------------
    // Wrapped primitives
    // -----------------------------------------------------------------------

    /// Wrapped register.
    ///
    /// Untrackable listener shapes and calls made while uninstalled reach the
    /// host unchanged and yield [`Decision::Bypassed`]. Errors are the host's
    /// own answer to this registration.
    pub fn add_event_listener(
        &mut self,
        target: &Arc<dyn EventTarget>,
        event_type: &str,
        listener: &Listener,
        options: impl Into<ListenerOptions>,
    ) -> Result<Decision, HostError> {
        let options = options.into();
        if !self.is_active() || !listener.is_trackable() {
            self.host
                .add_event_listener(target, event_type, listener, &options)?;
            return Ok(Decision::Bypassed);
        }
        self.policy.on_register(
            &mut self.registry,
            &mut self.host,
            &self.diagnostics,
            target,
            event_type,
            listener,
            &options,
        )
    }

    /// Wrapped unregister.
    ///
    /// Drops the matching record, if this exact callback is the one recorded
    /// in the slot, then always delegates to the host with the caller's
    /// arguments. The record is dropped in either lifecycle state.
    pub fn remove_event_listener(
        &mut self,
        target: &Arc<dyn EventTarget>,
        event_type: &str,
        listener: &Listener,
        options: impl Into<ListenerOptions>,
    ) -> Result<(), HostError> {
        let options = options.into();
        if self.is_supported() && listener.is_trackable() {
            if let Some(registrations) = self.registry.lookup_mut(target) {
                let key = self.policy.key_for(event_type, listener, &options);
                let recorded = registrations
                    .get(&key)
                    .is_some_and(|record| record.listener.same_reference(listener));
                if recorded {
                    registrations.remove(&key);
                }
            }
        }
        self.host
            .remove_event_listener(target, event_type, listener, &options)
    }

    // -----------------------------------------------------------------------
    // Introspection and teardown
    // -----------------------------------------------------------------------

    /// Snapshot of `target`'s registrations, or `None` if it has never
    /// registered through this manager.
    pub fn inspect(&self, target: &Arc<dyn EventTarget>) -> Option<Registrations> {
        self.registry.lookup(target).map(|sub| sub.snapshot())
    }

    /// Forget `target`'s registrations. Returns whether it had any record.
    pub fn release(&mut self, target: &Arc<dyn EventTarget>) -> bool {
        self.registry.release(target).is_some()
    }

    /// Drop registries of targets that no longer exist. Returns the count.
    pub fn prune(&mut self) -> usize {
        self.registry.prune()
    }

    pub fn tracked_targets(&self) -> usize {
        self.registry.tracked_targets()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<H: ListenerHost + std::fmt::Debug> std::fmt::Debug for EventListenerManager<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListenerManager")
            .field("host", &self.host)
            .field("registry", &self.registry)
            .field("lifecycle", &self.lifecycle)
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{RecordingSink, Severity};
    use crate::host::MemoryHost;
    use crate::listener;
    use crate::listener::{Callback, Event, HandleEvent};
    use crate::target::test_support::TestElement;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn installed() -> (EventListenerManager<MemoryHost>, RecordingSink) {
        let sink = RecordingSink::new();
        let mut manager = EventListenerManager::with_sink(MemoryHost::new(), Arc::new(sink.clone()));
        manager.install(ManagerConfig::debug());
        (manager, sink)
    }

    #[test]
    fn test_no_duplicate_attachment() {
        let (mut manager, _) = installed();
        let target = TestElement::plain();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let cb = Listener::from(Callback::named("onClick", move |_e| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let first = manager
            .add_event_listener(&target, "click", &cb, false)
            .unwrap();
        let second = manager
            .add_event_listener(&target, "click", &cb, false)
            .unwrap();

        assert!(matches!(first, Decision::Accepted { .. }));
        assert!(second.is_rejected());
        assert_eq!(manager.host().dispatch(&target, &Event::new("click")), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_identical_anonymous_text_replaces() {
        let (mut manager, sink) = installed();
        let target = TestElement::plain();
        let make = || listener!(|_e| {});
        let (f1, f2) = (make(), make());

        manager
            .add_event_listener(&target, "click", &f1, ListenerOptions::Absent)
            .unwrap();
        let decision = manager
            .add_event_listener(&target, "click", &f2, ListenerOptions::Absent)
            .unwrap();

        assert!(matches!(decision, Decision::Replaced { .. }));
        assert!(!manager.host().is_attached(&target, "click", &f1, false));
        assert!(manager.host().is_attached(&target, "click", &f2, false));
        assert_eq!(manager.host().active_count(&target, "click"), 1);
        assert!(sink
            .received()
            .iter()
            .any(|d| matches!(d, Diagnostic::Replaced { .. })));
    }

    #[test]
    fn test_unregister_updates_registry() {
        let (mut manager, _) = installed();
        let target = TestElement::plain();
        let cb = listener!("onScroll" => |_e| {});

        let key = manager
            .add_event_listener(&target, "scroll", &cb, true)
            .unwrap()
            .key()
            .cloned()
            .unwrap();
        manager
            .remove_event_listener(&target, "scroll", &cb, true)
            .unwrap();

        let snapshot = manager.inspect(&target).expect("target has a registry");
        assert!(!snapshot.contains_key(&key));
        assert_eq!(manager.host().total_active(&target), 0);

        let again = manager
            .add_event_listener(&target, "scroll", &cb, true)
            .unwrap();
        assert!(matches!(again, Decision::Accepted { .. }));
    }

    #[test]
    fn test_unregister_of_other_reference_keeps_record() {
        let (mut manager, _) = installed();
        let target = TestElement::plain();
        let attached = listener!("onClick" => |_e| {});
        let stranger = listener!("onClick" => |_e| {});

        manager
            .add_event_listener(&target, "click", &attached, false)
            .unwrap();
        manager
            .remove_event_listener(&target, "click", &stranger, false)
            .unwrap();

        assert_eq!(manager.inspect(&target).unwrap().len(), 1);
        assert!(manager.host().is_attached(&target, "click", &attached, false));
        assert_eq!(manager.host().stats().remove_calls, 1);
    }

    #[test]
    fn test_unregister_always_delegates() {
        let (mut manager, _) = installed();
        let untracked = TestElement::plain();
        let cb = listener!(|_e| {});
        manager
            .remove_event_listener(&untracked, "click", &cb, false)
            .unwrap();
        assert_eq!(manager.host().stats().remove_calls, 1);
        assert!(manager.inspect(&untracked).is_none());
    }

    #[test]
    fn test_volatile_sweep_scope() {
        let (mut manager, sink) = installed();
        let dialog = TestElement::with_id("confirmModal");
        let click = listener!("render1Click" => |_e| {});
        let keydown = listener!("render1Keydown" => |_e| {});
        let fresh_click = listener!("render2Click" => |_e| {});

        manager
            .add_event_listener(&dialog, "click", &click, false)
            .unwrap();
        manager
            .add_event_listener(&dialog, "keydown", &keydown, false)
            .unwrap();
        let decision = manager
            .add_event_listener(&dialog, "click", &fresh_click, false)
            .unwrap();

        assert_eq!(decision.swept(), 1);
        assert_eq!(manager.host().active_count(&dialog, "click"), 1);
        assert!(manager.host().is_attached(&dialog, "keydown", &keydown, false));
        let snapshot = manager.inspect(&dialog).unwrap();
        let events: Vec<_> = snapshot.keys().map(|k| k.event_type.as_str()).collect();
        assert_eq!(events, ["keydown", "click"]);
        assert!(sink
            .received()
            .iter()
            .any(|d| matches!(d, Diagnostic::Swept { count: 1, .. })));
    }

    #[test]
    fn test_sweep_tolerates_torn_down_listeners() {
        let (mut manager, _) = installed();
        let dialog = TestElement::with_class("modal");
        manager
            .add_event_listener(&dialog, "click", &listener!("a" => |_e| {}), false)
            .unwrap();
        manager.host_mut().set_fail_removals(true);
        let decision = manager
            .add_event_listener(&dialog, "click", &listener!("b" => |_e| {}), false)
            .unwrap();
        assert_eq!(decision.swept(), 1);
        assert_eq!(manager.inspect(&dialog).unwrap().len(), 1);
    }

    #[test]
    fn test_non_callable_passthrough() {
        let primitive = Listener::Primitive(Value::from(7));

        let mut plain = MemoryHost::new();
        let bare = TestElement::plain();
        let native = plain.add_event_listener(&bare, "click", &primitive, &ListenerOptions::Absent);

        let (mut manager, _) = installed();
        let target = TestElement::plain();
        let wrapped = manager.add_event_listener(&target, "click", &primitive, false);

        assert_eq!(native.is_err(), wrapped.is_err());
        assert!(manager.inspect(&target).is_none());

        let absent = manager
            .add_event_listener(&target, "click", &Listener::Absent, false)
            .unwrap();
        assert!(matches!(absent, Decision::Bypassed));
        assert!(manager.inspect(&target).is_none());
        assert_eq!(manager.host().stats().add_calls, 2);
    }

    #[test]
    fn test_callback_objects_share_sentinel_slot() {
        struct Handler;
        impl HandleEvent for Handler {
            fn handle_event(&self, _event: &Event) {}
        }

        let (mut manager, _) = installed();
        let target = TestElement::plain();
        let first = Listener::object(Handler);
        let second = Listener::object(Handler);

        manager
            .add_event_listener(&target, "click", &first, false)
            .unwrap();
        assert!(manager
            .add_event_listener(&target, "click", &first, false)
            .unwrap()
            .is_rejected());
        assert!(matches!(
            manager
                .add_event_listener(&target, "click", &second, false)
                .unwrap(),
            Decision::Replaced { .. }
        ));
        assert_eq!(manager.host().total_active(&target), 1);
    }

    #[test]
    fn test_uninstall_restores_native_behavior() {
        let (mut manager, _) = installed();
        let target = TestElement::plain();
        let cb = listener!(|_e| {});
        manager.uninstall();

        assert!(matches!(
            manager.add_event_listener(&target, "click", &cb, false).unwrap(),
            Decision::Bypassed
        ));
        manager
            .add_event_listener(&target, "click", &cb, false)
            .unwrap();
        assert_eq!(manager.host().active_count(&target, "click"), 2);
        assert!(manager.inspect(&target).is_none());
    }

    #[test]
    fn test_removal_while_uninstalled_clears_record() {
        let (mut manager, _) = installed();
        let target = TestElement::plain();
        let cb = listener!("onClick" => |_e| {});

        manager
            .add_event_listener(&target, "click", &cb, false)
            .unwrap();
        manager.uninstall();
        manager
            .remove_event_listener(&target, "click", &cb, false)
            .unwrap();
        assert!(manager.inspect(&target).unwrap().is_empty());
        assert_eq!(manager.host().total_active(&target), 0);

        manager.install(ManagerConfig::debug());
        let decision = manager
            .add_event_listener(&target, "click", &cb, false)
            .unwrap();
        assert!(matches!(decision, Decision::Accepted { .. }));
        assert_eq!(manager.host().active_count(&target, "click"), 1);
    }

    #[test]
    fn test_uninstall_on_native_host_keeps_native_dedup() {
        let mut manager = EventListenerManager::new(MemoryHost::native());
        let target = TestElement::plain();
        let cb = listener!(|_e| {});
        manager
            .add_event_listener(&target, "click", &cb, false)
            .unwrap();
        manager
            .add_event_listener(&target, "click", &cb, false)
            .unwrap();
        assert_eq!(manager.host().active_count(&target, "click"), 1);
    }

    #[test]
    fn test_idempotent_lifecycle() {
        let sink = RecordingSink::new();
        let mut manager = EventListenerManager::with_sink(MemoryHost::new(), Arc::new(sink.clone()));
        manager.uninstall();
        assert_eq!(manager.state(), LifecycleState::Uninitialized);

        manager.install(ManagerConfig::debug());
        manager.install(ManagerConfig::default());
        assert!(manager.is_active());
        assert!(manager.debug_enabled());
        assert_eq!(sink.received(), vec![Diagnostic::Installed]);

        manager.uninstall();
        manager.uninstall();
        assert_eq!(manager.state(), LifecycleState::Uninitialized);
        assert!(sink
            .received()
            .iter()
            .all(|d| d.severity() == Severity::Info));
    }

    #[test]
    fn test_debug_off_emits_nothing() {
        let sink = RecordingSink::new();
        let mut manager = EventListenerManager::with_sink(MemoryHost::new(), Arc::new(sink.clone()));
        manager.install(ManagerConfig::default());
        let target = TestElement::with_class("modal");
        let cb = listener!(|_e| {});
        manager
            .add_event_listener(&target, "click", &cb, false)
            .unwrap();
        assert!(manager
            .add_event_listener(&target, "click", &cb, false)
            .unwrap()
            .is_rejected());
        manager.uninstall();
        assert!(sink.received().is_empty());
    }

    #[test]
    fn test_unsupported_environment() {
        let mut manager = EventListenerManager::new(MemoryHost::unsupported());
        assert!(!manager.is_supported());
        manager.install(ManagerConfig::debug());
        assert!(!manager.is_active());

        let target = TestElement::plain();
        let cb = listener!(|_e| {});
        assert!(matches!(
            manager.add_event_listener(&target, "click", &cb, false).unwrap(),
            Decision::Bypassed
        ));
        assert!(manager.inspect(&target).is_none());
    }

    #[test]
    fn test_release_and_prune() {
        let (mut manager, _) = installed();
        let kept = TestElement::plain();
        let cb = listener!(|_e| {});
        manager
            .add_event_listener(&kept, "click", &cb, false)
            .unwrap();
        {
            let transient = TestElement::plain();
            manager
                .add_event_listener(&transient, "click", &cb, false)
                .unwrap();
        }
        // The host still references the transient target weakly only.
        assert_eq!(manager.tracked_targets(), 1);
        assert_eq!(manager.prune(), 1);

        assert!(manager.release(&kept));
        assert!(manager.inspect(&kept).is_none());
    }

    #[test]
    fn test_weak_capture_lets_target_be_pruned() {
        let (mut manager, _) = installed();
        let target = TestElement::plain();
        let handle = Arc::downgrade(&target);
        let cb = listener!("onClick" => move |_e| {
            if let Some(target) = handle.upgrade() {
                let _ = target.describe();
            }
        });
        manager
            .add_event_listener(&target, "click", &cb, false)
            .unwrap();

        let weak = Arc::downgrade(&target);
        drop(target);
        assert!(weak.upgrade().is_none());
        assert_eq!(manager.tracked_targets(), 0);
        assert_eq!(manager.prune(), 1);
    }

    #[test]
    fn test_inspect_records_original_options() {
        let (mut manager, _) = installed();
        let target = TestElement::plain();
        let cb = listener!("onWheel" => |_e| {});
        let options = ListenerOptions::from(crate::listener::AddEventListenerOptions {
            capture: None,
            once: None,
            passive: Some(true),
        });
        manager
            .add_event_listener(&target, "wheel", &cb, options.clone())
            .unwrap();
        let snapshot = manager.inspect(&target).unwrap();
        let (key, record) = snapshot.first().unwrap();
        assert!(!key.capture);
        assert_eq!(record.options, options);
        assert!(record.listener.same_reference(&cb));
        assert_eq!(record.identity.as_str(), "onWheel");
    }
}
