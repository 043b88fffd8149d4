//! Install/uninstall state machine.

use serde::Serialize;

/// Whether interception is in effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Active,
}

/// Tracks the interception state and whether the environment can support it
/// at all. Support is fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    state: LifecycleState,
    supported: bool,
}

impl Lifecycle {
    pub fn new(supported: bool) -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            supported,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn is_active(&self) -> bool {
        self.state == LifecycleState::Active
    }

    /// Move to `Active`. Returns `false` when already active or unsupported.
    pub fn install(&mut self) -> bool {
        if !self.supported || self.is_active() {
            return false;
        }
        self.state = LifecycleState::Active;
        true
    }

    /// Move to `Uninitialized`. Always succeeds on a supported environment,
    /// even if never installed; returns `false` only when unsupported.
    pub fn uninstall(&mut self) -> bool {
        if !self.supported {
            return false;
        }
        self.state = LifecycleState::Uninitialized;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_is_idempotent() {
        let mut lifecycle = Lifecycle::new(true);
        assert!(lifecycle.install());
        assert!(!lifecycle.install());
        assert_eq!(lifecycle.state(), LifecycleState::Active);
    }

    #[test]
    fn test_uninstall_without_install() {
        let mut lifecycle = Lifecycle::new(true);
        assert!(lifecycle.uninstall());
        assert!(lifecycle.uninstall());
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn test_unsupported_never_activates() {
        let mut lifecycle = Lifecycle::new(false);
        assert!(!lifecycle.install());
        assert!(!lifecycle.is_active());
        assert!(!lifecycle.uninstall());
    }
}
