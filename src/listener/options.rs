//! The options argument of a register/unregister call.

use serde::{Deserialize, Serialize};

/// Structured registration options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddEventListenerOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub once: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passive: Option<bool>,
}

impl AddEventListenerOptions {
    pub fn capture(capture: bool) -> Self {
        Self {
            capture: Some(capture),
            ..Self::default()
        }
    }
}

/// Options as supplied by the caller.
///
/// Kept verbatim in the registration record so that later removals hand the
/// host exactly what it was given at registration time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListenerOptions {
    /// No options argument.
    #[default]
    Absent,
    /// Legacy boolean `useCapture` argument.
    Capture(bool),
    /// Structured options.
    Options(AddEventListenerOptions),
}

impl ListenerOptions {
    /// Normalized capture flag; structured options default to `false`.
    pub fn capture(&self) -> bool {
        match self {
            Self::Absent => false,
            Self::Capture(capture) => *capture,
            Self::Options(opts) => opts.capture.unwrap_or(false),
        }
    }
}

impl From<bool> for ListenerOptions {
    fn from(capture: bool) -> Self {
        Self::Capture(capture)
    }
}

impl From<AddEventListenerOptions> for ListenerOptions {
    fn from(opts: AddEventListenerOptions) -> Self {
        Self::Options(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_normalization() {
        assert!(!ListenerOptions::Absent.capture());
        assert!(ListenerOptions::from(true).capture());
        assert!(!ListenerOptions::from(false).capture());
        assert!(ListenerOptions::from(AddEventListenerOptions::capture(true)).capture());
        assert!(!ListenerOptions::from(AddEventListenerOptions::default()).capture());
    }

    #[test]
    fn test_deserialize_shapes() {
        let absent: ListenerOptions = serde_json::from_str("null").unwrap();
        assert_eq!(absent, ListenerOptions::Absent);

        let legacy: ListenerOptions = serde_json::from_str("true").unwrap();
        assert_eq!(legacy, ListenerOptions::Capture(true));

        let structured: ListenerOptions =
            serde_json::from_str(r#"{"capture": true, "passive": true}"#).unwrap();
        assert!(structured.capture());
        assert!(matches!(
            structured,
            ListenerOptions::Options(AddEventListenerOptions { passive: Some(true), .. })
        ));
    }
}
