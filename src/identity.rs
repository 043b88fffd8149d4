//! Identity tokens: how "the same callback" is recognized across calls.
//!
//! Named callables are identified by their name. Anonymous callables are
//! identified by a truncated, whitespace-collapsed rendering of their source
//! text, so two distinct closures whose leading source text is identical share
//! a token. That collision is accepted; the registration policy resolves it by
//! replacing the older registration.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::listener::Listener;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Default number of source characters kept for anonymous callables.
pub const DEFAULT_IDENTITY_MAX_LEN: usize = 100;

/// Token for callback objects and other non-callable listeners.
pub const NON_FUNCTION: &str = "non-function";

/// Token for callables with neither a name nor source text.
pub const ANONYMOUS: &str = "anonymous";

/// Deterministic comparison key derived from a callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityToken(String);

impl IdentityToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the sentinel for non-callable listeners.
    pub fn is_non_function(&self) -> bool {
        self.0 == NON_FUNCTION
    }
}

impl fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the identity token of `listener`, keeping at most `max_len`
/// characters of source text for anonymous callables.
pub fn identify(listener: &Listener, max_len: usize) -> IdentityToken {
    let Listener::Function(callback) = listener else {
        return IdentityToken::new(NON_FUNCTION);
    };
    if let Some(name) = callback.name() {
        return IdentityToken::new(name);
    }
    match callback.source() {
        Some(source) => IdentityToken::new(normalize_source(source, max_len)),
        None => IdentityToken::new(ANONYMOUS),
    }
}

/// Truncate to `max_len` characters, then collapse whitespace runs.
fn normalize_source(source: &str, max_len: usize) -> String {
    let truncated: String = source.chars().take(max_len).collect();
    WHITESPACE_RUN.replace_all(&truncated, " ").into_owned()
}
