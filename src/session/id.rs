//! Session identifiers.
//!
//! An identifier is a process-wide counter value joined with 64 random bits.
//! The counter makes identifiers unique for the lifetime of the process
//! regardless of clock resolution; the random half keeps them unguessable.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global atomic counter for session IDs.
/// Relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque session token carried in the `sessionId` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new identifier, distinct from every other one generated by this process.
    pub fn generate() -> Self {
        let sequence = SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let entropy: u64 = rand::thread_rng().gen();
        Self(format!("{sequence:016x}{entropy:016x}"))
    }

    /// The token as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
