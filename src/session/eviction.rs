//! Retention policy for the session store.
//!
//! # Responsibilities
//! - Bound the number of live sessions (least-recently-used eviction)
//! - Expire sessions that have been idle longer than a TTL
//!
//! # Design Decisions
//! - Both bounds are optional; with neither set, sessions live until exit
//! - Idle time is measured from the last resolver checkout, not creation

use std::time::{Duration, Instant};

use crate::config::SessionConfig;

/// Why a session left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// Removed to make room for a new session.
    Capacity,
    /// Idle for longer than the configured TTL.
    Expired,
}

impl EvictionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionReason::Capacity => "capacity",
            EvictionReason::Expired => "expired",
        }
    }
}

/// Bounds applied to the session map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvictionPolicy {
    /// Maximum number of live sessions.
    pub max_sessions: Option<usize>,
    /// Maximum idle time before a session expires.
    pub idle_ttl: Option<Duration>,
}

impl EvictionPolicy {
    /// Keep every session until the process exits.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Evict the least-recently-used session once `max_sessions` are live.
    pub fn with_capacity(mut self, max_sessions: usize) -> Self {
        self.max_sessions = Some(max_sessions.max(1));
        self
    }

    /// Expire sessions idle for longer than `ttl`.
    pub fn with_idle_ttl(mut self, ttl: Duration) -> Self {
        self.idle_ttl = Some(ttl);
        self
    }

    /// True when a session last used at `last_accessed` has expired at `now`.
    pub fn is_expired(&self, last_accessed: Instant, now: Instant) -> bool {
        self.idle_ttl
            .is_some_and(|ttl| now.saturating_duration_since(last_accessed) > ttl)
    }

    /// True when inserting one more session requires evicting another.
    pub fn at_capacity(&self, live: usize) -> bool {
        self.max_sessions.is_some_and(|max| live >= max)
    }
}

impl From<&SessionConfig> for EvictionPolicy {
    fn from(config: &SessionConfig) -> Self {
        Self {
            max_sessions: config.capacity(),
            idle_ttl: config.idle_ttl(),
        }
    }
}
