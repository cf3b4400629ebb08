//! Concurrent in-memory session store.
//!
//! # Responsibilities
//! - Allocate sessions under fresh identifiers
//! - Look sessions up for the resolver
//! - Apply the configured eviction policy
//!
//! # Design Decisions
//! - Sharded map (DashMap): inserts lock one shard, readers clone a snapshot
//! - Entries are fully built before insertion, so readers never see a partial session
//! - No method performs I/O; callers never hold a lock across an await
//! - With a capacity bound, recency lives in an LRU list behind one mutex;
//!   eviction and insertion happen under that lock, so the bound is never exceeded
//! - Lock order is recency list, then map shard

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lru::LruCache;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::observability::metrics;
use crate::session::eviction::{EvictionPolicy, EvictionReason};
use crate::session::id::SessionId;

/// Server-held state for one client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Cookies injected into upstream requests. Last write wins per name.
    pub cookies: BTreeMap<String, String>,
    /// Client-side state mirror. Not consulted by the proxy path.
    pub auxiliary: BTreeMap<String, String>,
}

#[derive(Debug)]
struct SessionEntry {
    session: Session,
    created_at: Instant,
    last_accessed: Instant,
}

impl SessionEntry {
    fn new(session: Session) -> Self {
        let now = Instant::now();
        Self {
            session,
            created_at: now,
            last_accessed: now,
        }
    }
}

/// Process-wide session map, shared between handlers through an `Arc`.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, SessionEntry>,
    /// Least-recently-used order; present only when capacity is bounded.
    recency: Option<Mutex<LruCache<SessionId, ()>>>,
    policy: EvictionPolicy,
}

impl SessionStore {
    /// Create an empty store governed by `policy`.
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            sessions: DashMap::new(),
            recency: policy.max_sessions.map(|_| Mutex::new(LruCache::unbounded())),
            policy,
        }
    }

    /// The retention policy in force.
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Allocate an empty session and return its identifier.
    pub fn create(&self) -> SessionId {
        self.create_with(Session::default())
    }

    /// Allocate a session seeded with `session` and return its identifier.
    ///
    /// At capacity, the least recently used sessions are evicted first.
    pub fn create_with(&self, session: Session) -> SessionId {
        let id = match self.lock_recency() {
            Some(mut recency) => {
                if let Some(max) = self.policy.max_sessions {
                    let mut evicted = 0;
                    while recency.len() >= max {
                        let Some((victim, ())) = recency.pop_lru() else {
                            break;
                        };
                        if self.sessions.remove(&victim).is_some() {
                            tracing::debug!(session_id = %victim, "Session evicted to make room");
                            evicted += 1;
                        }
                    }
                    if evicted > 0 {
                        self.record_eviction(EvictionReason::Capacity, evicted);
                    }
                }
                let id = self.insert(session);
                recency.put(id.clone(), ());
                id
            }
            None => self.insert(session),
        };

        metrics::record_session_created();
        metrics::record_session_count(self.sessions.len());
        tracing::debug!(session_id = %id, "Session created");
        id
    }

    fn insert(&self, session: Session) -> SessionId {
        let mut pending = Some(session);
        loop {
            let id = SessionId::generate();
            if let Entry::Vacant(slot) = self.sessions.entry(id.clone()) {
                slot.insert(SessionEntry::new(pending.take().unwrap_or_default()));
                return id;
            }
        }
    }

    /// Snapshot of a live session. Has no side effects.
    pub fn get(&self, id: &SessionId) -> Option<Session> {
        let entry = self.sessions.get(id)?;
        if self.policy.is_expired(entry.last_accessed, Instant::now()) {
            return None;
        }
        Some(entry.session.clone())
    }

    /// Lookup on behalf of a request: refreshes the idle clock, drops expired entries.
    pub fn checkout(&self, id: &SessionId) -> Option<Session> {
        let now = Instant::now();
        {
            let mut entry = self.sessions.get_mut(id)?;
            if !self.policy.is_expired(entry.last_accessed, now) {
                entry.last_accessed = now;
                let session = entry.session.clone();
                drop(entry);
                self.touch(id);
                return Some(session);
            }
        }

        let removed = self
            .sessions
            .remove_if(id, |_, entry| self.policy.is_expired(entry.last_accessed, now));
        if let Some((id, entry)) = removed {
            self.forget(&id);
            tracing::debug!(
                session_id = %id,
                age_secs = entry.created_at.elapsed().as_secs(),
                "Session expired"
            );
            self.record_eviction(EvictionReason::Expired, 1);
        }
        None
    }

    /// Store one cookie. Returns false when the session does not exist.
    pub fn set_cookie(&self, id: &SessionId, name: impl Into<String>, value: impl Into<String>) -> bool {
        self.merge_cookies(id, [(name.into(), value.into())])
    }

    /// Store several cookies, replacing existing values of the same name.
    pub fn merge_cookies<I>(&self, id: &SessionId, cookies: I) -> bool
    where
        I: IntoIterator<Item = (String, String)>,
    {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                entry.session.cookies.extend(cookies);
                entry.last_accessed = Instant::now();
            }
            None => return false,
        }
        self.touch(id);
        true
    }

    /// Store one auxiliary entry. Returns false when the session does not exist.
    pub fn set_auxiliary(&self, id: &SessionId, key: impl Into<String>, value: impl Into<String>) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                entry.session.auxiliary.insert(key.into(), value.into());
                entry.last_accessed = Instant::now();
            }
            None => return false,
        }
        self.touch(id);
        true
    }

    /// Remove every idle-expired session. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        if self.policy.idle_ttl.is_none() {
            return 0;
        }

        let now = Instant::now();
        let mut expired = Vec::new();
        self.sessions.retain(|id, entry| {
            let keep = !self.policy.is_expired(entry.last_accessed, now);
            if !keep {
                expired.push(id.clone());
            }
            keep
        });

        let removed = expired.len();
        if let Some(mut recency) = self.lock_recency() {
            for id in &expired {
                recency.pop(id);
            }
        }
        if removed > 0 {
            self.record_eviction(EvictionReason::Expired, removed);
        }
        removed
    }

    /// Number of sessions currently held, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn lock_recency(&self) -> Option<MutexGuard<'_, LruCache<SessionId, ()>>> {
        self.recency
            .as_ref()
            .map(|recency| recency.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Mark `id` most recently used.
    fn touch(&self, id: &SessionId) {
        if let Some(mut recency) = self.lock_recency() {
            recency.promote(id);
        }
    }

    fn forget(&self, id: &SessionId) {
        if let Some(mut recency) = self.lock_recency() {
            recency.pop(id);
        }
    }

    fn record_eviction(&self, reason: EvictionReason, count: usize) {
        metrics::record_sessions_evicted(reason.as_str(), count);
        metrics::record_session_count(self.sessions.len());
    }
}
