//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! POST /create-session
//!     → id.rs (counter + random token)
//!     → store.rs (insert, evicting per eviction.rs when at capacity)
//!
//! Every other request:
//!     → mediation resolver → store.rs checkout (read + idle clock refresh)
//!
//! Background:
//!     sweeper.rs → store.rs sweep (drop idle-expired sessions)
//! ```
//!
//! # Design Decisions
//! - State is in memory only; a restart forgets every session
//! - The store is injected as `Arc<SessionStore>`, never a global
//! - Upstream `Set-Cookie` headers are never captured back into sessions

pub mod eviction;
pub mod id;
pub mod store;
pub mod sweeper;

pub use eviction::{EvictionPolicy, EvictionReason};
pub use id::SessionId;
pub use store::{Session, SessionStore};
pub use sweeper::SessionSweeper;
