//! Request mediation between the client and the upstream search target.
//!
//! # Pipeline
//! Stages run in this fixed order; each takes the request plus the session
//! context produced so far and returns the next pair.
//!
//! ```text
//! inbound request
//!     → resolver.rs   (headers, store)        → SessionContext
//!     → rewrite.rs    (path, mount)           → upstream URL, filtered headers
//!     → mediator.rs   (headers, SessionContext) → outbound Cookie header
//!     → upstream call (single attempt, store no longer touched)
//!     → response streamed back, Set-Cookie: sessionId re-asserted by the resolver
//! ```
//!
//! # Design Decisions
//! - Stages are plain functions over values; only the resolver reads the store
//! - Session cookies flow one way: from the store onto outbound requests

pub mod mediator;
pub mod resolver;
pub mod rewrite;

pub use mediator::{inject_cookies, MediatorError, OutboundRequest, ProxyMediator};
pub use resolver::{resolve, session_resolver_middleware, SessionContext};
