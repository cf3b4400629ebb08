//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, CORS, limits)
//!     → POST /create-session → handlers.rs (allocate session)
//!     → GET / and /search/*  → session resolver middleware
//!         → handlers.rs index (static page)
//!         → handlers.rs proxy → mediation::ProxyMediator → upstream
//!     → Send to client
//! ```

pub mod handlers;
pub mod page;
pub mod server;

pub use server::{AppState, HttpServer, ServerError};

/// Route that allocates a new session.
pub const CREATE_SESSION_PATH: &str = "/create-session";
