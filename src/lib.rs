//! Search session proxy library.
//!
//! A local HTTP forward proxy that keeps a server-side cookie jar per client
//! session and replays it onto requests forwarded to an upstream search engine.

pub mod config;
pub mod cookies;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod mediation;
pub mod observability;
pub mod session;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use session::{SessionId, SessionStore};
