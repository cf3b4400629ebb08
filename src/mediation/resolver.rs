//! Session resolution stage.
//!
//! # Responsibilities
//! - Read the `sessionId` cookie from the inbound request
//! - Look the session up and build the merged cookie view
//! - Re-assert the session cookie on the response
//!
//! # Design Decisions
//! - Unknown or missing identifiers resolve to `Anonymous`, never an error
//! - Resolution never creates a session and never writes stored cookies
//! - The store is read once, before any upstream I/O starts

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::cookies::{session_set_cookie, CookieSet, SESSION_COOKIE};
use crate::session::{SessionId, SessionStore};

/// Effective session state for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionContext {
    /// No resolvable session: cookies pass through untouched.
    #[default]
    Anonymous,
    /// A live session and the cookie view to send upstream.
    Resolved { id: SessionId, cookies: CookieSet },
}

impl SessionContext {
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            SessionContext::Anonymous => None,
            SessionContext::Resolved { id, .. } => Some(id),
        }
    }

    /// Merged cookies for a resolved session.
    pub fn cookies(&self) -> Option<&CookieSet> {
        match self {
            SessionContext::Anonymous => None,
            SessionContext::Resolved { cookies, .. } => Some(cookies),
        }
    }
}

/// Resolve the session named by the request's `sessionId` cookie.
///
/// The merged view is the client's cookies without the session cookie itself,
/// overlaid with the stored cookies. Stored values win on name clashes.
pub fn resolve(store: &SessionStore, headers: &HeaderMap) -> SessionContext {
    let mut client = CookieSet::from_headers(headers);
    let Some(raw) = client.remove(SESSION_COOKIE) else {
        return SessionContext::Anonymous;
    };

    let id = SessionId::from(raw);
    match store.checkout(&id) {
        Some(session) => SessionContext::Resolved {
            cookies: client.overlay(&session.cookies),
            id,
        },
        None => {
            tracing::debug!(session_id = %id, "Unknown session, treating request as anonymous");
            SessionContext::Anonymous
        }
    }
}

/// Middleware running [`resolve`] and attaching the result to request extensions.
pub async fn session_resolver_middleware(
    State(store): State<Arc<SessionStore>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let context = resolve(&store, request.headers());
    let reassert = context.session_id().and_then(session_set_cookie);

    if let Some(id) = context.session_id() {
        tracing::debug!(session_id = %id, path = %request.uri().path(), "Session resolved");
    }
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    if let Some(value) = reassert {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}
