//! Route handlers.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, Request},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cookies::{session_set_cookie, validate_cookie, SESSION_COOKIE};
use crate::error::ProxyError;
use crate::http::server::AppState;
use crate::mediation::SessionContext;
use crate::session::{Session, SessionId};

/// Optional body of `POST /create-session`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
    #[serde(default, rename = "localStorage")]
    pub local_storage: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
}

/// `POST /create-session`: allocate a session, optionally seeded from the body.
pub async fn create_session(State(state): State<AppState>, body: Bytes) -> Result<Response, ProxyError> {
    let seed = parse_seed(&body)?;
    let id = state.store.create_with(seed);
    tracing::info!(session_id = %id, live_sessions = state.store.len(), "Session created");

    let mut response = Json(CreateSessionResponse { session_id: id.clone() }).into_response();
    if let Some(value) = session_set_cookie(&id) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    Ok(response)
}

fn parse_seed(body: &[u8]) -> Result<Session, ProxyError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Session::default());
    }

    let request: CreateSessionRequest =
        serde_json::from_slice(body).map_err(|e| ProxyError::InvalidSessionRequest(e.to_string()))?;

    for (name, value) in &request.cookies {
        if name == SESSION_COOKIE {
            return Err(ProxyError::InvalidSessionRequest(format!(
                "cookie name {SESSION_COOKIE:?} is reserved"
            )));
        }
        validate_cookie(name, value)?;
    }

    Ok(Session {
        cookies: request.cookies,
        auxiliary: request.local_storage,
    })
}

/// `GET /`: the search page.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(state.index_page.to_string())
}

/// Everything under the mount path: forward upstream with the session's cookies.
pub async fn proxy(State(state): State<AppState>, request: Request<Body>) -> Response {
    let context = request
        .extensions()
        .get::<SessionContext>()
        .cloned()
        .unwrap_or_default();

    match state.mediator.forward(&context, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
