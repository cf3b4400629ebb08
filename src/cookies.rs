//! Cookie header handling.
//!
//! # Responsibilities
//! - Parse the client's `Cookie` header(s) into an ordered name/value set
//! - Overlay stored session cookies onto the client's set
//! - Serialize the set back into a single outbound `Cookie` header
//! - Build the `Set-Cookie` header that hands the session token to the client
//!
//! # Design Decisions
//! - Client parsing is lenient (malformed pairs are skipped, not rejected)
//! - Stored cookies are validated strictly when they enter a session
//! - No expiry, domain, or path scoping: a cookie is a name and a value

use axum::http::{header, HeaderMap, HeaderValue};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::session::SessionId;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "sessionId";

/// A cookie name or value that cannot be sent in a `Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CookieError {
    #[error("invalid cookie name {0:?}")]
    InvalidName(String),

    #[error("invalid value for cookie {0:?}")]
    InvalidValue(String),
}

/// One `name=value` pair as received, kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CookiePair {
    name: Vec<u8>,
    value: Vec<u8>,
}

/// Ordered cookie pairs. Inserting an existing name replaces its value in place.
///
/// Client bytes are never re-encoded, so values outside UTF-8 reach the
/// upstream exactly as the client sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieSet {
    pairs: Vec<CookiePair>,
}

impl CookieSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every `Cookie` header on a request.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut set = Self::new();
        for value in headers.get_all(header::COOKIE) {
            set.extend_from_header(value.as_bytes());
        }
        set
    }

    /// Parse a single `Cookie` header value.
    pub fn parse(header: &str) -> Self {
        let mut set = Self::new();
        set.extend_from_header(header.as_bytes());
        set
    }

    fn extend_from_header(&mut self, header: &[u8]) {
        for pair in header.split(|&b| b == b';') {
            let Some(eq) = pair.iter().position(|&b| b == b'=') else {
                continue;
            };
            let name = pair[..eq].trim_ascii();
            if name.is_empty() {
                continue;
            }
            self.insert_bytes(name.to_vec(), pair[eq + 1..].trim_ascii().to_vec());
        }
    }

    fn position(&self, name: &[u8]) -> Option<usize> {
        self.pairs.iter().position(|p| p.name == name)
    }

    /// Value of `name`, if present and valid UTF-8.
    pub fn get(&self, name: &str) -> Option<&str> {
        let index = self.position(name.as_bytes())?;
        std::str::from_utf8(&self.pairs[index].value).ok()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.insert_bytes(name.into().into_bytes(), value.into().into_bytes());
    }

    fn insert_bytes(&mut self, name: Vec<u8>, value: Vec<u8>) {
        match self.position(&name) {
            Some(index) => self.pairs[index].value = value,
            None => self.pairs.push(CookiePair { name, value }),
        }
    }

    /// Remove `name`, returning its value when it was valid UTF-8.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.position(name.as_bytes())?;
        String::from_utf8(self.pairs.remove(index).value).ok()
    }

    /// Apply `stored` on top of this set; stored values win on name clashes.
    pub fn overlay(mut self, stored: &BTreeMap<String, String>) -> Self {
        for (name, value) in stored {
            self.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Render as a `Cookie` header value. `None` when empty or unrepresentable.
    pub fn to_header_value(&self) -> Option<HeaderValue> {
        if self.is_empty() {
            return None;
        }
        let mut bytes = Vec::new();
        for (i, pair) in self.pairs.iter().enumerate() {
            if i > 0 {
                bytes.extend_from_slice(b"; ");
            }
            bytes.extend_from_slice(&pair.name);
            bytes.push(b'=');
            bytes.extend_from_slice(&pair.value);
        }
        HeaderValue::from_bytes(&bytes).ok()
    }
}

/// Lossy rendering, for logs and tests.
impl std::fmt::Display for CookieSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, pair) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(
                f,
                "{}={}",
                String::from_utf8_lossy(&pair.name),
                String::from_utf8_lossy(&pair.value)
            )?;
        }
        Ok(())
    }
}

/// `Set-Cookie` value handing `id` to the client for every path.
pub fn session_set_cookie(id: &SessionId) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("{SESSION_COOKIE}={id}; Path=/")).ok()
}

/// Check that a cookie can be stored in a session and later sent upstream.
pub fn validate_cookie(name: &str, value: &str) -> Result<(), CookieError> {
    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return Err(CookieError::InvalidName(name.to_string()));
    }
    if !value.bytes().all(is_cookie_octet) {
        return Err(CookieError::InvalidValue(name.to_string()));
    }
    Ok(())
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
}

fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}
