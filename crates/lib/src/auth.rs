//! HTTP Basic authentication against the single configured identity.

use axum::http::{header, HeaderMap};
use base64::Engine;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Realm sent in the `WWW-Authenticate` challenge.
pub const REALM: &str = "Authentication Required";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,
    #[error("authorization header is not Basic")]
    WrongScheme,
    #[error("malformed basic credentials")]
    Malformed,
    #[error("invalid credentials")]
    InvalidCredentials,
}

/// The one (username, password) pair accepted by the gateway. Cheap to clone; never mutated.
#[derive(Clone)]
pub struct Credentials {
    inner: Arc<(String, String)>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.inner.0)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            inner: Arc::new((username.into(), password.into())),
        }
    }

    pub fn username(&self) -> &str {
        &self.inner.0
    }

    /// True iff both fields match exactly. Compared in constant time.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let user_ok = username.as_bytes().ct_eq(self.inner.0.as_bytes());
        let pass_ok = password.as_bytes().ct_eq(self.inner.1.as_bytes());
        bool::from(user_ok & pass_ok)
    }

    /// Check the request's Authorization header. Logs every attempt; the attempted password is never logged.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        let result = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingHeader)
            .and_then(|v| v.to_str().map_err(|_| AuthError::Malformed))
            .and_then(parse_basic)
            .and_then(|(user, pass)| {
                if self.verify(&user, &pass) {
                    Ok(user)
                } else {
                    Err(AuthError::InvalidCredentials)
                }
            });
        match &result {
            Ok(user) => log::info!("authorized as {}", user),
            Err(e) => log::error!("unauthorized request declined: {}", e),
        }
        result
    }
}

/// Decode `Basic <base64(user:pass)>` into its two parts. The password may itself contain ':'.
pub fn parse_basic(value: &str) -> Result<(String, String), AuthError> {
    let (scheme, encoded) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::WrongScheme)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::WrongScheme);
    }
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim().as_bytes())
        .map_err(|_| AuthError::Malformed)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::Malformed)?;
    let (user, pass) = decoded.split_once(':').ok_or(AuthError::Malformed)?;
    Ok((user.to_string(), pass.to_string()))
}
