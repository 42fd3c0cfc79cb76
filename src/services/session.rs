//! Single-password session gate.
//!
//! Tokens are stateless: `<nonce>.<expires>.<signature>` where the signature
//! is HMAC-SHA256 over `<nonce>.<expires>` keyed by the admin password.
//! Changing the password invalidates every outstanding session.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use thiserror::Error;

use crate::config::Secret;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "imghost_session";
pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Unauthorized")]
    MissingSession,
    #[error("Invalid session")]
    InvalidToken,
    #[error("Session expired")]
    Expired,
}

#[derive(Debug, Clone)]
pub struct SessionGate {
    secret: Secret,
    ttl: Duration,
    secure_cookies: bool,
}

impl SessionGate {
    pub fn new(secret: Secret, secure_cookies: bool) -> Self {
        Self {
            secret,
            ttl: Duration::hours(SESSION_TTL_HOURS),
            secure_cookies,
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.secret.expose().as_bytes())
            .expect("HMAC accepts keys of any length")
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Compare `password` with the configured secret in constant time and
    /// issue a fresh token on success.
    pub fn login(&self, password: &str) -> Result<String, SessionError> {
        let expected = self
            .mac()
            .chain_update(self.secret.expose().as_bytes())
            .finalize()
            .into_bytes();
        self.mac()
            .chain_update(password.as_bytes())
            .verify_slice(&expected)
            .map_err(|_| SessionError::InvalidPassword)?;

        Ok(self.issue_token_at(Utc::now().timestamp()))
    }

    pub fn issue_token_at(&self, now: i64) -> String {
        let nonce: [u8; 32] = rand::rng().random();
        let payload = format!("{}.{}", hex::encode(nonce), now + self.ttl.num_seconds());
        let signature = self.sign(&payload);
        format!("{}.{}", payload, signature)
    }

    /// Validate a cookie value as of `now` (unix seconds).
    pub fn verify_at(&self, token: Option<&str>, now: i64) -> Result<(), SessionError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::MissingSession)?;

        let (payload, signature) = token.rsplit_once('.').ok_or(SessionError::InvalidToken)?;
        let (nonce, expires) = payload.split_once('.').ok_or(SessionError::InvalidToken)?;
        if nonce.len() != 64 {
            return Err(SessionError::InvalidToken);
        }
        let expires: i64 = expires.parse().map_err(|_| SessionError::InvalidToken)?;
        let signature = hex::decode(signature).map_err(|_| SessionError::InvalidToken)?;

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::InvalidToken)?;

        if expires <= now {
            return Err(SessionError::Expired);
        }
        Ok(())
    }

    pub fn verify(&self, token: Option<&str>) -> Result<(), SessionError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Session cookie carrying `token`.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure_cookies)
            .path("/")
            .max_age(time::Duration::seconds(self.ttl.num_seconds()))
            .build()
    }

    /// Cookie that removes the session on the client.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure_cookies)
            .path("/")
            .max_age(time::Duration::ZERO)
            .build()
    }
}
