//! Stateless session tokens.
//!
//! A token names the user it was issued to and the moment it stops being
//! valid, and carries an HMAC-SHA256 over both. The server keeps no session
//! table: any holder of the key can verify a token on its own.
//!
//! ```text
//! {user_id}.{expires_at_unix}.{base64_signature}
//! signature = HMAC-SHA256("{user_id}.{expires_at_unix}", key)
//! ```

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Errors produced by token parsing and verification.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid token format")]
    InvalidFormat,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("token expired")]
    Expired,
    #[error("token lifetime is out of range")]
    LifetimeOutOfRange,
}

impl From<ring::error::Unspecified> for SessionError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// Claims carried by a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: i64,
    pub expires_at: i64,
}

/// Signing key plus token lifetime.
#[derive(Clone)]
pub struct SessionKey {
    key: ring::hmac::Key,
    ttl: time::Duration,
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionKey {
    pub fn new(secret: &[u8], ttl: time::Duration) -> Self {
        Self {
            key: ring::hmac::Key::new(ring::hmac::HMAC_SHA256, secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> time::Duration {
        self.ttl
    }

    /// Issue a token for `user_id` valid for the configured lifetime.
    pub fn issue(&self, user_id: i64) -> Result<String, SessionError> {
        let expires_at = time::OffsetDateTime::now_utc()
            .checked_add(self.ttl)
            .ok_or(SessionError::LifetimeOutOfRange)?
            .unix_timestamp();
        Ok(self.issue_until(user_id, expires_at))
    }

    /// Issue a token with an explicit expiry (unix seconds).
    pub fn issue_until(&self, user_id: i64, expires_at: i64) -> String {
        let data = format!("{user_id}.{expires_at}");
        let signature = ring::hmac::sign(&self.key, data.as_bytes());
        format!(
            "{data}.{}",
            fast32::base64::RFC4648_NOPAD.encode(signature.as_ref())
        )
    }

    /// Verify signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let (data, signature) = token.rsplit_once('.').ok_or(SessionError::InvalidFormat)?;
        let (user_id, expires_at) = data.split_once('.').ok_or(SessionError::InvalidFormat)?;
        let user_id: i64 = user_id.parse().map_err(|_| SessionError::InvalidFormat)?;
        let expires_at: i64 = expires_at
            .parse()
            .map_err(|_| SessionError::InvalidFormat)?;
        let signature = fast32::base64::RFC4648_NOPAD
            .decode_str(signature)
            .map_err(|_| SessionError::InvalidBase64)?;

        ring::hmac::verify(&self.key, data.as_bytes(), &signature)?;

        if time::OffsetDateTime::now_utc().unix_timestamp() >= expires_at {
            return Err(SessionError::Expired);
        }
        Ok(SessionClaims {
            user_id,
            expires_at,
        })
    }
}
