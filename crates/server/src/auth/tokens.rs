//! Signed, time-limited, single-purpose tokens.
//!
//! Three purposes share one claims layout: `access` (session bearer),
//! `confirm` (email confirmation), `reset` (password reset). A token is
//! only accepted for the purpose it was issued for; signature, purpose, and
//! expiry failures are indistinguishable to callers (`verify` just returns
//! `None`).

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// What a token is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Access,
    Confirm,
    Reset,
}

impl TokenPurpose {
    fn as_str(self) -> &'static str {
        match self {
            TokenPurpose::Access => "access",
            TokenPurpose::Confirm => "confirm",
            TokenPurpose::Reset => "reset",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    purpose: String,
    iat: i64,
    exp: i64,
}

/// Manages token creation and validation.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    confirm_ttl_secs: i64,
    reset_ttl_secs: i64,
}

impl TokenService {
    /// Create a `TokenService` with the default lifetimes: 24h sessions,
    /// 1h confirmation links, 2h reset links.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_ttls(secret, 24 * 3600, 3600, 7200)
    }

    /// Create a `TokenService` with explicit lifetimes (tests use this to
    /// mint already-expired tokens).
    pub fn with_ttls(
        secret: &[u8],
        access_ttl_secs: i64,
        confirm_ttl_secs: i64,
        reset_ttl_secs: i64,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl_secs,
            confirm_ttl_secs,
            reset_ttl_secs,
        }
    }

    /// Issue a token of the given purpose for `user_id`.
    pub fn issue(
        &self,
        purpose: TokenPurpose,
        user_id: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = now_secs();
        let ttl = match purpose {
            TokenPurpose::Access => self.access_ttl_secs,
            TokenPurpose::Confirm => self.confirm_ttl_secs,
            TokenPurpose::Reset => self.reset_ttl_secs,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            purpose: purpose.as_str().to_string(),
            iat: now,
            exp: now + ttl,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Validate a token for the expected purpose and return the user id it
    /// was issued for. Any failure (bad signature, wrong purpose, expiry)
    /// yields `None`.
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> Option<i64> {
        let mut validation = Validation::default();
        // No leeway: an expired link is expired.
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation).ok()?;
        if data.claims.purpose != purpose.as_str() {
            return None;
        }
        data.claims.sub.parse().ok()
    }
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
