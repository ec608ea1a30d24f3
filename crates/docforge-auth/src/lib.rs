//! Access-token issuing and verification
//!
//! Tokens are HS256 JWTs over a single shared secret. A token proves that
//! the bearer completed a login within its validity window; it is not bound
//! to any particular artifact.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Token absent from every accepted location.
    #[error("No token provided")]
    Missing,

    /// Signature mismatch or malformed token.
    #[error("Invalid token signature")]
    Invalid,

    /// Signature valid but the expiry has elapsed.
    #[error("Token expired")]
    Expired,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Nominal subject identity.
    pub sub: String,
    /// Login name presented at issuance.
    pub email: String,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Issues and verifies access tokens against one shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Default lifetime of issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token with the service's configured lifetime.
    pub fn issue(&self, subject: &str, email: &str) -> Result<String, AuthError> {
        self.issue_with_ttl(subject, email, self.ttl)
    }

    /// Issue a token with an explicit lifetime.
    pub fn issue_with_ttl(
        &self,
        subject: &str,
        email: &str,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|error| AuthError::Encoding(error.to_string()))
    }

    /// Verify a token: signature first, then expiry.
    ///
    /// Leeway is zero so expiry boundaries are exact; the two failure kinds
    /// stay distinguishable for diagnostics even though both answer 401.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|error| match error.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("unit-test-secret", Duration::from_secs(3600))
    }

    #[test]
    fn test_issue_verify_round_trip() {
        let tokens = service();
        let token = tokens.issue("1712345678901", "plugin@example.com").unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "1712345678901");
        assert_eq!(claims.email, "plugin@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_expired_token_is_rejected_as_expired() {
        let tokens = service();
        let token = tokens
            .issue_with_ttl("subject", "user@example.com", Duration::from_secs(1))
            .unwrap();

        std::thread::sleep(Duration::from_secs(2));

        assert_eq!(tokens.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn test_tampered_token_is_invalid_not_expired() {
        let tokens = service();
        let token = tokens.issue("subject", "user@example.com").unwrap();

        // Flip part of the signature segment
        let mut tampered = token.clone();
        let tail = tampered.pop().unwrap();
        tampered.push(if tail == 'A' { 'B' } else { 'A' });

        assert_eq!(tokens.verify(&tampered), Err(AuthError::Invalid));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = service().issue("subject", "user@example.com").unwrap();
        let other = TokenService::new("another-secret", Duration::from_secs(3600));

        assert_eq!(other.verify(&token), Err(AuthError::Invalid));
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert_eq!(service().verify("not-a-token"), Err(AuthError::Invalid));
    }
}
