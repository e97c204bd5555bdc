use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::Role;

/// Issuer stamped on and required of every session token.
pub const TOKEN_ISSUER: &str = "equipchain";

/// Session lifetime. There is no refresh or revocation.
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Session token service (HS256, fixed issuer).
///
/// Keys are derived once from the configured secret; the secret itself is
/// not retained.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

/// Identity claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    /// Role ordinal, lower is more privileged
    pub role_id: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub iss: String,
}

impl SessionClaims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    pub fn role(&self) -> Role {
        self.role_id
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Unsupported token algorithm")]
    UnsupportedAlgorithm,

    #[error("Malformed token")]
    Malformed,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::UnsupportedAlgorithm
            }
            _ => TokenError::Malformed,
        }
    }
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret_bytes();

        tracing::info!(issuer = TOKEN_ISSUER, "JWT service initialized with HS256");

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    pub fn issuer(&self) -> &str {
        TOKEN_ISSUER
    }

    /// Issue a session token valid for [`TOKEN_LIFETIME_HOURS`].
    pub fn issue(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        email: &str,
        role: Role,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::hours(TOKEN_LIFETIME_HOURS);

        let claims = SessionClaims {
            sub: user_id,
            organization_id,
            email: email.to_string(),
            role_id: role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))
    }

    /// Verify signature, algorithm, issuer and expiry, then return the claims.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}
