//! JWT Token Handler
//! Mission: Issue and validate HS256 bearer tokens carrying a permission snapshot

use crate::auth::models::{Admin, Claims, IssuedToken};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Token lifetime in seconds.
pub const TOKEN_TTL_SECS: i64 = 3600;

pub const TOKEN_TYPE: &str = "Bearer";

/// Why a token was refused. Callers collapse all of these into one 401.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not verify")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

/// Signs and verifies access tokens with a shared secret.
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHandler {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against our own clock in `validate_token_at`.
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn generate_token(&self, admin: &Admin) -> Result<IssuedToken, TokenError> {
        self.generate_token_at(admin, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (unix seconds).
    pub fn generate_token_at(&self, admin: &Admin, now: i64) -> Result<IssuedToken, TokenError> {
        let claims = Claims {
            admin_id: admin.id,
            email: admin.email.clone(),
            role: admin.role.clone(),
            permissions: admin.permissions.clone(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };

        debug!(
            "Generating JWT for admin {} ({}), {} permissions",
            admin.email,
            admin.id,
            claims.permissions.len()
        );

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)?;

        Ok(IssuedToken {
            access_token,
            token_type: TOKEN_TYPE,
            expires_in: TOKEN_TTL_SECS,
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_token_at(token, Utc::now().timestamp())
    }

    /// Validate as of `now`; the token is good while `exp > now`.
    pub fn validate_token_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let decoded = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            },
        )?;

        if decoded.claims.exp <= now {
            return Err(TokenError::Expired);
        }

        Ok(decoded.claims)
    }
}
