//! Bearer-token authentication boundary.
//!
//! Token mint/verify is HS256 JWT; credential checking goes through the
//! [`UserStore`] capability so the account backend can be swapped without
//! touching firewall logic.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::config::{AuthConfig, UserEntry};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated username
    pub sub: String,

    /// Expiry, seconds since the epoch
    pub exp: u64,
}

/// Issued bearer credential, as returned by the login route.
#[derive(Debug, Serialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Credential verification capability: `verify` yields the principal name
/// for a valid username/password pair, or nothing.
pub trait UserStore: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> Option<String>;
}

/// User store backed by the `[auth.users]` config entries, with SHA-256
/// password hashes.
pub struct ConfigUserStore {
    users: Vec<UserEntry>,
}

impl ConfigUserStore {
    pub fn new(users: Vec<UserEntry>) -> Self {
        Self { users }
    }
}

impl UserStore for ConfigUserStore {
    fn verify(&self, username: &str, password: &str) -> Option<String> {
        let hashed = sha256_hex(password);
        self.users
            .iter()
            .find(|u| u.username == username && u.password_sha256 == hashed)
            .map(|u| u.username.clone())
    }
}

/// Hex-encoded SHA-256, as stored in the config file.
pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Token signing/validation state shared with the REST layer.
#[derive(Clone)]
pub struct TokenAuthority {
    secret: String,
    ttl_secs: u64,
}

impl TokenAuthority {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.secret_key.clone(),
            ttl_secs: config.token_ttl_minutes * 60,
        }
    }

    /// Mint a signed bearer token for an authenticated principal.
    pub fn issue(&self, username: &str) -> Result<Token, AuthError> {
        let claims = Claims {
            sub: username.to_string(),
            exp: jsonwebtoken::get_current_timestamp() + self.ttl_secs,
        };
        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Encoding(e.to_string()))?;

        Ok(Token {
            access_token,
            token_type: "bearer",
        })
    }

    /// Validate a presented token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AuthError::InvalidToken)
    }
}
