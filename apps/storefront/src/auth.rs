//! # Authentication
//!
//! Access tokens, password hashing and API key material.
//!
//! ## Credentials at Rest
//! ```text
//! ┌────────────────────┬─────────────────────────────┬──────────────────────┐
//! │ Secret             │ Stored as                   │ Checked by           │
//! ├────────────────────┼─────────────────────────────┼──────────────────────┤
//! │ password           │ argon2 PHC string (users)   │ verify_secret        │
//! │ API key            │ prefix + argon2 (api_keys)  │ split_api_key +      │
//! │                    │                             │ verify_secret        │
//! │ access token       │ not stored (JWT, HS256)     │ JwtManager::validate │
//! └────────────────────┴─────────────────────────────┴──────────────────────┘
//! ```

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use souq_core::{AccountType, UserProfile};

/// Prefix of every storefront API key.
pub const API_KEY_PREFIX: &str = "sk_";

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email or wrong password; deliberately indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("This account has been deactivated")]
    AccountDisabled,

    #[error("Sign in to continue")]
    NotSignedIn,

    #[error("Session expired, please sign in again")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("Demo sign-in is disabled")]
    MockDisabled,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Hashing failed: {0}")]
    Hashing(String),
}

// =============================================================================
// Access Tokens
// =============================================================================

/// JWT claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub email: String,

    pub account_type: AccountType,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// Token id
    pub jti: String,
}

/// Issues and validates access tokens.
#[derive(Clone)]
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    pub fn new(secret: impl Into<String>, lifetime_secs: i64) -> Self {
        JwtManager {
            secret: secret.into(),
            lifetime_secs,
        }
    }

    pub fn lifetime(&self) -> Duration {
        Duration::seconds(self.lifetime_secs)
    }

    /// Issues a token for `user`.
    ///
    /// ## Returns
    /// The encoded token and its expiry.
    pub fn issue(&self, user: &UserProfile) -> Result<(String, DateTime<Utc>), AuthError> {
        let now = Utc::now();
        let expires_at = now + self.lifetime();

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            account_type: user.account_type,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenInvalid(format!("failed to sign: {e}")))?;

        Ok((token, expires_at))
    }

    /// Validates a token and returns its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })?;

        Ok(data.claims)
    }

    /// Expiry encoded in a token's claims.
    pub fn expires_at(claims: &Claims) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(claims.exp, 0).single()
    }
}

// =============================================================================
// Hashing
// =============================================================================

/// Hashes a password or API key for storage.
pub fn hash_secret(secret: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;

    Ok(hash.to_string())
}

/// Checks a secret against a stored hash. Malformed hashes never match.
pub fn verify_secret(secret: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// API Keys
// =============================================================================

/// A freshly generated key. `secret` is shown to the owner exactly once.
#[derive(Debug, Clone)]
pub struct GeneratedApiKey {
    /// Public lookup part, e.g. `sk_1a2b3c4d`.
    pub prefix: String,
    /// Full key, `<prefix>.<random>`.
    pub secret: String,
}

/// Generates a new API key.
pub fn generate_api_key() -> GeneratedApiKey {
    let lookup = Uuid::new_v4().simple().to_string();
    let prefix = format!("{API_KEY_PREFIX}{}", &lookup[..8]);
    let secret = format!("{prefix}.{}", Uuid::new_v4().simple());

    GeneratedApiKey { prefix, secret }
}

/// Extracts the lookup prefix from a presented key.
pub fn split_api_key(key: &str) -> Option<&str> {
    let (prefix, rest) = key.trim().split_once('.')?;
    if !prefix.starts_with(API_KEY_PREFIX) || prefix.len() <= API_KEY_PREFIX.len() || rest.is_empty() {
        return None;
    }
    Some(prefix)
}
