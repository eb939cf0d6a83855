pub mod authenticator;
pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;
use crate::database::DatabaseError;
use crate::types::Role;

pub use authenticator::{Authenticator, Credentials, Registration, StoreAuthenticator};
pub use password::{hash_password, verify_password};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email {0} is already registered")]
    EmailTaken(String),
    #[error("{0}")]
    Validation(String),
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("JWT secret not configured")]
    MissingSecret,
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: impl Into<String>, role: Role, expiry_hours: u64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            email: email.into(),
            role,
            exp: (now + Duration::hours(expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Sign claims with the configured HS256 secret
pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    encode_with(claims, &config::config().security.jwt_secret)
}

/// Verify signature and expiry, returning the claims
pub fn decode_jwt(token: &str) -> Result<Claims, AuthError> {
    decode_with(token, &config::config().security.jwt_secret)
}

fn encode_with(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

fn decode_with(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}
