use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::{hash_password, verify_password, AuthError};
use crate::database::models::{NewUser, User};
use crate::database::{DatabaseError, Store};
use crate::types::Role;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Turns credentials into a known user.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn identify(&self, credentials: &Credentials) -> Result<User, AuthError>;
}

/// Password authentication against the user table of a `Store`
pub struct StoreAuthenticator {
    store: Arc<dyn Store>,
}

impl StoreAuthenticator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates an account with the given role. Public registration always
    /// passes `Role::Student`.
    pub async fn register(&self, registration: Registration, role: Role) -> Result<User, AuthError> {
        let email = registration.email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::Validation("A valid email is required".to_string()));
        }
        if registration.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if registration.first_name.trim().is_empty() || registration.last_name.trim().is_empty() {
            return Err(AuthError::Validation("First and last name are required".to_string()));
        }

        let user = NewUser {
            email: email.clone(),
            first_name: registration.first_name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            password_hash: hash_password(&registration.password)?,
            role,
        }
        .into_user();

        match self.store.create_user(&user).await {
            Ok(()) => {
                info!("Registered {} account {}", role, user.email);
                Ok(user)
            }
            Err(DatabaseError::Duplicate(_)) => Err(AuthError::EmailTaken(email)),
            Err(e) => Err(e.into()),
        }
    }

    /// Makes sure an admin with this email exists. An existing account is
    /// left untouched.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if let Some(existing) = self.store.find_user_by_email(email).await? {
            if existing.role != Role::Admin {
                warn!("Bootstrap account {} exists with role {}", existing.email, existing.role);
            }
            return Ok(existing);
        }
        let registration = Registration {
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Admin".to_string(),
            last_name: "SIGA".to_string(),
        };
        self.register(registration, Role::Admin).await
    }
}

#[async_trait]
impl Authenticator for StoreAuthenticator {
    async fn identify(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let user = self
            .store
            .find_user_by_email(&credentials.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&credentials.password, &user.password_hash)? {
            warn!("Failed login for {}", user.email);
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }
}
