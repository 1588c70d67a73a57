//! Registration and login.
//!
//! Registration is a straight line: structural checks, format checks,
//! uniqueness, hashing, role resolution, then a single insert. Nothing is
//! written until every earlier step has passed. Login never reveals whether
//! the identifier or the password was wrong.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use crate::auth::jwt::TokenIssuer;
use crate::auth::{password, validator};
use crate::config::AdminSeed;
use crate::db::{RoleStore, StoreError, UserStore};
use crate::models::{NewUser, User, ADMIN_ROLE_ID, CUSTOMER_ROLE_ID};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Invalid phone number format")]
    InvalidPhone,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Role {0} does not exist")]
    UnknownRole(String),

    #[error("Only an admin can assign role {0}")]
    RoleNotPermitted(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub role_id: Option<String>,
    /// Set when an authenticated admin creates the account. Without it only
    /// the customer role can be requested.
    pub by_admin: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, roles: Arc<dyn RoleStore>, tokens: TokenIssuer) -> Self {
        Self {
            users,
            roles,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    #[instrument(skip(self, req), fields(username = %req.username))]
    pub async fn register(&self, req: Registration) -> Result<User, AuthError> {
        if req.username.is_empty()
            || req.email.is_empty()
            || req.password.is_empty()
            || req.phone.is_empty()
        {
            return Err(AuthError::Validation(
                "Username, email, password and phone are required".to_string(),
            ));
        }

        if !validator::is_email_valid(&req.email) {
            return Err(AuthError::InvalidEmail);
        }

        let phone = validator::normalize_phone(&req.phone).ok_or(AuthError::InvalidPhone)?;

        let role_id = req
            .role_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| CUSTOMER_ROLE_ID.to_string());
        if role_id != CUSTOMER_ROLE_ID && !req.by_admin {
            return Err(AuthError::RoleNotPermitted(role_id));
        }

        if self.users.exists_by_email(&req.email).await? {
            return Err(AuthError::DuplicateEmail);
        }
        if self.users.exists_by_username(&req.username).await? {
            return Err(AuthError::DuplicateUsername);
        }

        let password_hash = password::hash(&req.password).map_err(AuthError::Internal)?;

        let role = self
            .roles
            .find_by_id(&role_id)
            .await?
            .ok_or(AuthError::UnknownRole(role_id))?;

        let user = self
            .users
            .insert(NewUser {
                username: req.username,
                email: req.email,
                password_hash,
                phone,
                role_id: role.id,
                role_name: role.role_name,
            })
            .await
            .map_err(duplicate_to_conflict)?;

        tracing::info!(user_id = %user.id, role = %user.role_name, "User registered");
        Ok(user)
    }

    /// Registers the configured admin account unless its email is taken.
    #[instrument(skip(self, seed), fields(username = %seed.username))]
    pub async fn ensure_admin(&self, seed: &AdminSeed) -> Result<Option<User>, AuthError> {
        if self.users.exists_by_email(&seed.email).await? {
            return Ok(None);
        }

        let user = self
            .register(Registration {
                username: seed.username.clone(),
                email: seed.email.clone(),
                password: seed.password.clone(),
                phone: seed.phone.clone(),
                role_id: Some(ADMIN_ROLE_ID.to_string()),
                by_admin: true,
            })
            .await?;

        tracing::info!(user_id = %user.id, "Admin account created");
        Ok(Some(user))
    }

    #[instrument(skip(self, creds))]
    pub async fn login(&self, creds: Credentials) -> Result<Session, AuthError> {
        if creds.email.is_empty() && creds.username.is_empty() {
            return Err(AuthError::Validation(
                "Email or username is required".to_string(),
            ));
        }

        let user = self
            .users
            .find_by_identity(&creds.email, &creds.username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let valid = match password::verify(&creds.password, &user.password) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!(user_id = %user.id, "Stored password hash unreadable: {e}");
                false
            }
        };
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user).map_err(AuthError::Internal)?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(Session { token, user })
    }
}

/// Maps a unique-index rejection to the same error the existence checks give.
pub fn duplicate_to_conflict(err: StoreError) -> AuthError {
    match err {
        StoreError::Duplicate(field) if field == "email" => AuthError::DuplicateEmail,
        StoreError::Duplicate(field) if field == "username" => AuthError::DuplicateUsername,
        other => AuthError::Store(other),
    }
}
