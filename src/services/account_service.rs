//! Domain service for accounts: registration, activation, login and profile.

use chrono::Duration;
use serde::Serialize;
use thiserror::Error;

use crate::db::User;
use crate::domain::{FieldErrors, UserId};

/// Errors specific to account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Activation link is invalid or has expired.")]
    InvalidActivationLink,

    #[error("Invalid credentials")]
    InvalidCredentials { attempts_remaining: Option<u32> },

    #[error("Account locked")]
    Locked { remaining: Duration },

    #[error("Account is not active")]
    Inactive,

    #[error("Email not verified")]
    EmailNotVerified,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("User not found")]
    UserNotFound,

    #[error("Email delivery failed: {0}")]
    EmailDelivery(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<FieldErrors> for AccountError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub contact: String,
    pub is_active: bool,
    pub email_verified: bool,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: UserId::new(user.id),
            email: user.email,
            name: user.name,
            contact: user.contact,
            is_active: user.is_active,
            email_verified: user.email_verified,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisteredUser {
    pub user_id: UserId,
    pub email: String,
    pub message: String,
}

/// A session token together with its owner.
#[derive(Debug, Clone, Serialize)]
pub struct SessionGrant {
    pub token: String,
    pub user: UserProfile,
}

/// Registration input that already passed field validation.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub contact: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub contact: Option<String>,
}

#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Creates an inactive user and mails the activation link.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Validation`] for a taken email and
    /// [`AccountError::EmailDelivery`] when the mail could not be sent. In
    /// the latter case the user row is kept.
    async fn register(&self, registration: Registration) -> Result<RegisteredUser, AccountError>;

    /// Exchanges an activation link for a session.
    ///
    /// # Errors
    ///
    /// Every failure is reported as [`AccountError::InvalidActivationLink`].
    async fn activate(&self, uidb64: &str, token: &str) -> Result<SessionGrant, AccountError>;

    /// Runs the lockout gate, then verifies credentials.
    ///
    /// # Errors
    ///
    /// [`AccountError::Locked`], [`AccountError::InvalidCredentials`],
    /// [`AccountError::Inactive`] or [`AccountError::EmailNotVerified`].
    async fn login(&self, email: &str, password: &str) -> Result<SessionGrant, AccountError>;

    /// Resolves a session token to its user.
    async fn authenticate_token(&self, token: &str) -> Result<UserProfile, AccountError>;

    async fn profile(&self, user_id: UserId) -> Result<UserProfile, AccountError>;

    async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, AccountError>;

    /// Operator override: marks the account active and verified.
    async fn force_activate(&self, email: &str) -> Result<UserProfile, AccountError>;

    /// Operator override: clears the failed-login counter.
    async fn unlock(&self, email: &str) -> Result<UserProfile, AccountError>;
}
