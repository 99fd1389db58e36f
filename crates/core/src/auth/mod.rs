//! Login and signup flows over a hosted auth/database service.
//!
//! The service itself is behind [`AuthBackend`]; this module owns the
//! client-side rules (required fields, username policy, username-to-email
//! resolution) and the closed [`AuthError`] set every backend must
//! translate its provider codes into.

pub mod firebase;

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use firebase::FirebaseBackend;

pub const MIN_USERNAME_LEN: usize = 3;

/// Every way sign-in or sign-up can fail, as the user sees it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Please fill in all fields.")]
    MissingFields,
    #[error("Username must be at least 3 characters long.")]
    UsernameTooShort,
    #[error("Username can only contain letters, numbers, and underscores.")]
    UsernameInvalid,
    #[error("This username is already taken.")]
    UsernameTaken,
    #[error("No user found with this email or username.")]
    UserNotFound,
    #[error("Incorrect password.")]
    WrongPassword,
    #[error("Incorrect email, username or password.")]
    InvalidCredentials,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("This email is already in use.")]
    EmailInUse,
    #[error("Password should be at least 6 characters.")]
    WeakPassword,
    #[error("Could not reach the authentication service.")]
    Network,
    /// Provider message for codes without a dedicated variant.
    #[error("{0}")]
    Backend(String),
}

impl AuthError {
    pub fn title(&self) -> &'static str {
        match self {
            Self::MissingFields
            | Self::UsernameTooShort
            | Self::UsernameInvalid
            | Self::UsernameTaken => "Error",
            _ => "Authentication Error",
        }
    }
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// A signed-in account.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub uid: String,
    pub email: String,
    pub id_token: String,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Profile stored in the `users` collection under the account id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub email: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Hosted auth + user-record store.
pub trait AuthBackend {
    /// Email registered for `username`, if any.
    ///
    /// Runs before anyone is signed in, so it is an unauthenticated read of
    /// the users collection.
    fn find_email_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = AuthResult<Option<String>>> + Send;

    fn sign_in(&self, email: &str, password: &str)
        -> impl Future<Output = AuthResult<Account>> + Send;

    fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = AuthResult<Account>> + Send;

    fn store_user(
        &self,
        account: &Account,
        record: &UserRecord,
    ) -> impl Future<Output = AuthResult<()>> + Send;
}

/// Checks length and charset; uniqueness needs the backend.
pub fn validate_username(username: &str) -> AuthResult<()> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AuthError::UsernameTooShort);
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AuthError::UsernameInvalid);
    }
    Ok(())
}

pub struct AuthService<B> {
    backend: B,
}

impl<B: AuthBackend> AuthService<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Signs in with an email or a username.
    pub async fn login(&self, identifier: &str, password: &str) -> AuthResult<Account> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        let email = if identifier.contains('@') {
            identifier.to_string()
        } else {
            debug!("resolving username {identifier}");
            self.backend
                .find_email_by_username(identifier)
                .await?
                .ok_or(AuthError::UserNotFound)?
        };

        let account = self.backend.sign_in(&email, password).await?;
        info!("user logged in: {}", account.uid);
        Ok(account)
    }

    /// Creates an account and its user record.
    pub async fn signup(&self, email: &str, username: &str, password: &str) -> AuthResult<Account> {
        let (email, username) = (email.trim(), username.trim());
        if email.is_empty() || username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }
        validate_username(username)?;

        if self.backend.find_email_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let account = self.backend.create_account(email, password).await?;
        let record = UserRecord {
            username: username.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        if let Err(e) = self.backend.store_user(&account, &record).await {
            // The account exists without a record; it cannot log in by username.
            warn!(
                "account {} ({}) created but its user record was not stored: {}",
                account.uid, account.email, e
            );
            return Err(e);
        }

        info!("user signed up: {}", account.uid);
        Ok(account)
    }
}
