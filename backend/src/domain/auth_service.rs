//! Email and password authentication.
//!
//! [`AuthProvider`] is the seam a hosted identity service would plug into.
//! [`LocalAuthProvider`] keeps accounts in the document store and tracks a
//! single signed-in session.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use rand::RngCore;
use sha2::{Digest, Sha256};
use shared::UserAccount;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::storage::{DocumentStore, StoredUser, UserRepository};

pub const MIN_PASSWORD_LENGTH: usize = 6;
const SALT_BYTES: usize = 16;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuthError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Password must be at least 6 characters")]
    WeakPassword,
    #[error("An account with this email already exists")]
    EmailTaken,
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("Not signed in")]
    NotSignedIn,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create an account and sign it in
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserAccount>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserAccount>;
    async fn current_user(&self) -> Option<UserAccount>;
    async fn sign_out(&self);
}

pub struct LocalAuthProvider {
    users: UserRepository,
    session: RwLock<Option<UserAccount>>,
    sign_up_lock: Mutex<()>,
}

impl LocalAuthProvider {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            users: UserRepository::new(store),
            session: RwLock::new(None),
            sign_up_lock: Mutex::new(()),
        }
    }

    fn normalize_email(email: &str) -> Result<String, AuthError> {
        let email = email.trim().to_lowercase();
        let valid = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
            }
            None => false,
        };
        if valid && !email.contains(char::is_whitespace) {
            Ok(email)
        } else {
            Err(AuthError::InvalidEmail)
        }
    }

    fn hash_password(salt: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        to_hex(&hasher.finalize())
    }

    fn generate_salt() -> String {
        let mut salt = [0u8; SALT_BYTES];
        rand::thread_rng().fill_bytes(&mut salt);
        to_hex(&salt)
    }

    async fn set_session(&self, account: &UserAccount) {
        *self.session.write().await = Some(account.clone());
    }
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserAccount> {
        let email = Self::normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword.into());
        }

        let _guard = self.sign_up_lock.lock().await;
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken.into());
        }

        let salt = Self::generate_salt();
        let user = StoredUser {
            account: UserAccount {
                id: uuid::Uuid::new_v4().to_string(),
                email,
                created_at: Utc::now(),
            },
            password_hash: Self::hash_password(&salt, password),
            password_salt: salt,
        };
        self.users.store_user(&user).await?;
        info!("Signed up user {}", user.account.id);

        self.set_session(&user.account).await;
        Ok(user.account)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserAccount> {
        let email = Self::normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!("Sign-in attempt for unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };
        if Self::hash_password(&user.password_salt, password) != user.password_hash {
            warn!("Sign-in failed for user {}", user.account.id);
            return Err(AuthError::InvalidCredentials.into());
        }

        info!("Signed in user {}", user.account.id);
        self.set_session(&user.account).await;
        Ok(user.account)
    }

    async fn current_user(&self) -> Option<UserAccount> {
        self.session.read().await.clone()
    }

    async fn sign_out(&self) {
        if let Some(user) = self.session.write().await.take() {
            info!("Signed out user {}", user.id);
        }
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}
