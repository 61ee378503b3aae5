use std::sync::Arc;

use anyhow::anyhow;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use tracing::info;

use crate::{
    db::{Repository, Store},
    models::{CreateUserEntity, UserEntity},
    services::ServiceError,
};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Creates an account. Only an Argon2id hash of the password is stored.
    async fn register(&self, email: &str, password: &str) -> Result<UserEntity, ServiceError>;

    async fn login(&self, email: &str, password: &str) -> Result<UserEntity, ServiceError>;

    async fn get_user(&self, user_id: i64) -> Result<UserEntity, ServiceError>;
}

pub struct AuthService<S> {
    store: Arc<S>,
}

impl<S: Store> AuthService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

fn canonical_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Canonical form of a new account's email, rejecting anything without a local part and a
/// domain.
fn normalize_email(email: &str) -> Result<String, ServiceError> {
    let email = canonical_email(email);
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ServiceError::Validation(format!(
            "{email:?} is not a valid email address"
        ))),
    }
}

fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("Failed to hash password: {err}").into())
}

fn verify_password(password: &str, hash: &str) -> Result<(), ServiceError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|err| anyhow!("Stored password hash is invalid: {err}"))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ServiceError::Unauthorized("Invalid password".into()))
}

#[async_trait]
impl<S: Store> CredentialStore for AuthService<S> {
    async fn register(&self, email: &str, password: &str) -> Result<UserEntity, ServiceError> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(ServiceError::Validation("Password must not be empty".into()));
        }
        let password_hash = hash_password(password)?;

        let user = self
            .store
            .run(move |conn| {
                Box::pin(async move {
                    if conn.find_user_by_email(&email).await?.is_some() {
                        return Err(ServiceError::Conflict("Email already exists".into()));
                    }
                    Ok(conn
                        .insert_user(CreateUserEntity {
                            email,
                            password_hash,
                        })
                        .await?)
                })
            })
            .await?;

        info!("Registered user #{}", user.id);
        Ok(user)
    }

    async fn login(&self, email: &str, password: &str) -> Result<UserEntity, ServiceError> {
        let email = canonical_email(email);
        let user = self
            .store
            .run(move |conn| Box::pin(async move { Ok(conn.find_user_by_email(&email).await?) }))
            .await?
            .ok_or_else(|| ServiceError::NotFound("User".into()))?;

        verify_password(password, &user.password_hash)?;
        Ok(user)
    }

    async fn get_user(&self, user_id: i64) -> Result<UserEntity, ServiceError> {
        self.store
            .run(move |conn| Box::pin(async move { Ok(conn.find_user(user_id).await?) }))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User #{user_id}")))
    }
}
