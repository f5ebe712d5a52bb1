//! Registration, login and the startup admin account.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::TokenIssuer;
use crate::clock::Clock;
use crate::config::AdminSeed;
use crate::models::{Role, User};
use crate::store::{Store, StoreError};
use crate::utils::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub name: String,
    pub id: Uuid,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_taken() -> AppError {
    AppError::ValidationError("Email already registered.".to_string())
}

fn invalid_credentials() -> AppError {
    AppError::AuthError("Invalid credentials.".to_string())
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    tokens: Arc<TokenIssuer>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            store,
            clock,
            tokens,
        }
    }

    /// Self-service sign-up. Admin accounts cannot be created this way.
    pub async fn register(&self, registration: Registration) -> AppResult<User> {
        if registration.role == Role::Admin {
            return Err(AppError::Forbidden(
                "Admin accounts cannot be self-registered.".to_string(),
            ));
        }
        self.create_user(registration).await
    }

    async fn create_user(&self, registration: Registration) -> AppResult<User> {
        let name = registration.name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError("Name is required.".to_string()));
        }
        let email = normalize_email(&registration.email);
        if !email.contains('@') {
            return Err(AppError::ValidationError(
                "A valid email address is required.".to_string(),
            ));
        }
        if registration.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::ValidationError(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters."
            )));
        }

        let mut uow = self.store.begin().await?;
        if uow.find_user_by_email(&email).await?.is_some() {
            super::abandon(uow).await;
            return Err(email_taken());
        }

        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            password_hash: hash_password(&registration.password),
            role: registration.role,
            created_at: self.clock.now(),
        };
        match uow.insert_user(&user).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation(_)) => {
                super::abandon(uow).await;
                return Err(email_taken());
            }
            Err(e) => return Err(e.into()),
        }
        uow.commit().await?;

        info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginResponse> {
        let email = normalize_email(email);
        let mut uow = self.store.begin().await?;
        let user = uow.find_user_by_email(&email).await?;
        uow.commit().await?;

        let user = match user {
            Some(user) if verify_password(password, &user.password_hash) => user,
            _ => {
                warn!(email = %email, "Failed login attempt");
                return Err(invalid_credentials());
            }
        };

        let token = self.tokens.issue(&user).map_err(|e| {
            tracing::error!(error = ?e, "Token signing failed");
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(LoginResponse {
            token,
            role: user.role,
            name: user.name,
            id: user.id,
        })
    }

    /// Creates the configured admin account unless the email is already
    /// registered. Returns whether an account was created.
    pub async fn ensure_admin(&self, seed: &AdminSeed) -> AppResult<bool> {
        let mut uow = self.store.begin().await?;
        let existing = uow.find_user_by_email(&normalize_email(&seed.email)).await?;
        uow.commit().await?;
        if existing.is_some() {
            return Ok(false);
        }

        let admin = self
            .create_user(Registration {
                name: seed.name.clone(),
                email: seed.email.clone(),
                password: seed.password.clone(),
                role: Role::Admin,
            })
            .await?;
        info!(user_id = %admin.id, "Admin account provisioned");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::JwtConfig;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn service() -> (AccountService, Arc<TokenIssuer>) {
        let tokens = Arc::new(TokenIssuer::new(&JwtConfig {
            secret: "test-secret".to_string(),
            issuer: "eventdesk".to_string(),
            audience: "eventdesk-clients".to_string(),
            ttl: Duration::minutes(60),
        }));
        let service = AccountService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
            tokens.clone(),
        );
        (service, tokens)
    }

    fn registration(email: &str, role: Role) -> Registration {
        Registration {
            name: "Ada Lovelace".to_string(),
            email: email.to_string(),
            password: "analytical".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (service, tokens) = service();
        let user = service
            .register(registration("  Ada@Example.com ", Role::Organizer))
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_ne!(user.password_hash, "analytical");

        let login = service.login("ADA@example.com", "analytical").await.unwrap();
        assert_eq!(login.id, user.id);
        assert_eq!(login.role, Role::Organizer);

        let claims = tokens.verify(&login.token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Organizer);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let (service, _) = service();
        service
            .register(registration("ada@example.com", Role::Attendee))
            .await
            .unwrap();

        let err = service
            .register(registration("ADA@example.com", Role::Attendee))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref m) if m == "Email already registered."));
    }

    #[tokio::test]
    async fn test_registration_validation() {
        let (service, _) = service();

        let mut short = registration("ada@example.com", Role::Attendee);
        short.password = "abc".to_string();
        let mut nameless = registration("ada@example.com", Role::Attendee);
        nameless.name = " ".to_string();

        for bad in [short, nameless, registration("not-an-email", Role::Attendee)] {
            let err = service.register(bad).await.unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }

        let err = service
            .register(registration("root@example.com", Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let (service, _) = service();
        service
            .register(registration("ada@example.com", Role::Attendee))
            .await
            .unwrap();

        for (email, password) in [("ada@example.com", "wrong-pass"), ("nobody@example.com", "analytical")] {
            let err = service.login(email, password).await.unwrap_err();
            assert!(matches!(err, AppError::AuthError(ref m) if m == "Invalid credentials."));
        }
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let (service, _) = service();
        let seed = AdminSeed {
            name: "Root".to_string(),
            email: "root@example.com".to_string(),
            password: "changeme".to_string(),
        };

        assert!(service.ensure_admin(&seed).await.unwrap());
        assert!(!service.ensure_admin(&seed).await.unwrap());

        let login = service.login("root@example.com", "changeme").await.unwrap();
        assert_eq!(login.role, Role::Admin);
    }
}
