use std::sync::Arc;
use thiserror::Error;

use crate::auth::{hash_password, verify_password, AuthError};
use crate::database::models::{NewUser, User};
use crate::database::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Password(#[from] AuthError),
}

/// Account creation and credential checks shared by the API and the CLI
#[derive(Clone)]
pub struct UserService {
    db: Arc<dyn Database>,
    hash_cost: u32,
}

impl UserService {
    pub fn new(db: Arc<dyn Database>, hash_cost: u32) -> Self {
        Self { db, hash_cost }
    }

    /// Store a new account with a bcrypt-hashed password. Duplicate emails are a `Conflict`.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, UserServiceError> {
        let password = password.to_string();
        let cost = self.hash_cost;
        let hashed_password = tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| AuthError::PasswordHash(e.to_string()))??;

        let user = self
            .db
            .insert_user(NewUser {
                email: email.trim().to_lowercase(),
                hashed_password,
            })
            .await?;

        tracing::info!("Registered user {}", user.email);
        Ok(user)
    }

    /// The matching user, or `None` for an unknown email or wrong password
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, DatabaseError> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.db.find_user_by_email(&email).await? else {
            tracing::debug!("Login attempt for unknown user {}", email);
            return Ok(None);
        };

        let password = password.to_string();
        let stored = user.hashed_password.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Password check did not finish: {}", e);
                false
            });

        if matches {
            Ok(Some(user))
        } else {
            tracing::debug!("Wrong password for {}", email);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::MIN_COST;
    use crate::database::MemoryDatabase;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryDatabase::new()), MIN_COST)
    }

    #[tokio::test]
    async fn registered_user_can_authenticate() {
        let users = service();
        let user = users.register("User@Example.com", "secret").await.unwrap();
        assert_eq!(user.email, "user@example.com");
        assert!(user.hashed_password.starts_with("$2b$04$"));

        let found = users.authenticate("user@example.com", "secret").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_rejected() {
        let users = service();
        users.register("user@example.com", "secret").await.unwrap();

        assert!(users.authenticate("user@example.com", "nope").await.unwrap().is_none());
        assert!(users.authenticate("other@example.com", "secret").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let users = service();
        users.register("user@example.com", "secret").await.unwrap();

        assert!(matches!(
            users.register("user@example.com", "other").await,
            Err(UserServiceError::Database(DatabaseError::Conflict(_)))
        ));
    }
}
