use garde::Validate;
use notehub_types::general::ValidEmail;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::Result,
    password::{hash_password, verify_password},
    Error,
};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateUser {
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(dive)]
    pub email: ValidEmail,
    /// None marks an externally authenticated identity.
    #[garde(inner(length(min = 8, max = 255)))]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created: time::PrimitiveDateTime,
}

pub type UserRepository = UserRepositoryImpl<crate::Pool>;

pub struct UserRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> UserRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateUser) -> Result<User> {
        let password = payload.password.map(|p| hash_password(&p)).transpose()?;
        let result = sqlx::query("INSERT INTO users (name, email, password) VALUES (?, ?, ?)")
            .bind(payload.name)
            .bind(payload.email.as_ref())
            .bind(password)
            .execute(&self.executor)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => Error::EmailTaken,
                _ => Error::from(e),
            })?;

        self.get(result.last_insert_rowid()).await
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        let user =
            sqlx::query_as::<_, User>("SELECT id, name, email, created FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.executor)
                .await?
                .ok_or_else(|| Error::RecordNotFound("User".to_string()))?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.executor)
        .await?;
        Ok(user)
    }

    pub async fn check_password(&self, email: &str, password: &str) -> Result<User> {
        let row: Option<(i64, Option<String>)> =
            sqlx::query_as("SELECT id, password FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.executor)
                .await?;
        let (id, hashed_password) = row.ok_or_else(|| {
            debug!("Unknown user: {email}");
            Error::InvalidCredentials
        })?;
        // External identities have no local password and cannot log in here.
        if let Some(hashed_password) = hashed_password {
            if verify_password(password, &hashed_password).unwrap_or(false) {
                return self.get(id).await;
            }
        }
        Err(Error::InvalidCredentials)
    }
}
