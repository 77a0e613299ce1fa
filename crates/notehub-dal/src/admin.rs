use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::Result,
    password::{hash_password, verify_password},
    Error,
};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Admin {
    pub id: i64,
    pub username: String,
}

pub type AdminRepository = AdminRepositoryImpl<crate::Pool>;

pub struct AdminRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> AdminRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn check_password(&self, username: &str, password: &str) -> Result<Admin> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, password FROM admins WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.executor)
                .await?;
        let (id, hashed_password) = row.ok_or_else(|| {
            debug!("Unknown admin: {username}");
            Error::InvalidCredentials
        })?;
        if verify_password(password, &hashed_password).unwrap_or(false) {
            return self.get(id).await;
        }
        Err(Error::InvalidCredentials)
    }

    pub async fn get(&self, id: i64) -> Result<Admin> {
        let admin = sqlx::query_as::<_, Admin>("SELECT id, username FROM admins WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Admin".to_string()))?;
        Ok(admin)
    }

    /// Creates the admin account if it does not exist yet. Admins are static
    /// seed data, there is no runtime management of them.
    pub async fn ensure(&self, username: &str, password: &str) -> Result<()> {
        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM admins WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.executor)
                .await?;
        if existing.is_some() {
            return Ok(());
        }
        let hashed = hash_password(password)?;
        sqlx::query("INSERT INTO admins (username, password) VALUES (?, ?)")
            .bind(username)
            .bind(hashed)
            .execute(&self.executor)
            .await?;
        info!("Seeded admin account {username}");
        Ok(())
    }
}
