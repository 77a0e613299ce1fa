use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{error::Result, Error};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SavedCode {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub language: String,
    pub code: String,
    pub created: time::PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSavedCode {
    #[garde(range(min = 1))]
    pub user_id: i64,
    #[garde(length(min = 1, max = 255))]
    pub title: String,
    #[garde(length(min = 1, max = 50))]
    pub language: String,
    #[garde(length(min = 1, max = 100000))]
    pub code: String,
}

pub type SavedCodeRepository = SavedCodeRepositoryImpl<crate::Pool>;

pub struct SavedCodeRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> SavedCodeRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateSavedCode) -> Result<SavedCode> {
        let result = sqlx::query(
            "INSERT INTO saved_codes (user_id, title, language, code) VALUES (?, ?, ?, ?)",
        )
        .bind(payload.user_id)
        .bind(payload.title)
        .bind(payload.language)
        .bind(payload.code)
        .execute(&self.executor)
        .await?;

        self.get(result.last_insert_rowid()).await
    }

    pub async fn get(&self, id: i64) -> Result<SavedCode> {
        let code = sqlx::query_as::<_, SavedCode>(
            "SELECT id, user_id, title, language, code, created FROM saved_codes WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Saved code".to_string()))?;
        Ok(code)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<SavedCode>> {
        let codes = sqlx::query_as::<_, SavedCode>(
            "SELECT id, user_id, title, language, code, created FROM saved_codes \
             WHERE user_id = ? ORDER BY created DESC",
        )
        .bind(user_id)
        .fetch_all(&self.executor)
        .await?;
        Ok(codes)
    }

    /// Deletes only when the code belongs to the given user.
    pub async fn delete_owned(&self, id: i64, user_id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM saved_codes WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.executor)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Saved code".to_string()));
        }
        Ok(())
    }
}
