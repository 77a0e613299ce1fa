use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::Result, Error};

/// Owner marker for snippets saved without a logged in user.
pub const ANONYMOUS_OWNER: &str = "guest";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Snippet {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub language: String,
    pub code: String,
    pub created: time::PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSnippet {
    #[garde(skip)]
    pub user_id: Option<String>,
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(length(min = 1, max = 50))]
    pub language: String,
    #[garde(length(min = 1, max = 100000))]
    pub code: String,
}

pub type SnippetRepository = SnippetRepositoryImpl<crate::Pool>;

pub struct SnippetRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> SnippetRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Snippets are immutable once created; the generated id doubles as the
    /// public share link, hence a random UUID rather than a row id.
    pub async fn create(&self, payload: CreateSnippet) -> Result<Snippet> {
        let id = Uuid::new_v4().to_string();
        let user_id = payload
            .user_id
            .unwrap_or_else(|| ANONYMOUS_OWNER.to_string());
        sqlx::query(
            "INSERT INTO snippets (id, user_id, name, language, code) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(payload.name)
        .bind(payload.language)
        .bind(payload.code)
        .execute(&self.executor)
        .await?;

        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> Result<Snippet> {
        let snippet = sqlx::query_as::<_, Snippet>(
            "SELECT id, user_id, name, language, code, created FROM snippets WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Snippet".to_string()))?;
        Ok(snippet)
    }
}
