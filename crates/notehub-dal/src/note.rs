use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;
use tracing::warn;

use crate::{error::Result, Error};

/// Moderation lifecycle of a note. `Removed` is terminal for end-user
/// visibility; the record itself is never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationState {
    Pending,
    Approved,
    Removed,
}

impl ModerationState {
    pub fn from_flags(approved: bool, removed: bool) -> Self {
        if removed {
            ModerationState::Removed
        } else if approved {
            ModerationState::Approved
        } else {
            ModerationState::Pending
        }
    }

    /// Admin removal, reachable from any state and idempotent.
    pub fn remove(self) -> Self {
        ModerationState::Removed
    }

    pub fn publicly_visible(&self) -> bool {
        !matches!(self, ModerationState::Removed)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NoteInt {
    id: i64,
    title: String,
    subject: String,
    uploaded_by: String,
    uploaded_by_id: i64,
    file: String,
    cover_image: String,
    downloads: i64,
    rating: f64,
    rating_count: i64,
    comments: String,
    approved: bool,
    removed: bool,
    created: time::PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub subject: String,
    pub uploaded_by: String,
    pub uploaded_by_id: i64,
    pub file: String,
    pub cover_image: String,
    pub downloads: i64,
    pub rating: f64,
    pub rating_count: i64,
    pub comments: Vec<String>,
    pub approved: bool,
    pub removed: bool,
    pub created: time::PrimitiveDateTime,
}

impl Note {
    pub fn moderation_state(&self) -> ModerationState {
        ModerationState::from_flags(self.approved, self.removed)
    }

    /// Aggregate rating truncated to one decimal, for display only.
    pub fn display_rating(&self) -> f64 {
        (self.rating * 10.0).round() / 10.0
    }
}

impl From<NoteInt> for Note {
    fn from(value: NoteInt) -> Self {
        let comments = serde_json::from_str(&value.comments).unwrap_or_else(|e| {
            warn!("Malformed comments on note {}: {e}", value.id);
            Vec::new()
        });
        Note {
            id: value.id,
            title: value.title,
            subject: value.subject,
            uploaded_by: value.uploaded_by,
            uploaded_by_id: value.uploaded_by_id,
            file: value.file,
            cover_image: value.cover_image,
            downloads: value.downloads,
            rating: value.rating,
            rating_count: value.rating_count,
            comments,
            approved: value.approved,
            removed: value.removed,
            created: value.created,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateNote {
    #[garde(length(min = 1, max = 255))]
    pub title: String,
    #[garde(length(min = 1, max = 255))]
    pub subject: String,
    #[garde(length(min = 1, max = 255))]
    pub uploaded_by: String,
    #[garde(range(min = 1))]
    pub uploaded_by_id: i64,
    #[garde(length(min = 1, max = 1023))]
    pub file: String,
    #[garde(length(min = 1, max = 1023))]
    pub cover_image: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoteSort {
    #[default]
    Newest,
    Oldest,
    TopRated,
}

impl NoteSort {
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("rating") => NoteSort::TopRated,
            Some("oldest") => NoteSort::Oldest,
            _ => NoteSort::Newest,
        }
    }
}

#[derive(Debug, Default)]
pub struct NoteFilter {
    pub search: Option<String>,
    pub subject: Option<String>,
    pub sort: NoteSort,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub uploader: String,
    pub total_notes: i64,
    pub total_downloads: i64,
    pub avg_rating: f64,
}

#[derive(Debug, Serialize)]
pub struct ModerationCounts {
    pub total: i64,
    pub approved: i64,
    pub pending: i64,
    pub removed: i64,
}

#[derive(Debug, Serialize)]
pub struct RatingSummary {
    pub rating: f64,
    pub rating_count: i64,
}

const NOTE_COLUMNS: &str = "id, title, subject, uploaded_by, uploaded_by_id, file, cover_image, \
     downloads, rating, rating_count, comments, approved, removed, created";

pub type NoteRepository = NoteRepositoryImpl<crate::Pool>;

pub struct NoteRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> NoteRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateNote) -> Result<Note> {
        let result = sqlx::query(
            "INSERT INTO notes (title, subject, uploaded_by, uploaded_by_id, file, cover_image) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(payload.title)
        .bind(payload.subject)
        .bind(payload.uploaded_by)
        .bind(payload.uploaded_by_id)
        .bind(payload.file)
        .bind(payload.cover_image)
        .execute(&self.executor)
        .await?;

        self.get(result.last_insert_rowid()).await
    }

    pub async fn get(&self, id: i64) -> Result<Note> {
        let note = sqlx::query_as::<_, NoteInt>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Note".to_string()))?;
        Ok(note.into())
    }

    /// Listing for end users - removed notes are never included.
    pub async fn list_public(&self, filter: NoteFilter) -> Result<Vec<Note>> {
        let mut query = QueryBuilder::<crate::ChosenDB>::new(format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE removed = 0"
        ));
        if let Some(search) = filter.search {
            query.push(" AND title LIKE ");
            query.push_bind(format!("%{search}%"));
        }
        if let Some(subject) = filter.subject {
            query.push(" AND subject = ");
            query.push_bind(subject);
        }
        query.push(match filter.sort {
            NoteSort::Newest => " ORDER BY created DESC",
            NoteSort::Oldest => " ORDER BY created ASC",
            NoteSort::TopRated => " ORDER BY rating DESC",
        });
        let notes = query
            .build_query_as::<NoteInt>()
            .fetch_all(&self.executor)
            .await?;
        Ok(notes.into_iter().map(Note::from).collect())
    }

    pub async fn subjects(&self) -> Result<Vec<String>> {
        let subjects = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT subject FROM notes WHERE removed = 0 ORDER BY subject",
        )
        .fetch_all(&self.executor)
        .await?;
        Ok(subjects)
    }

    pub async fn top_rated(&self, limit: i64) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, NoteInt>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE removed = 0 ORDER BY rating DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.executor)
        .await?;
        Ok(notes.into_iter().map(Note::from).collect())
    }

    /// Top uploaders over non-removed notes, ordered by total downloads,
    /// ties broken by mean rating. Recomputed fully on every call.
    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            "SELECT uploaded_by AS uploader, COUNT(*) AS total_notes, \
             SUM(COALESCE(downloads, 0)) AS total_downloads, AVG(rating) AS avg_rating \
             FROM notes WHERE removed = 0 GROUP BY uploaded_by \
             ORDER BY total_downloads DESC, avg_rating DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.executor)
        .await?;
        Ok(entries)
    }

    /// Increments the download counter atomically and returns the note.
    pub async fn record_download(&self, id: i64) -> Result<Note> {
        let result = sqlx::query("UPDATE notes SET downloads = downloads + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Note".to_string()));
        }
        self.get(id).await
    }

    /// Admin soft delete - idempotent, no reversal operation exists.
    pub async fn remove(&self, id: i64) -> Result<()> {
        let result = sqlx::query("UPDATE notes SET removed = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Note".to_string()));
        }
        Ok(())
    }

    /// Admin listing - full note set, removed included.
    pub async fn list_all(&self) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, NoteInt>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes ORDER BY created DESC"
        ))
        .fetch_all(&self.executor)
        .await?;
        Ok(notes.into_iter().map(Note::from).collect())
    }

    pub async fn admin_search(&self, term: &str) -> Result<Vec<Note>> {
        let pattern = format!("%{term}%");
        let mut query = QueryBuilder::<crate::ChosenDB>::new(format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE title LIKE "
        ));
        query.push_bind(pattern.clone());
        query.push(" OR subject LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR uploaded_by LIKE ");
        query.push_bind(pattern);
        query.push(" ORDER BY created DESC");
        let notes = query
            .build_query_as::<NoteInt>()
            .fetch_all(&self.executor)
            .await?;
        Ok(notes.into_iter().map(Note::from).collect())
    }

    pub async fn counts(&self) -> Result<ModerationCounts> {
        let (total, approved, removed) = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT COUNT(*), COALESCE(SUM(approved), 0), COALESCE(SUM(removed), 0) FROM notes",
        )
        .fetch_one(&self.executor)
        .await?;
        Ok(ModerationCounts {
            total,
            approved,
            pending: total - approved,
            removed,
        })
    }

    /// Admin report: best rated notes over the full set, removed included.
    pub async fn top_rated_all(&self, limit: i64) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, NoteInt>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes ORDER BY rating DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.executor)
        .await?;
        Ok(notes.into_iter().map(Note::from).collect())
    }

    pub async fn most_downloaded(&self, limit: i64) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, NoteInt>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes ORDER BY downloads DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.executor)
        .await?;
        Ok(notes.into_iter().map(Note::from).collect())
    }
}

impl NoteRepositoryImpl<crate::Pool> {
    /// Appends a user rating and recomputes the aggregate in one transaction.
    /// The unique index on (note_id, user_id) is the duplicate guard, so two
    /// concurrent submissions cannot both take effect.
    pub async fn rate(&self, note_id: i64, user_id: i64, value: i32) -> Result<RatingSummary> {
        let mut tx = self.executor.begin().await?;

        let uploader: Option<(i64,)> =
            sqlx::query_as("SELECT uploaded_by_id FROM notes WHERE id = ?")
                .bind(note_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (uploaded_by_id,) =
            uploader.ok_or_else(|| Error::RecordNotFound("Note".to_string()))?;
        if uploaded_by_id == user_id {
            return Err(Error::OwnRating);
        }

        sqlx::query("INSERT INTO note_ratings (note_id, user_id, value) VALUES (?, ?, ?)")
            .bind(note_id)
            .bind(user_id)
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => Error::DuplicateRating,
                _ => Error::from(e),
            })?;

        sqlx::query(
            "UPDATE notes SET \
             rating = (SELECT AVG(value) FROM note_ratings WHERE note_id = ?), \
             rating_count = (SELECT COUNT(*) FROM note_ratings WHERE note_id = ?) \
             WHERE id = ?",
        )
        .bind(note_id)
        .bind(note_id)
        .bind(note_id)
        .execute(&mut *tx)
        .await?;

        let summary: (f64, i64) =
            sqlx::query_as("SELECT rating, rating_count FROM notes WHERE id = ?")
                .bind(note_id)
                .fetch_one(&mut *tx)
                .await?;
        tx.commit().await?;

        Ok(RatingSummary {
            rating: summary.0,
            rating_count: summary.1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderation_flags() {
        assert_eq!(
            ModerationState::from_flags(false, false),
            ModerationState::Pending
        );
        assert_eq!(
            ModerationState::from_flags(true, false),
            ModerationState::Approved
        );
        // removal wins over approval
        assert_eq!(
            ModerationState::from_flags(true, true),
            ModerationState::Removed
        );
    }

    #[test]
    fn test_removal_is_terminal_and_idempotent() {
        let removed = ModerationState::Pending.remove();
        assert_eq!(removed, ModerationState::Removed);
        assert_eq!(removed.remove(), ModerationState::Removed);
        assert_eq!(ModerationState::Approved.remove(), ModerationState::Removed);
        assert!(!removed.publicly_visible());
        assert!(ModerationState::Pending.publicly_visible());
    }

    #[test]
    fn test_sort_param() {
        assert_eq!(NoteSort::from_param(Some("rating")), NoteSort::TopRated);
        assert_eq!(NoteSort::from_param(Some("oldest")), NoteSort::Oldest);
        assert_eq!(NoteSort::from_param(Some("bogus")), NoteSort::Newest);
        assert_eq!(NoteSort::from_param(None), NoteSort::Newest);
    }
}
