use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json,
};
use futures::TryStreamExt as _;
use garde::Validate as _;
use notehub_dal::{
    note::{CreateNote, LeaderboardEntry, Note, NoteFilter, NoteRepository, NoteSort},
    user::User,
    Error as DalError,
};
use notehub_store::{StoreError, ValidatedName};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult},
    pages, repository_from_request,
    session::{CurrentUser, MaybeUser},
    state::AppState,
};

repository_from_request!(NoteRepository);

const HOME_TOP_NOTES: i64 = 4;
const LEADERBOARD_SIZE: i64 = 5;

/// Note as shown to clients, with the rating rounded for display.
#[derive(Debug, Serialize)]
pub struct NoteView {
    #[serde(flatten)]
    note: Note,
    rating_display: f64,
}

impl From<Note> for NoteView {
    fn from(note: Note) -> Self {
        let rating_display = note.display_rating();
        NoteView {
            note,
            rating_display,
        }
    }
}

fn views(notes: Vec<Note>) -> Vec<NoteView> {
    notes.into_iter().map(NoteView::from).collect()
}

#[derive(Serialize)]
struct HomePage {
    notes: Vec<NoteView>,
    leaderboard: Vec<LeaderboardEntry>,
    user: Option<User>,
}

pub async fn home(
    MaybeUser(user): MaybeUser,
    repository: NoteRepository,
) -> ApiResult<impl IntoResponse> {
    let notes = repository.top_rated(HOME_TOP_NOTES).await?;
    let leaderboard = repository.leaderboard(LEADERBOARD_SIZE).await?;
    Ok(Json(HomePage {
        notes: views(notes),
        leaderboard,
        user,
    }))
}

pub async fn leaderboard(repository: NoteRepository) -> ApiResult<impl IntoResponse> {
    let leaderboard = repository.leaderboard(LEADERBOARD_SIZE).await?;
    Ok(Json(leaderboard))
}

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    search: Option<String>,
    subject: Option<String>,
    sort: Option<String>,
}

#[derive(Serialize)]
struct BrowsePage {
    notes: Vec<NoteView>,
    subjects: Vec<String>,
    user: User,
}

pub async fn browse(
    CurrentUser(user): CurrentUser,
    repository: NoteRepository,
    Query(query): Query<BrowseQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = NoteFilter {
        search: query.search.filter(|s| !s.is_empty()),
        // "all" in the subject dropdown means no filter
        subject: query
            .subject
            .filter(|s| !s.is_empty() && s != "all"),
        sort: NoteSort::from_param(query.sort.as_deref()),
    };
    let notes = repository.list_public(filter).await?;
    let subjects = repository.subjects().await?;
    Ok(Json(BrowsePage {
        notes: views(notes),
        subjects,
        user,
    }))
}

async fn upload_page(
    _user: CurrentUser,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    pages::serve(&state, "upload.html").await
}

pub async fn upload(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    repository: NoteRepository,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut title = None;
    let mut subject = None;
    let mut file_name = None;
    let mut cover_name = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(ToString::to_string);
        match field_name.as_deref() {
            Some("title") => title = Some(field.text().await?),
            Some("subject") => subject = Some(field.text().await?),
            Some(name @ ("file" | "coverImage")) => {
                let is_cover = name == "coverImage";
                let original = field
                    .file_name()
                    .ok_or_else(|| ApiError::InvalidRequest("Missing file name".to_string()))?
                    .to_string();
                let dest = ValidatedName::for_upload(&original)?;
                debug!("Uploading {} as {}", original, dest.as_ref());
                let stream = field.map_err(|e| {
                    StoreError::StreamError(format!("Error reading multipart field: {e}"))
                });
                let info = state.store().store_stream(&dest, stream).await?;
                if is_cover {
                    cover_name = Some(info.file_name);
                } else {
                    file_name = Some(info.file_name);
                }
            }
            _ => {}
        }
    }

    let payload = CreateNote {
        title: title.ok_or_else(|| ApiError::InvalidRequest("Missing title".to_string()))?,
        subject: subject.ok_or_else(|| ApiError::InvalidRequest("Missing subject".to_string()))?,
        uploaded_by: user.name,
        uploaded_by_id: user.id,
        file: file_name.ok_or_else(|| ApiError::InvalidRequest("Missing file".to_string()))?,
        cover_image: cover_name
            .ok_or_else(|| ApiError::InvalidRequest("Missing cover image".to_string()))?,
    };
    payload.validate()?;
    repository.create(payload).await?;

    Ok(Redirect::to("/"))
}

async fn send_file(state: &AppState, file_name: &str, as_attachment: bool) -> ApiResult<Response> {
    let name = ValidatedName::new(file_name)?;
    let store = state.store();
    let data = store.load(&name).await?;
    let size = store.size(&name).await?;
    let body = Body::from_stream(data);
    let mut headers = HeaderMap::new();

    let mime = new_mime_guess::from_path(file_name)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    headers.insert(
        http::header::CONTENT_TYPE,
        mime.parse().unwrap(), // safe as MIME is ASCII
    );
    headers.insert(
        http::header::CONTENT_LENGTH,
        size.to_string().parse().unwrap(), // safe - number is ASCII
    );

    if as_attachment
        && file_name
            .chars()
            .all(|c| c.is_ascii() && !c.is_ascii_control() && c != '"')
    {
        headers.insert(
            http::header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\"")
                .parse()
                .unwrap(),
        );
    }

    Ok((StatusCode::OK, headers, body).into_response())
}

pub async fn download(
    _user: CurrentUser,
    State(state): State<AppState>,
    repository: NoteRepository,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let note = repository.get(id).await?;
    if !note.moderation_state().publicly_visible() {
        return Err(ApiError::ResourceNotFound("Note".to_string()));
    }
    let note = repository.record_download(id).await?;
    send_file(&state, &note.file, true).await
}

pub async fn view(
    _user: CurrentUser,
    State(state): State<AppState>,
    repository: NoteRepository,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let note = repository.get(id).await?;
    if !note.moderation_state().publicly_visible() {
        return Err(ApiError::ResourceNotFound("Note".to_string()));
    }
    send_file(&state, &note.file, false).await
}

#[derive(Debug, Deserialize)]
pub struct RateBody {
    rating: i32,
}

/// Rating failures are reported in the body, not the status code, so
/// the page script can show the message inline.
pub async fn rate(
    MaybeUser(user): MaybeUser,
    repository: NoteRepository,
    Path(id): Path<i64>,
    Json(body): Json<RateBody>,
) -> ApiResult<Json<serde_json::Value>> {
    fn failure(message: &str) -> Json<serde_json::Value> {
        Json(json!({"success": false, "message": message}))
    }

    let Some(user) = user else {
        return Ok(failure("Login required"));
    };
    if !(1..=5).contains(&body.rating) {
        return Ok(failure("Invalid rating"));
    }

    match repository.rate(id, user.id, body.rating).await {
        Ok(summary) => Ok(Json(json!({
            "success": true,
            "rating": format!("{:.1}", summary.rating),
            "ratingCount": summary.rating_count,
        }))),
        Err(DalError::RecordNotFound(_)) => Ok(failure("Note not found")),
        Err(DalError::OwnRating) => Ok(failure("You cannot rate your own note")),
        Err(DalError::DuplicateRating) => Ok(failure("You already rated this note")),
        Err(e) => Err(e.into()),
    }
}

pub fn router(limit_mb: usize) -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(home))
        .route("/api/leaderboard", get(leaderboard))
        .route("/notes", get(browse))
        .route(
            "/upload",
            get(upload_page)
                .post(upload)
                .layer(DefaultBodyLimit::max(1024 * 1024 * limit_mb)),
        )
        .route("/download/{id}", get(download))
        .route("/view/{id}", get(view))
        .route("/rate/{id}", post(rate))
}
