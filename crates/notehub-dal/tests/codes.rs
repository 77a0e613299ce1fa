use notehub_dal::saved_code::{CreateSavedCode, SavedCodeRepository};
use notehub_dal::snippet::{CreateSnippet, SnippetRepository, ANONYMOUS_OWNER};
use notehub_dal::Error;
use sqlx::Executor;

async fn init_db() -> sqlx::Pool<sqlx::Sqlite> {
    let conn = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    notehub_dal::migrate(&conn).await.unwrap();
    conn.execute(
        "INSERT INTO users (id, name, email, password) VALUES (1, 'alice', 'alice@example.com', NULL), \
         (2, 'bob', 'bob@example.com', NULL)",
    )
    .await
    .unwrap();
    conn
}

#[tokio::test]
async fn test_snippet_roundtrip() {
    let conn = init_db().await;
    let repo = SnippetRepository::new(conn);

    let snippet = repo
        .create(CreateSnippet {
            user_id: Some("1".to_string()),
            name: "fizzbuzz".to_string(),
            language: "python".to_string(),
            code: "print('fizz')".to_string(),
        })
        .await
        .unwrap();
    assert!(!snippet.id.is_empty());

    let loaded = repo.get(&snippet.id).await.unwrap();
    assert_eq!(loaded.name, "fizzbuzz");
    assert_eq!(loaded.code, "print('fizz')");
}

#[tokio::test]
async fn test_snippet_anonymous_owner() {
    let conn = init_db().await;
    let repo = SnippetRepository::new(conn);

    let snippet = repo
        .create(CreateSnippet {
            user_id: None,
            name: "hello".to_string(),
            language: "js".to_string(),
            code: "console.log('hi')".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(snippet.user_id, ANONYMOUS_OWNER);
}

#[tokio::test]
async fn test_snippet_missing() {
    let conn = init_db().await;
    let repo = SnippetRepository::new(conn);

    let err = repo.get("no-such-id").await.unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(_)));
}

#[tokio::test]
async fn test_saved_code_listing() {
    let conn = init_db().await;
    let repo = SavedCodeRepository::new(conn);

    for title in ["first", "second"] {
        repo.create(CreateSavedCode {
            user_id: 1,
            title: title.to_string(),
            language: "c".to_string(),
            code: "int main() { return 0; }".to_string(),
        })
        .await
        .unwrap();
    }
    repo.create(CreateSavedCode {
        user_id: 2,
        title: "bobs".to_string(),
        language: "cpp".to_string(),
        code: "int main() {}".to_string(),
    })
    .await
    .unwrap();

    let codes = repo.list_for_user(1).await.unwrap();
    assert_eq!(codes.len(), 2);
    assert!(codes.iter().all(|c| c.user_id == 1));
}

#[tokio::test]
async fn test_saved_code_delete_checks_owner() {
    let conn = init_db().await;
    let repo = SavedCodeRepository::new(conn);

    let code = repo
        .create(CreateSavedCode {
            user_id: 1,
            title: "mine".to_string(),
            language: "java".to_string(),
            code: "class A {}".to_string(),
        })
        .await
        .unwrap();

    // someone else cannot delete it
    let err = repo.delete_owned(code.id, 2).await.unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(_)));
    assert_eq!(repo.list_for_user(1).await.unwrap().len(), 1);

    repo.delete_owned(code.id, 1).await.unwrap();
    assert!(repo.list_for_user(1).await.unwrap().is_empty());
}
