use notehub_dal::admin::AdminRepository;
use notehub_dal::user::{CreateUser, UserRepository};
use notehub_dal::Error;

async fn init_db() -> sqlx::Pool<sqlx::Sqlite> {
    let conn = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    notehub_dal::migrate(&conn).await.unwrap();
    conn
}

fn new_user(email: &str, password: Option<&str>) -> CreateUser {
    CreateUser {
        name: "Test User".to_string(),
        email: email.parse().unwrap(),
        password: password.map(ToString::to_string),
    }
}

#[tokio::test]
async fn test_create_and_login() {
    let conn = init_db().await;
    let repo = UserRepository::new(conn);

    let user = repo
        .create(new_user("test@example.com", Some("verysecret")))
        .await
        .unwrap();
    assert_eq!(user.email, "test@example.com");

    let logged = repo
        .check_password("test@example.com", "verysecret")
        .await
        .unwrap();
    assert_eq!(logged.id, user.id);

    let err = repo
        .check_password("test@example.com", "wrongpassword")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials));

    let err = repo
        .check_password("nobody@example.com", "verysecret")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials));
}

#[tokio::test]
async fn test_duplicate_email() {
    let conn = init_db().await;
    let repo = UserRepository::new(conn);

    repo.create(new_user("dup@example.com", Some("verysecret")))
        .await
        .unwrap();
    let err = repo
        .create(new_user("dup@example.com", Some("othersecret")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmailTaken));
}

#[tokio::test]
async fn test_external_identity_has_no_password() {
    let conn = init_db().await;
    let repo = UserRepository::new(conn);

    // accounts provisioned from an identity provider carry no local password
    let user = repo.create(new_user("sso@example.com", None)).await.unwrap();

    let found = repo.find_by_email("sso@example.com").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));

    let err = repo
        .check_password("sso@example.com", "anything")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials));
}

#[tokio::test]
async fn test_find_by_email_missing() {
    let conn = init_db().await;
    let repo = UserRepository::new(conn);

    let found = repo.find_by_email("missing@example.com").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_admin_seed_and_login() {
    let conn = init_db().await;
    let repo = AdminRepository::new(conn);

    repo.ensure("admin", "adminsecret").await.unwrap();
    // seeding again is a no-op
    repo.ensure("admin", "differentsecret").await.unwrap();

    let admin = repo.check_password("admin", "adminsecret").await.unwrap();
    assert_eq!(admin.username, "admin");

    let err = repo
        .check_password("admin", "differentsecret")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials));
}
