use notehub_dal::note::{CreateNote, NoteRepository};
use notehub_dal::user::{CreateUser, User, UserRepository};
use notehub_e2e_tests::{browser_client, login_user, prepare_env, spawn_server};
use reqwest::Url;
use serde_json::{json, Value};
use tracing::info;
use tracing_test::traced_test;

async fn create_user(registry: &UserRepository, name: &str) -> User {
    registry
        .create(CreateUser {
            name: name.to_string(),
            email: format!("{name}@example.com").parse().unwrap(),
            password: Some("correcthorse".to_string()),
        })
        .await
        .unwrap()
}

async fn post_rating(client: &reqwest::Client, base_url: &Url, note_id: i64, rating: i32) -> Value {
    let response = client
        .post(base_url.join(&format!("rate/{note_id}")).unwrap())
        .json(&json!({"rating": rating}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    response.json().await.unwrap()
}

#[tokio::test]
#[traced_test]
async fn test_rating_contract() {
    let (config, state, _config_guard) = prepare_env("test_rating_contract").await.unwrap();
    let base_url = config.base_url.clone();

    let user_registry = UserRepository::new(state.pool().clone());
    let alice = create_user(&user_registry, "alice").await;
    let _bob = create_user(&user_registry, "bob").await;

    let note_registry = NoteRepository::new(state.pool().clone());
    let note = note_registry
        .create(CreateNote {
            title: "Calculus Basics".to_string(),
            subject: "math".to_string(),
            uploaded_by: alice.name.clone(),
            uploaded_by_id: alice.id,
            file: "f1.pdf".to_string(),
            cover_image: "c1.png".to_string(),
        })
        .await
        .unwrap();

    spawn_server(config, state).await.unwrap();

    // no session
    let anonymous = browser_client().unwrap();
    let body = post_rating(&anonymous, &base_url, note.id, 5).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Login required"));

    let bob_client = browser_client().unwrap();
    login_user(&bob_client, &base_url, "bob@example.com", "correcthorse")
        .await
        .unwrap();

    // out of range values are rejected before touching the note
    for value in [0, 6, -1] {
        let body = post_rating(&bob_client, &base_url, note.id, value).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("Invalid rating"));
    }

    let body = post_rating(&bob_client, &base_url, 9999, 4).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Note not found"));

    let body = post_rating(&bob_client, &base_url, note.id, 4).await;
    info!("Rating response: {:#?}", body);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["rating"], json!("4.0"));
    assert_eq!(body["ratingCount"], json!(1));

    let body = post_rating(&bob_client, &base_url, note.id, 5).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("You already rated this note"));

    let alice_client = browser_client().unwrap();
    login_user(&alice_client, &base_url, "alice@example.com", "correcthorse")
        .await
        .unwrap();
    let body = post_rating(&alice_client, &base_url, note.id, 5).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("You cannot rate your own note"));
}
