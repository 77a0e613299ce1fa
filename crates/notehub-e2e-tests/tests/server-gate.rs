use notehub_dal::user::{CreateUser, UserRepository};
use notehub_e2e_tests::{
    browser_client, location_header, login_user, prepare_env, spawn_server, ADMIN_PASSWORD,
    ADMIN_USER,
};
use tracing::info;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_gated_routes_redirect_to_login() {
    let (config, state, _config_guard) = prepare_env("test_gate_redirects").await.unwrap();
    let base_url = config.base_url.clone();
    spawn_server(config, state).await.unwrap();

    let client = browser_client().unwrap();

    for path in ["notes", "upload", "my-codes", "download/1", "view/1"] {
        let response = client
            .get(base_url.join(path).unwrap())
            .send()
            .await
            .unwrap();
        info!("Response for {path}: {:#?}", response);
        assert!(response.status().is_redirection(), "{path} must redirect");
        assert_eq!(location_header(&response), "/login");
    }

    for path in ["admin/dashboard", "admin/manage-notes", "admin/reports"] {
        let response = client
            .get(base_url.join(path).unwrap())
            .send()
            .await
            .unwrap();
        assert!(response.status().is_redirection(), "{path} must redirect");
        assert_eq!(location_header(&response), "/admin/login");
    }
}

#[tokio::test]
#[traced_test]
async fn test_user_and_admin_sessions_independent() {
    let (config, state, _config_guard) = prepare_env("test_session_slots").await.unwrap();
    let base_url = config.base_url.clone();

    let user_registry = UserRepository::new(state.pool().clone());
    user_registry
        .create(CreateUser {
            name: "alice".to_string(),
            email: "alice@example.com".parse().unwrap(),
            password: Some("correcthorse".to_string()),
        })
        .await
        .unwrap();

    spawn_server(config, state).await.unwrap();
    let client = browser_client().unwrap();
    login_user(&client, &base_url, "alice@example.com", "correcthorse")
        .await
        .unwrap();

    // user identity alone does not open the admin panel
    let response = client
        .get(base_url.join("admin/dashboard").unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(location_header(&response), "/admin/login");

    let response = client
        .post(base_url.join("admin/login").unwrap())
        .form(&[("username", ADMIN_USER), ("password", ADMIN_PASSWORD)])
        .send()
        .await
        .unwrap();
    info!("Admin login response: {:#?}", response);
    assert!(response.status().is_redirection());
    assert_eq!(location_header(&response), "/admin/dashboard");

    let response = client
        .get(base_url.join("admin/dashboard").unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // admin logout must leave the user login intact
    let response = client
        .get(base_url.join("admin/logout").unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(location_header(&response), "/admin/login");

    let response = client
        .get(base_url.join("admin/dashboard").unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_redirection());

    let response = client
        .get(base_url.join("my-codes").unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
#[traced_test]
async fn test_admin_login_rejects_bad_credentials() {
    let (config, state, _config_guard) = prepare_env("test_admin_bad_login").await.unwrap();
    let base_url = config.base_url.clone();
    spawn_server(config, state).await.unwrap();

    let client = browser_client().unwrap();
    let response = client
        .post(base_url.join("admin/login").unwrap())
        .form(&[("username", ADMIN_USER), ("password", "nonsense")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .get(base_url.join("admin/dashboard").unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_redirection());
}
