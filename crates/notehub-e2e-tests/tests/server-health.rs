use notehub_e2e_tests::{prepare_env, spawn_server};
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_health() {
    let (config, state, _config_guard) = prepare_env("test_health").await.unwrap();
    let base_url = config.base_url.clone();
    spawn_server(config, state).await.unwrap();

    let client = reqwest::Client::new();
    let response = client
        .get(base_url.join("health").unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}
