use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::error::{RemoteError, RemoteResult};

/// Pulls the first candidate's text out of a generative language API
/// response. Returns None when the model produced no usable candidate
/// (safety block, empty response and similar).
pub fn first_candidate_text(response: &Value) -> Option<String> {
    response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(|s| s.to_string())
}

/// Client for a Gemini style generative language endpoint. Stateless,
/// each question is a single-turn conversation.
#[derive(Clone)]
pub struct GenAiClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl GenAiClient {
    pub fn new(endpoint: Url, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }

    pub async fn ask(&self, message: &str) -> RemoteResult<Option<String>> {
        let key = self.api_key.as_ref().ok_or(RemoteError::NotConfigured)?;
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("key", key);

        let payload = json!({
            "contents": [{"parts": [{"text": message}]}]
        });
        let response: Value = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let text = first_candidate_text(&response);
        debug!("Model answered: {}", text.is_some());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_extraction() {
        let response = json!({
            "candidates": [
                {"content": {"parts": [{"text": "Rust is a systems language."}]}}
            ]
        });
        assert_eq!(
            first_candidate_text(&response).as_deref(),
            Some("Rust is a systems language.")
        );
    }

    #[test]
    fn test_candidate_extraction_empty() {
        assert!(first_candidate_text(&json!({})).is_none());
        assert!(first_candidate_text(&json!({"candidates": []})).is_none());
        assert!(first_candidate_text(&json!({
            "candidates": [{"content": {"parts": []}}]
        }))
        .is_none());
        // safety-blocked answers have no content at all
        assert!(first_candidate_text(&json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .is_none());
    }
}
