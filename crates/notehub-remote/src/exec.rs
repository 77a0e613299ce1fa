use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::RemoteResult;

#[derive(Debug, Serialize)]
struct Submission<'a> {
    language_id: u32,
    source_code: &'a str,
    stdin: &'a str,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStatus {
    pub id: Option<i64>,
    pub description: Option<String>,
}

/// Result of one submission. Serialized back to API clients as is,
/// which is why the field names stay in the executor's convention.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOutcome {
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub status: Option<RunStatus>,
}

/// Client for a Judge0 compatible code execution service. Submissions
/// are synchronous (wait=true), the sandbox limits run time.
#[derive(Clone)]
pub struct ExecClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl ExecClient {
    pub fn new(base_url: Url, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    pub async fn run(&self, language_id: u32, code: &str, stdin: &str) -> RemoteResult<RunOutcome> {
        let mut url = self.base_url.join("submissions")?;
        url.query_pairs_mut()
            .append_pair("base64_encoded", "false")
            .append_pair("wait", "true");

        let mut request = self.client.post(url).json(&Submission {
            language_id,
            source_code: code,
            stdin,
        });
        if let Some(key) = &self.api_key {
            request = request.header("X-RapidAPI-Key", key);
            if let Some(host) = self.base_url.host_str() {
                request = request.header("X-RapidAPI-Host", host);
            }
        }

        let outcome: RunOutcome = request.send().await?.error_for_status()?.json().await?;
        debug!(
            "Execution finished with status {:?}",
            outcome.status.as_ref().and_then(|s| s.description.as_deref())
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_roundtrip() {
        let outcome: RunOutcome = serde_json::from_str(
            r#"{"stdout": "42\n", "stderr": null, "status": {"id": 3, "description": "Accepted"}}"#,
        )
        .unwrap();
        assert_eq!(outcome.stdout.as_deref(), Some("42\n"));
        assert!(outcome.stderr.is_none());
        assert_eq!(
            outcome.status.as_ref().and_then(|s| s.id),
            Some(3)
        );

        // missing keys serialize back as explicit nulls for API clients
        let value = serde_json::to_value(&outcome).unwrap();
        assert!(value.get("compile_output").unwrap().is_null());
    }

    #[test]
    fn test_outcome_tolerates_extra_fields() {
        let outcome: RunOutcome = serde_json::from_str(
            r#"{"stdout": "hi", "token": "abc", "time": "0.002", "memory": 376}"#,
        )
        .unwrap();
        assert_eq!(outcome.stdout.as_deref(), Some("hi"));
    }
}
