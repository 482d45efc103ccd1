use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("execution request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("execution provider returned {status}: {body}")]
    Upstream { status: u16, body: String },
}

/// Remote code runner. Takes source text and a language tag, returns the
/// program output.
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    async fn execute(&self, code: &str, language: &str) -> Result<Option<String>, ExecutionError>;
}

/// Map an editor language tag to the provider's language name.
pub fn provider_language(language: &str) -> Option<&'static str> {
    let name = match language.to_lowercase().as_str() {
        "javascript" => "nodejs",
        "python" => "python3",
        "java" => "java",
        "cpp" => "cpp17",
        "csharp" => "csharp",
        "ruby" => "ruby",
        "php" => "php",
        "go" => "go",
        "rust" => "rust",
        _ => return None,
    };
    Some(name)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest<'a> {
    script: &'a str,
    language: &'a str,
    version_index: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    output: Option<String>,
}

/// Client for the JDoodle execution API
#[derive(Debug)]
pub struct JdoodleClient {
    client: Client,
    api_url: String,
    client_id: String,
    client_secret: String,
}

impl JdoodleClient {
    pub fn new(
        api_url: String,
        client_id: String,
        client_secret: String,
        timeout: Duration,
    ) -> Result<Self, ExecutionError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url,
            client_id,
            client_secret,
        })
    }
}

#[async_trait]
impl CodeExecutor for JdoodleClient {
    async fn execute(&self, code: &str, language: &str) -> Result<Option<String>, ExecutionError> {
        let provider_language = provider_language(language)
            .ok_or_else(|| ExecutionError::UnsupportedLanguage(language.to_string()))?;

        info!("Executing {} bytes of {} code", code.len(), language);
        let response = self
            .client
            .post(&self.api_url)
            .json(&ExecuteRequest {
                script: code,
                language: provider_language,
                version_index: "0",
                client_id: &self.client_id,
                client_secret: &self.client_secret,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Execution provider returned {}: {}", status, body);
            return Err(ExecutionError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body: ExecuteResponse = response.json().await?;
        Ok(body.output)
    }
}
