use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::config::GithubConfig;

const GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("image host is not configured")]
    NotConfigured,

    #[error("image upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("image host rejected upload: {status}, response: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait ImageUploader: Send + Sync {
    /// Stores `content` under `file_name` and returns its public URL.
    async fn upload(&self, file_name: &str, content: &[u8]) -> Result<String, UploadError>;
}

/// Commits files into a GitHub repository through the contents API and
/// serves them from raw.githubusercontent.com.
pub struct GithubUploader {
    client: reqwest::Client,
    config: GithubConfig,
    api_base: String,
}

impl GithubUploader {
    pub fn new(config: GithubConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("elfume/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            config,
            api_base: GITHUB_API.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn contents_url(&self, file_name: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{file_name}",
            self.api_base, self.config.owner, self.config.repo
        )
    }

    pub fn public_url(&self, file_name: &str) -> String {
        format!(
            "https://raw.githubusercontent.com/{}/{}/main/{file_name}",
            self.config.owner, self.config.repo
        )
    }
}

#[async_trait]
impl ImageUploader for GithubUploader {
    async fn upload(&self, file_name: &str, content: &[u8]) -> Result<String, UploadError> {
        let body = json!({
            "message": format!("Upload file image {file_name}"),
            "content": STANDARD.encode(content),
        });

        let resp = self
            .client
            .put(self.contents_url(file_name))
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::CREATED {
            let body = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(1024)
                .collect::<String>();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(file_name, "Image uploaded");
        Ok(self.public_url(file_name))
    }
}
