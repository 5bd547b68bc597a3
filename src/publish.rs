use crate::config::PublishConfig;
use crate::error::{AppError, Result};
use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("meuflix/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ContentsFile {
    sha: String,
}

#[derive(Debug, Serialize)]
struct ContentsUpdate<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct ContentsUpdateResponse {
    commit: Option<CommitInfo>,
}

#[derive(Debug, Deserialize)]
struct CommitInfo {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GithubError {
    message: String,
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// True when the file did not exist before.
    pub created: bool,
    pub commit_sha: Option<String>,
}

/// Commits the document to one file through the GitHub Contents API.
#[derive(Clone)]
pub struct GithubPublisher {
    client: Client,
    config: PublishConfig,
}

impl GithubPublisher {
    pub fn new(config: &PublishConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build GitHub HTTP client")?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn target(&self) -> String {
        format!(
            "{}/{}:{} ({})",
            self.config.owner, self.config.repo, self.config.path, self.config.branch
        )
    }

    fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            self.config.path
        )
    }

    fn authorized(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .header("Authorization", format!("token {}", token))
            .header("Accept", "application/vnd.github.v3+json")
    }

    /// Current blob sha of the target file, `None` when it does not exist.
    async fn current_sha(&self, token: &str) -> Result<Option<String>> {
        let response = self
            .authorized(self.client.get(self.contents_url()), token)
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await
            .context("Failed to reach GitHub")?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let file: ContentsFile = response
                    .json()
                    .await
                    .context("Failed to parse GitHub file metadata")?;
                Ok(Some(file.sha))
            }
            status => Err(github_error("Failed to fetch the file", status, response).await),
        }
    }

    /// Creates or updates the target file with `content`.
    pub async fn publish(&self, token: &str, content: &str) -> Result<PublishReceipt> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::BadRequest(
                "A GitHub token is required to publish".to_string(),
            ));
        }

        let sha = self.current_sha(token).await?;
        let created = sha.is_none();

        let body = ContentsUpdate {
            message: &self.config.commit_message,
            content: STANDARD.encode(content.as_bytes()),
            sha,
            branch: &self.config.branch,
        };

        let response = self
            .authorized(self.client.put(self.contents_url()), token)
            .json(&body)
            .send()
            .await
            .context("Failed to reach GitHub")?;

        let status = response.status();
        if !status.is_success() {
            return Err(github_error("Failed to publish", status, response).await);
        }

        let update: ContentsUpdateResponse = response
            .json()
            .await
            .context("Failed to parse GitHub publish response")?;

        let receipt = PublishReceipt {
            created,
            commit_sha: update.commit.map(|c| c.sha),
        };
        tracing::info!(
            "Published document to {} (created: {}, commit: {:?})",
            self.target(),
            receipt.created,
            receipt.commit_sha
        );
        Ok(receipt)
    }
}

/// Surfaces GitHub's `message` field, or the status when the body has none.
async fn github_error(context: &str, status: StatusCode, response: reqwest::Response) -> AppError {
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GithubError>(&text)
        .map(|e| e.message)
        .unwrap_or_else(|_| status.to_string());
    tracing::warn!("GitHub request failed: {} - {}", status, text);
    AppError::Publish(format!("{}: {}", context, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::get,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeGithub {
        existing_sha: Option<String>,
        puts: Arc<Mutex<Vec<Value>>>,
        reject_put: bool,
    }

    async fn fake_get(State(fake): State<FakeGithub>, headers: HeaderMap) -> (AxumStatus, Json<Value>) {
        if headers.get("authorization").and_then(|h| h.to_str().ok()) != Some("token secret") {
            return (AxumStatus::UNAUTHORIZED, Json(json!({ "message": "Bad credentials" })));
        }
        match &fake.existing_sha {
            Some(sha) => (AxumStatus::OK, Json(json!({ "sha": sha, "content": "" }))),
            None => (AxumStatus::NOT_FOUND, Json(json!({ "message": "Not Found" }))),
        }
    }

    async fn fake_put(State(fake): State<FakeGithub>, Json(body): Json<Value>) -> (AxumStatus, Json<Value>) {
        if fake.reject_put {
            return (
                AxumStatus::CONFLICT,
                Json(json!({ "message": "is at 123 but expected 456" })),
            );
        }
        fake.puts.lock().unwrap().push(body);
        (
            AxumStatus::OK,
            Json(json!({ "content": { "sha": "newblob" }, "commit": { "sha": "c0ffee" } })),
        )
    }

    async fn publisher_for(fake: FakeGithub) -> GithubPublisher {
        let router = Router::new()
            .route(
                "/repos/:owner/:repo/contents/*path",
                get(fake_get).put(fake_put),
            )
            .with_state(fake);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        GithubPublisher::new(&PublishConfig {
            api_base: format!("http://{}", addr),
            ..PublishConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_is_created_without_sha() {
        let fake = FakeGithub::default();
        let puts = fake.puts.clone();
        let publisher = publisher_for(fake).await;

        let receipt = publisher.publish("secret", "{\"a\":\"ção\"}").await.unwrap();
        assert!(receipt.created);
        assert_eq!(receipt.commit_sha.as_deref(), Some("c0ffee"));

        let puts = puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        assert!(puts[0].get("sha").is_none());
        assert_eq!(puts[0]["branch"], "main");
        let decoded = STANDARD.decode(puts[0]["content"].as_str().unwrap()).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "{\"a\":\"ção\"}");
    }

    #[tokio::test]
    async fn test_existing_file_sends_its_sha() {
        let fake = FakeGithub {
            existing_sha: Some("abc123".to_string()),
            ..FakeGithub::default()
        };
        let puts = fake.puts.clone();
        let publisher = publisher_for(fake).await;

        let receipt = publisher.publish("secret", "{}").await.unwrap();
        assert!(!receipt.created);
        assert_eq!(puts.lock().unwrap()[0]["sha"], "abc123");
    }

    #[tokio::test]
    async fn test_github_message_is_surfaced() {
        let publisher = publisher_for(FakeGithub::default()).await;
        let err = publisher.publish("wrong", "{}").await.unwrap_err();
        assert!(matches!(err, AppError::Publish(_)));
        assert!(err.to_string().contains("Bad credentials"));

        let publisher = publisher_for(FakeGithub {
            existing_sha: Some("abc".to_string()),
            reject_put: true,
            ..FakeGithub::default()
        })
        .await;
        let err = publisher.publish("secret", "{}").await.unwrap_err();
        assert!(err.to_string().contains("expected 456"));
    }

    #[tokio::test]
    async fn test_empty_token_is_rejected() {
        let publisher = GithubPublisher::new(&PublishConfig::default()).unwrap();
        assert!(matches!(
            publisher.publish("  ", "{}").await,
            Err(AppError::BadRequest(_))
        ));
    }
}
