//! Comment intake endpoints

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::form::CommentDraft;
use crate::content::{ContentError, ContentSource};

/// The request never completed
#[derive(Debug, Error)]
#[error("comment intake request failed: {0}")]
pub struct IntakeError(pub String);

/// What a completed intake request answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeResponse {
    pub status: u16,
}

impl IntakeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Somewhere a comment can be handed over for moderation
#[async_trait]
pub trait CommentIntake: Send + Sync {
    /// Send one draft; `Err` only for transport failures
    async fn send(&self, draft: &CommentDraft) -> Result<IntakeResponse, IntakeError>;
}

/// Posts drafts as JSON to a remote intake URL
pub struct HttpCommentIntake {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpCommentIntake {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, IntakeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntakeError(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl CommentIntake for HttpCommentIntake {
    async fn send(&self, draft: &CommentDraft) -> Result<IntakeResponse, IntakeError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(draft)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Comment intake at {} unreachable: {}", self.endpoint, e);
                IntakeError(e.to_string())
            })?;

        let status = response.status().as_u16();
        tracing::debug!("Comment intake answered {}", status);
        Ok(IntakeResponse { status })
    }
}

/// Writes drafts straight into the content store
pub struct StoreIntake {
    source: Arc<dyn ContentSource>,
}

impl StoreIntake {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl CommentIntake for StoreIntake {
    async fn send(&self, draft: &CommentDraft) -> Result<IntakeResponse, IntakeError> {
        match self.source.create_comment(draft).await {
            Ok(_) => Ok(IntakeResponse { status: 200 }),
            Err(ContentError::Transport(e)) => Err(IntakeError(e.to_string())),
            Err(ContentError::Status { status, .. }) => Ok(IntakeResponse { status }),
            Err(e) => {
                tracing::error!("Couldn't store comment: {}", e);
                Ok(IntakeResponse { status: 500 })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::fixtures::tests::source;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn draft() -> CommentDraft {
        CommentDraft {
            post_id: "post-1".to_string(),
            name: "Ada".to_string(),
            email: "x@y.com".to_string(),
            comment: "nice".to_string(),
        }
    }

    #[tokio::test]
    async fn test_http_intake_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/createComment"))
            .and(body_json(json!({
                "_id": "post-1",
                "name": "Ada",
                "email": "x@y.com",
                "comment": "nice"
            })))
            .respond_with(ResponseTemplate::new(422))
            .expect(1)
            .mount(&server)
            .await;

        let intake = HttpCommentIntake::new(
            format!("{}/api/createComment", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();
        let response = intake.send(&draft()).await.unwrap();
        assert_eq!(response.status, 422);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_http_intake_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let intake = HttpCommentIntake::new(
            format!("http://127.0.0.1:{}/api/createComment", port),
            Duration::from_secs(2),
        )
        .unwrap();
        assert!(intake.send(&draft()).await.is_err());
    }

    #[tokio::test]
    async fn test_store_intake() {
        let intake = StoreIntake::new(Arc::new(source()));
        let response = intake.send(&draft()).await.unwrap();
        assert!(response.is_success());
    }
}
