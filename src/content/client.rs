//! Content store client
//!
//! [`ContentSource`] is the read/write surface the views and the comment
//! intake depend on. [`SanityClient`] talks to the hosted HTTP API;
//! [`super::FixtureSource`] serves a local dataset.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::model::{Post, PostSummary, Slug};
use super::queries;
use crate::comments::CommentDraft;
use crate::config::ContentConfig;

/// Errors talking to the content store
///
/// A missing post is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("content store answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode content store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("content store is not configured: {0}")]
    Config(String),

    #[error("failed to read dataset {path:?}: {source}")]
    Dataset {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no write token configured, cannot create documents")]
    MissingToken,
}

/// Read queries plus the one write the site performs
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Every post, projected for the list view
    async fn fetch_post_summaries(&self) -> Result<Vec<PostSummary>, ContentError>;

    /// Every post's slug
    async fn fetch_post_slugs(&self) -> Result<Vec<Slug>, ContentError>;

    /// One post with its approved comments, `None` when no post has `slug`
    async fn fetch_post_by_slug(&self, slug: &str) -> Result<Option<Post>, ContentError>;

    /// Store an unapproved comment; returns the new document id
    async fn create_comment(&self, draft: &CommentDraft) -> Result<String, ContentError>;
}

#[derive(Deserialize)]
struct QueryResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct SlugEntry {
    #[serde(default)]
    slug: Option<Slug>,
}

#[derive(Deserialize)]
struct MutationResponse {
    #[serde(rename = "transactionId", default)]
    transaction_id: String,
    #[serde(default)]
    results: Vec<MutationResult>,
}

#[derive(Deserialize)]
struct MutationResult {
    id: String,
}

/// Keep only slugs that are present and non-empty
pub(crate) fn collect_slugs<I>(slugs: I) -> Vec<Slug>
where
    I: IntoIterator<Item = Option<Slug>>,
{
    slugs
        .into_iter()
        .flatten()
        .filter(|slug| !slug.current.is_empty())
        .collect()
}

/// HTTP client for the hosted content API
pub struct SanityClient {
    http: reqwest::Client,
    query_url: String,
    mutate_url: String,
    token: Option<String>,
}

impl SanityClient {
    /// Build a client from the `content` config section
    pub fn new(config: &ContentConfig) -> Result<Self, ContentError> {
        let (query_host, mutate_host) = match &config.api_host {
            Some(host) => {
                let host = host.trim_end_matches('/').to_string();
                (host.clone(), host)
            }
            None => {
                if config.project_id.is_empty() {
                    return Err(ContentError::Config(
                        "content.project_id is empty".to_string(),
                    ));
                }
                let api = format!("https://{}.api.sanity.io", config.project_id);
                // the CDN only serves unauthenticated reads
                let query = if config.use_cdn && config.token.is_none() {
                    format!("https://{}.apicdn.sanity.io", config.project_id)
                } else {
                    api.clone()
                };
                (query, api)
            }
        };

        let version = config.api_version.trim_start_matches('v');
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            http,
            query_url: format!("{}/v{}/data/query/{}", query_host, version, config.dataset),
            mutate_url: format!("{}/v{}/data/mutate/{}", mutate_host, version, config.dataset),
            token: config.token.clone(),
        })
    }

    /// Run a query and decode its `result`
    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ContentError> {
        let mut pairs: Vec<(String, String)> = vec![("query".to_string(), query.to_string())];
        for (name, value) in params {
            // query parameters are JSON literals
            pairs.push((format!("${}", name), serde_json::to_string(value)?));
        }

        let mut request = self.http.get(&self.query_url).query(&pairs);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        tracing::debug!("Querying content store: {}", first_line(query));
        let response = request.send().await?;
        let body = read_body(response).await?;
        let decoded: QueryResponse<T> = serde_json::from_str(&body)?;
        Ok(decoded.result)
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, ContentError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        tracing::warn!("Content store answered {}", status);
        return Err(ContentError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Unslugged documents (drafts) have no detail route and stay off the list
fn has_slug(entry: &serde_json::Value) -> bool {
    entry
        .get("slug")
        .and_then(|slug| slug.get("current"))
        .and_then(serde_json::Value::as_str)
        .is_some_and(|current| !current.is_empty())
}

fn first_line(query: &str) -> &str {
    query.lines().next().unwrap_or_default()
}

#[async_trait]
impl ContentSource for SanityClient {
    async fn fetch_post_summaries(&self) -> Result<Vec<PostSummary>, ContentError> {
        let entries: Vec<serde_json::Value> = self.query(queries::POST_SUMMARIES, &[]).await?;
        let summaries = entries
            .into_iter()
            .filter(has_slug)
            .map(serde_json::from_value)
            .collect::<Result<Vec<PostSummary>, _>>()?;
        Ok(summaries)
    }

    async fn fetch_post_slugs(&self) -> Result<Vec<Slug>, ContentError> {
        let entries: Vec<SlugEntry> = self.query(queries::POST_SLUGS, &[]).await?;
        Ok(collect_slugs(entries.into_iter().map(|e| e.slug)))
    }

    async fn fetch_post_by_slug(&self, slug: &str) -> Result<Option<Post>, ContentError> {
        if slug.is_empty() {
            return Ok(None);
        }
        self.query(queries::POST_BY_SLUG, &[("slug", slug)]).await
    }

    async fn create_comment(&self, draft: &CommentDraft) -> Result<String, ContentError> {
        let token = self.token.as_ref().ok_or(ContentError::MissingToken)?;

        let mutation = serde_json::json!({
            "mutations": [{
                "create": {
                    "_type": "comment",
                    "post": { "_type": "reference", "_ref": draft.post_id },
                    "name": draft.name,
                    "email": draft.email,
                    "comment": draft.comment,
                    "approved": false
                }
            }]
        });

        let response = self
            .http
            .post(&self.mutate_url)
            .query(&[("returnIds", "true")])
            .bearer_auth(token)
            .json(&mutation)
            .send()
            .await?;
        let body = read_body(response).await?;
        let decoded: MutationResponse = serde_json::from_str(&body)?;

        let id = decoded
            .results
            .into_iter()
            .next()
            .map(|r| r.id)
            .unwrap_or(decoded.transaction_id);
        tracing::info!("Created comment {} for post {}", id, draft.post_id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, token: Option<&str>) -> ContentConfig {
        ContentConfig {
            project_id: "proj".to_string(),
            api_host: Some(server.uri()),
            token: token.map(str::to_string),
            ..Default::default()
        }
    }

    const QUERY_PATH: &str = "/v2021-10-21/data/query/production";

    #[test]
    fn test_hosts_from_project_id() {
        let mut config = ContentConfig {
            project_id: "proj".to_string(),
            ..Default::default()
        };
        let client = SanityClient::new(&config).unwrap();
        assert_eq!(
            client.query_url,
            "https://proj.apicdn.sanity.io/v2021-10-21/data/query/production"
        );
        assert_eq!(
            client.mutate_url,
            "https://proj.api.sanity.io/v2021-10-21/data/mutate/production"
        );

        config.token = Some("t".to_string());
        let client = SanityClient::new(&config).unwrap();
        assert!(client.query_url.starts_with("https://proj.api.sanity.io/"));
    }

    #[test]
    fn test_missing_project_id() {
        let result = SanityClient::new(&ContentConfig::default());
        assert!(matches!(result, Err(ContentError::Config(_))));
    }

    #[tokio::test]
    async fn test_fetch_slugs_skips_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(QUERY_PATH))
            .and(query_param("query", queries::POST_SLUGS))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    { "_id": "a", "slug": { "current": "my-meme" } },
                    { "_id": "b", "slug": null },
                    { "_id": "c", "slug": { "current": "" } }
                ]
            })))
            .mount(&server)
            .await;

        let client = SanityClient::new(&config(&server, None)).unwrap();
        let slugs = client.fetch_post_slugs().await.unwrap();
        assert_eq!(slugs, vec![Slug::new("my-meme")]);
    }

    #[tokio::test]
    async fn test_fetch_summaries_drops_unslugged_posts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(QUERY_PATH))
            .and(query_param("query", queries::POST_SUMMARIES))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    { "_id": "a", "title": "My meme", "slug": { "current": "my-meme" } },
                    { "_id": "drafts.b", "title": "Draft", "slug": null },
                    { "_id": "c", "title": "Blank", "slug": { "current": "" } },
                    { "_id": "d", "title": "Bare" }
                ]
            })))
            .mount(&server)
            .await;

        let client = SanityClient::new(&config(&server, None)).unwrap();
        let summaries = client.fetch_post_summaries().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, "a");
        assert_eq!(summaries[0].slug, Slug::new("my-meme"));
    }

    #[tokio::test]
    async fn test_fetch_post_by_slug_sends_json_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(QUERY_PATH))
            .and(query_param("$slug", "\"my-meme\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "_id": "post-1",
                    "title": "My meme",
                    "slug": { "current": "my-meme" },
                    "_createdAt": "2022-03-04T10:20:30Z",
                    "body": [],
                    "comments": []
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(QUERY_PATH))
            .and(query_param("$slug", "\"nope\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": null })))
            .mount(&server)
            .await;

        let client = SanityClient::new(&config(&server, None)).unwrap();
        let post = client.fetch_post_by_slug("my-meme").await.unwrap().unwrap();
        assert_eq!(post.slug.as_str(), "my-meme");
        assert!(client.fetch_post_by_slug("nope").await.unwrap().is_none());
        assert!(client.fetch_post_by_slug("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(QUERY_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = SanityClient::new(&config(&server, None)).unwrap();
        match client.fetch_post_summaries().await {
            Err(ContentError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected status error, got {:?}", other.map(|v| v.len())),
        }
    }

    #[tokio::test]
    async fn test_create_comment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2021-10-21/data/mutate/production"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({
                "mutations": [{ "create": {
                    "_type": "comment",
                    "post": { "_ref": "post-1" },
                    "approved": false
                }}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "transactionId": "tx1",
                "results": [{ "id": "comment-9", "operation": "create" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SanityClient::new(&config(&server, Some("secret"))).unwrap();
        let draft = CommentDraft {
            post_id: "post-1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            comment: "nice".to_string(),
        };
        assert_eq!(client.create_comment(&draft).await.unwrap(), "comment-9");
    }

    #[tokio::test]
    async fn test_create_comment_needs_token() {
        let server = MockServer::start().await;
        let client = SanityClient::new(&config(&server, None)).unwrap();
        let result = client.create_comment(&CommentDraft::for_post("post-1")).await;
        assert!(matches!(result, Err(ContentError::MissingToken)));
    }
}
