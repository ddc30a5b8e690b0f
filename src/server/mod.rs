//! HTTP server: home page, post pages and comment intake

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::json;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::cache::PageCache;
use crate::comments::{self, CommentDraft, CommentFlow, CommentIntake, SubmissionState};
use crate::config::SiteConfig;
use crate::content::{ContentError, ContentSource, Post};
use crate::views::Views;
use crate::Site;

/// Shared state behind every handler
pub struct AppState {
    config: SiteConfig,
    views: Views,
    source: Arc<dyn ContentSource>,
    intake: Arc<dyn CommentIntake>,
    cache: PageCache,
    /// Drafts whose intake request has not finished yet
    pending: Mutex<HashSet<CommentDraft>>,
}

impl AppState {
    /// Wire up the configured content source and comment intake
    pub fn new(site: &Site) -> Result<Self> {
        let source = site.content_source()?;
        let intake = comments::open_intake(&site.config, source.clone())?;
        Self::with_parts(&site.config, source, intake)
    }

    pub fn with_parts(
        config: &SiteConfig,
        source: Arc<dyn ContentSource>,
        intake: Arc<dyn CommentIntake>,
    ) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            views: Views::new(config)?,
            source,
            intake,
            cache: PageCache::new(Duration::from_secs(config.server.revalidate_secs)),
            pending: Mutex::new(HashSet::new()),
        })
    }

    /// Claim `draft` for submission; `None` while the same draft is in flight
    fn claim(&self, draft: &CommentDraft) -> Option<PendingGuard<'_>> {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if pending.insert(draft.clone()) {
            Some(PendingGuard {
                state: self,
                draft: draft.clone(),
            })
        } else {
            None
        }
    }
}

/// Releases a claimed draft when the request finishes or is dropped
struct PendingGuard<'a> {
    state: &'a AppState,
    draft: CommentDraft,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.state
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.draft);
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>, static_dir: &std::path::Path) -> Router {
    let root = state.config.root.trim_end_matches('/').to_string();

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/post/:slug", get(post_handler))
        .route("/post/:slug/comment", post(comment_form_handler))
        .route("/api/createComment", post(create_comment_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state);

    let app = if root.is_empty() {
        app
    } else {
        Router::new().nest(&root, app)
    };

    app.layer(TraceLayer::new_for_http())
}

/// Start the server
pub async fn start(site: &Site, ip: &str, port: u16) -> Result<()> {
    let state = Arc::new(AppState::new(site)?);
    let app = router(state, &site.base_dir.join("static"));

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn render_error(e: anyhow::Error) -> Response {
    tracing::error!("Render failed: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

fn content_error(e: ContentError) -> Response {
    tracing::error!("Content store error: {}", e);
    (StatusCode::BAD_GATEWAY, "Content store unavailable").into_response()
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    if let Some(html) = state.cache.get("/").await {
        return Html(html).into_response();
    }

    let summaries = match state.source.fetch_post_summaries().await {
        Ok(summaries) => summaries,
        Err(e) => return content_error(e),
    };

    match state.views.render_index(&summaries) {
        Ok(html) => {
            state.cache.insert("/", &html).await;
            Html(html).into_response()
        }
        Err(e) => render_error(e),
    }
}

/// Fetch a post or produce the 404 page
async fn load_post(state: &AppState, slug: &str) -> Result<Post, Response> {
    match state.source.fetch_post_by_slug(slug).await {
        Ok(Some(post)) => Ok(post),
        Ok(None) => {
            tracing::debug!("No post with slug {:?}", slug);
            Err(match state.views.render_not_found(slug) {
                Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
                Err(e) => render_error(e),
            })
        }
        Err(e) => Err(content_error(e)),
    }
}

async fn post_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Response {
    let key = format!("/post/{}", slug);
    if let Some(html) = state.cache.get(&key).await {
        return Html(html).into_response();
    }

    let post = match load_post(&state, &slug).await {
        Ok(post) => post,
        Err(response) => return response,
    };

    let flow = CommentFlow::new(&post.id, state.config.comments.acceptance);
    match state.views.render_post(&post, &flow) {
        Ok(html) => {
            state.cache.insert(&key, &html).await;
            Html(html).into_response()
        }
        Err(e) => render_error(e),
    }
}

/// Form submission from the post page
///
/// Each request runs its own [`CommentFlow`]. Resubmitting a draft that is
/// still in flight (a double click, a reload mid-request) is refused with
/// 409 before it reaches the intake.
async fn comment_form_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Form(mut draft): Form<CommentDraft>,
) -> Response {
    let post = match load_post(&state, &slug).await {
        Ok(post) => post,
        Err(response) => return response,
    };
    // the post id is fixed by the page, not by the submitted field
    draft.post_id = post.id.clone();

    let Some(_claim) = state.claim(&draft) else {
        tracing::warn!("Comment for post {} is already being submitted", post.id);
        return (StatusCode::CONFLICT, "Comment is already being submitted").into_response();
    };

    let mut flow = CommentFlow::with_draft(draft, state.config.comments.acceptance);
    let status = match flow.submit(state.intake.as_ref()).await {
        Ok(SubmissionState::Accepted) => StatusCode::OK,
        Ok(SubmissionState::Failed) => StatusCode::BAD_GATEWAY,
        Ok(_) => StatusCode::UNPROCESSABLE_ENTITY,
        // a fresh flow starts Idle
        Err(e) => {
            tracing::warn!("Rejected comment submission: {}", e);
            StatusCode::CONFLICT
        }
    };

    match state.views.render_post(&post, &flow) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => render_error(e),
    }
}

/// JSON intake: stores an unapproved comment
///
/// The body is parsed as JSON whatever its content type, so plain
/// `fetch(url, { body: JSON.stringify(data) })` callers work.
async fn create_comment_handler(State(state): State<Arc<AppState>>, body: String) -> Response {
    let draft: CommentDraft = match serde_json::from_str(&body) {
        Ok(draft) => draft,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Invalid comment", "error": e.to_string() })),
            )
                .into_response()
        }
    };

    let errors = draft.validate();
    if draft.post_id.is_empty() || errors.any() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Invalid comment", "errors": errors })),
        )
            .into_response();
    }

    match state.source.create_comment(&draft).await {
        Ok(id) => (
            StatusCode::OK,
            Json(json!({ "message": "Comment submitted", "id": id })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Couldn't submit comment: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Couldn't submit comment", "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
