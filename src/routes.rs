use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, HOST,
        },
        HeaderMap, HeaderValue, Method, StatusCode,
    },
    response::{Html, IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::config::FeedConfig;
use crate::db::{ArticleStore, NewArticle, StoreError};
use crate::feed::{error_document, render_feed, FEED_ITEM_LIMIT};

pub const DEFAULT_TITLE: &str = "Untitled";

const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";
const FEED_CACHE_CONTROL: &str = "s-maxage=60, stale-while-revalidate";

/// Largest add-article body read once the caller is authorized.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub struct AppState {
    pub store: Arc<dyn ArticleStore>,
    /// `None` means writes are refused outright.
    pub api_key: Option<String>,
    pub feed: FeedConfig,
}

pub fn router(state: Arc<AppState>) -> Router {
    let feed_path = state.feed.path.clone();

    Router::new()
        .route("/api/add-article", any(add_article))
        .route(&feed_path, get(rss_feed).options(preflight))
        .route("/health", get(health))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Ingestion errors, rendered as `{"error": "..."}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("Method not allowed")]
    MethodNotAllowed(Method),
    #[error("Request body too large")]
    BodyTooLarge(#[source] axum::Error),
    #[error("Invalid JSON in request body")]
    InvalidJson(#[source] serde_json::Error),
    #[error("URL is required")]
    MissingUrl,
    #[error("Failed to add article")]
    Storage(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidJson(_) | ApiError::MissingUrl => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Storage(e) => error!("Failed to add article: {}", e),
            ApiError::InvalidJson(e) => warn!("Rejected add-article request: {}: {}", self, e),
            ApiError::BodyTooLarge(e) => warn!("Rejected add-article request: {}: {}", self, e),
            ApiError::MethodNotAllowed(method) => {
                warn!("Rejected add-article request with method {}", method)
            }
            _ => warn!("Rejected add-article request: {}", self),
        }

        let body = Json(json!({ "error": self.to_string() }));
        match self {
            ApiError::MethodNotAllowed(_) => (
                StatusCode::METHOD_NOT_ALLOWED,
                [(ALLOW, "POST, OPTIONS")],
                body,
            )
                .into_response(),
            other => (other.status(), body).into_response(),
        }
    }
}

// Feed errors. Readers expect XML, so the body is a small XML stub instead of JSON.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("failed to load articles: {0}")]
    Storage(#[from] StoreError),
    #[error("failed to render feed: {0}")]
    Render(#[from] askama::Error),
}

impl IntoResponse for FeedError {
    fn into_response(self) -> Response {
        error!("Error generating RSS feed: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(CONTENT_TYPE, "application/xml")],
            error_document(),
        )
            .into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AddArticleRequest {
    pub url: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
}

impl AddArticleRequest {
    /// Reject a missing or empty url and fill in the defaults for the rest.
    pub fn into_new_article(self) -> Result<NewArticle, ApiError> {
        let url = self
            .url
            .filter(|u| !u.is_empty())
            .ok_or(ApiError::MissingUrl)?;

        Ok(NewArticle {
            url,
            title: self
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            content: self.content.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AddArticleResponse {
    pub message: &'static str,
    pub article: ArticleEcho,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleEcho {
    pub id: String,
    pub url: String,
    pub title: String,
    pub content: String,
    /// Approximate; the store assigns the real timestamp itself.
    pub created_at: String,
}

/// Check the `Authorization: Bearer <key>` header against the configured key.
pub fn authorize(expected: Option<&str>, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = expected.filter(|k| !k.is_empty()) else {
        return Err(ApiError::Unauthorized);
    };

    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    if provided != expected {
        return Err(ApiError::InvalidApiKey);
    }

    Ok(())
}

// Route handlers
pub async fn add_article(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    if method == Method::OPTIONS {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    if method != Method::POST {
        return Err(ApiError::MethodNotAllowed(method));
    }

    // The body is not even read until the caller is authorized.
    authorize(state.api_key.as_deref(), &headers)?;

    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(ApiError::BodyTooLarge)?;
    let request: AddArticleRequest =
        serde_json::from_slice(&body).map_err(ApiError::InvalidJson)?;
    let article = request.into_new_article()?;

    let stored = state.store.add(article).await?;
    info!("Added article {} ({})", stored.id, stored.article.url);

    let response = AddArticleResponse {
        message: "Article added",
        article: ArticleEcho {
            id: stored.id,
            url: stored.article.url,
            title: stored.article.title,
            content: stored.article.content,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        },
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

pub async fn rss_feed(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, FeedError> {
    let host = headers.get(HOST).and_then(|value| value.to_str().ok());

    let articles = state.store.recent(FEED_ITEM_LIMIT).await?;
    let xml = render_feed(&state.feed, host, &articles, Utc::now())?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, RSS_CONTENT_TYPE), (CACHE_CONTROL, FEED_CACHE_CONTROL)],
        xml,
    )
        .into_response())
}

pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
