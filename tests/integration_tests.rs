//! Integration tests for the article feed service
//!
//! These tests verify the full workflow from configuration loading
//! through the SQLite store and the HTTP surface.

use std::io::Write;
use tempfile::NamedTempFile;

mod common {
    use tempfile::TempDir;

    /// Create a temporary directory for test databases
    pub fn create_temp_dir() -> TempDir {
        tempfile::tempdir().expect("Failed to create temp directory")
    }

    /// Create a test database path
    pub fn create_db_path(temp_dir: &TempDir) -> String {
        let db_path = temp_dir.path().join("test.db");
        format!("sqlite:{}?mode=rwc", db_path.display())
    }
}

#[cfg(test)]
mod config_integration_tests {
    use super::*;
    use article_feed::config::Config;

    #[test]
    fn test_load_shipped_config() {
        let config = Config::load("feed.toml");
        assert!(config.is_ok(), "Failed to load feed.toml: {:?}", config.err());

        let config = config.unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.feed.path, "/rss.xml");
    }

    #[test]
    fn test_file_then_env() {
        let toml_content = r#"
            database_url = "sqlite:from-file.db"

            [feed]
            title = "Reading List"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path())
            .unwrap()
            .with_env(|key| match key {
                "ADD_ARTICLE_API_KEY" => Some("k".to_string()),
                _ => None,
            });

        assert_eq!(config.database_url, "sqlite:from-file.db");
        assert_eq!(config.feed.title, "Reading List");
        assert_eq!(config.api_key.as_deref(), Some("k"));
    }
}

#[cfg(test)]
mod database_integration_tests {
    use super::common::*;
    use article_feed::db::{ArticleStore, NewArticle, SqliteStore};

    fn new_article(i: usize) -> NewArticle {
        NewArticle {
            url: format!("https://article{}.example.com", i),
            title: format!("Article {}", i),
            content: format!("<p>Body {}</p>", i),
        }
    }

    #[tokio::test]
    async fn test_full_database_workflow() {
        let temp_dir = create_temp_dir();
        let db_url = create_db_path(&temp_dir);

        let db = SqliteStore::new(&db_url).await.unwrap();
        db.initialize().await.unwrap();

        for i in 1..=60 {
            db.add(new_article(i)).await.unwrap();
        }

        let recent = db.recent(50).await.unwrap();
        assert_eq!(recent.len(), 50);
        assert_eq!(recent[0].title.as_deref(), Some("Article 60"));
        assert_eq!(recent[49].title.as_deref(), Some("Article 11"));

        for pair in recent.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn test_database_persistence() {
        let temp_dir = create_temp_dir();
        let db_url = create_db_path(&temp_dir);

        {
            let db = SqliteStore::new(&db_url).await.unwrap();
            db.initialize().await.unwrap();
            db.add(new_article(1)).await.unwrap();
        }

        // Reopen without reinitializing
        {
            let db = SqliteStore::new(&db_url).await.unwrap();

            let articles = db.recent(10).await.unwrap();
            assert_eq!(articles.len(), 1);
            assert_eq!(articles[0].url.as_deref(), Some("https://article1.example.com"));
            assert_eq!(articles[0].content.as_deref(), Some("<p>Body 1</p>"));
            assert!(articles[0].created_at.get().is_some());
        }
    }

    #[tokio::test]
    async fn test_concurrent_writes() {
        let temp_dir = create_temp_dir();
        let db_url = create_db_path(&temp_dir);

        let db = SqliteStore::new(&db_url).await.unwrap();
        db.initialize().await.unwrap();
        let db = std::sync::Arc::new(db);

        let mut handles = Vec::new();
        for i in 1..=10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move { db.add(new_article(i)).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(db.recent(50).await.unwrap().len(), 10);
    }
}

#[cfg(test)]
mod end_to_end_tests {
    use super::common::*;
    use article_feed::config::FeedConfig;
    use article_feed::db::SqliteStore;
    use article_feed::routes::{router, AppState};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    const API_KEY: &str = "e2e-secret";

    async fn create_app(db_url: &str) -> axum::Router {
        let db = SqliteStore::new(db_url).await.unwrap();
        db.initialize().await.unwrap();

        router(Arc::new(AppState {
            store: Arc::new(db),
            api_key: Some(API_KEY.to_string()),
            feed: FeedConfig::default(),
        }))
    }

    fn add_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/add-article")
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", API_KEY))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_then_read_feed() {
        let temp_dir = create_temp_dir();
        let app = create_app(&create_db_path(&temp_dir)).await;

        let response = app
            .clone()
            .oneshot(add_request(
                r#"{"url":"https://blog.example.com/post?a=1&b=2","title":"Q & A","content":"<em>read me</em>"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/rss.xml")
                    .header("host", "reader.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/rss+xml; charset=utf-8"
        );
        assert_eq!(
            response.headers().get("cache-control").unwrap(),
            "s-maxage=60, stale-while-revalidate"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(body.to_vec()).unwrap();

        assert_eq!(body.matches("<item>").count(), 1);
        assert!(body.contains("<title>Q &amp; A</title>"));
        assert!(body.contains("<link>https://blog.example.com/post?a=1&amp;b=2</link>"));
        assert!(body.contains(
            r#"<guid isPermaLink="true">https://blog.example.com/post?a=1&amp;b=2</guid>"#
        ));
        assert!(body.contains("<description><![CDATA[<em>read me</em>]]></description>"));
        assert!(body.contains(r#"href="https://reader.example.com/rss.xml""#));
    }

    #[tokio::test]
    async fn test_rejected_writes_leave_feed_empty() {
        let temp_dir = create_temp_dir();
        let app = create_app(&create_db_path(&temp_dir)).await;

        let unauthorized = Request::builder()
            .method("POST")
            .uri("/api/add-article")
            .header("authorization", "Bearer wrong")
            .body(Body::from(r#"{"url":"https://x.com"}"#))
            .unwrap();
        let response = app.clone().oneshot(unauthorized).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(add_request(r#"{"title":"no url"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(Request::builder().uri("/rss.xml").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(body.to_vec()).unwrap();

        assert!(!body.contains("<item>"));
    }
}
