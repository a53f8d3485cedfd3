use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};

/// A saved article as read back from the store.
///
/// Every field except the id is optional: the collection may hold documents
/// written by older versions or by hand, and the feed has to cope with them.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub created_at: CreatedAt,
}

/// Server-assigned creation time, which may be missing on partial records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CreatedAt(pub Option<DateTime<Utc>>);

impl CreatedAt {
    pub fn get(self) -> Option<DateTime<Utc>> {
        self.0
    }

    /// The creation time, or `generated_at` (the feed generation time) when the
    /// record was never stamped.
    pub fn or_generation_time(self, generated_at: DateTime<Utc>) -> DateTime<Utc> {
        self.0.unwrap_or(generated_at)
    }
}

impl From<DateTime<Utc>> for CreatedAt {
    fn from(at: DateTime<Utc>) -> Self {
        Self(Some(at))
    }
}

/// A validated article ready to be written. The store stamps the creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub url: String,
    pub title: String,
    pub content: String,
}

/// What the store reports back after a successful write.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArticle {
    pub id: String,
    pub article: NewArticle,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("article {id} has an unreadable created_at value {value:?}")]
    InvalidTimestamp { id: String, value: String },
}

/// The document store shared by both handlers.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Append one article, stamping its creation time.
    async fn add(&self, article: NewArticle) -> Result<StoredArticle, StoreError>;

    /// Up to `limit` articles, newest first. Unstamped records come last.
    async fn recent(&self, limit: usize) -> Result<Vec<Article>, StoreError>;
}

#[derive(Debug, FromRow)]
struct ArticleRow {
    id: i64,
    url: Option<String>,
    title: Option<String>,
    content: Option<String>,
    created_at: Option<String>,
}

impl TryFrom<ArticleRow> for Article {
    type Error = StoreError;

    fn try_from(row: ArticleRow) -> Result<Self, Self::Error> {
        let id = row.id.to_string();
        let created_at = match row.created_at {
            Some(value) => match DateTime::parse_from_rfc3339(&value) {
                Ok(at) => CreatedAt(Some(at.with_timezone(&Utc))),
                Err(_) => return Err(StoreError::InvalidTimestamp { id, value }),
            },
            None => CreatedAt(None),
        };

        Ok(Article {
            id,
            url: row.url,
            title: row.title,
            content: row.content,
            created_at,
        })
    }
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                url TEXT,
                title TEXT,
                content TEXT,
                created_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_articles_created_at
            ON articles(created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ArticleStore for SqliteStore {
    async fn add(&self, article: NewArticle) -> Result<StoredArticle, StoreError> {
        // Fixed-width UTC text, so lexical order is chronological order.
        let result = sqlx::query(
            r#"
            INSERT INTO articles (url, title, content, created_at)
            VALUES (?, ?, ?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            "#,
        )
        .bind(&article.url)
        .bind(&article.title)
        .bind(&article.content)
        .execute(&self.pool)
        .await?;

        Ok(StoredArticle {
            id: result.last_insert_rowid().to_string(),
            article,
        })
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Article>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, ArticleRow>(
            r#"
            SELECT id, url, title, content, created_at FROM articles
            ORDER BY created_at DESC NULLS LAST, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Article::try_from).collect()
    }
}
