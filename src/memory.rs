use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::db::{Article, ArticleStore, CreatedAt, NewArticle, StoreError, StoredArticle};

#[derive(Default)]
struct MemoryState {
    articles: Vec<Article>,
    next_id: u64,
    last_stamp: Option<DateTime<Utc>>,
}

/// Process-local article store. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with records exactly as given, including partial ones.
    pub async fn insert_raw(&self, article: Article) {
        self.state.write().await.articles.push(article);
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.articles.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn add(&self, article: NewArticle) -> Result<StoredArticle, StoreError> {
        let mut state = self.state.write().await;

        // Clock steps backwards must not reorder the feed.
        let now = Utc::now();
        let stamp = match state.last_stamp {
            Some(last) if last > now => last,
            _ => now,
        };
        state.last_stamp = Some(stamp);

        state.next_id += 1;
        let id = format!("mem-{}", state.next_id);

        state.articles.push(Article {
            id: id.clone(),
            url: Some(article.url.clone()),
            title: Some(article.title.clone()),
            content: Some(article.content.clone()),
            created_at: CreatedAt::from(stamp),
        });

        Ok(StoredArticle { id, article })
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Article>, StoreError> {
        let state = self.state.read().await;

        // Reverse first so the stable sort leaves later insertions ahead on ties.
        let mut articles: Vec<Article> = state.articles.iter().rev().cloned().collect();
        articles.sort_by(|a, b| match (a.created_at.get(), b.created_at.get()) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        articles.truncate(limit);

        Ok(articles)
    }
}
