use askama::Template;
use chrono::{DateTime, Utc};
use url::Url;

use crate::config::FeedConfig;
use crate::db::Article;
use crate::xml::{cdata, escape};

/// Most items a single feed document will carry.
pub const FEED_ITEM_LIMIT: usize = 50;

/// Used when the request carries no `Host` header.
const FALLBACK_HOST: &str = "localhost";

// Every field is already escaped or CDATA-wrapped, so the template must not escape again.
#[derive(Template)]
#[template(path = "rss.xml", escape = "none")]
pub struct RssTemplate {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
    pub last_build_date: String,
    pub self_link: String,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub guid: String,
    pub is_permalink: bool,
    pub pub_date: String,
    pub description: String,
}

impl FeedItem {
    /// Render one stored article. Records that were never stamped get
    /// `generated_at` as their pubDate.
    pub fn from_article(article: &Article, generated_at: DateTime<Utc>) -> Self {
        let url = article.url.as_deref().filter(|u| !u.is_empty());

        let (guid, is_permalink) = match url {
            Some(u) => (u, is_absolute_http_url(u)),
            None => (article.id.as_str(), false),
        };

        Self {
            title: escape(article.title.as_deref()),
            link: escape(url.unwrap_or("#")),
            guid: escape(guid),
            is_permalink,
            pub_date: rfc1123(article.created_at.or_generation_time(generated_at)),
            description: cdata(article.content.as_deref()),
        }
    }
}

fn is_absolute_http_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Format as RFC 1123, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn rfc1123(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Render the complete RSS 2.0 document for `articles`, in the order given.
pub fn render_feed(
    config: &FeedConfig,
    host: Option<&str>,
    articles: &[Article],
    generated_at: DateTime<Utc>,
) -> Result<String, askama::Error> {
    let host = host.filter(|h| !h.is_empty()).unwrap_or(FALLBACK_HOST);

    let template = RssTemplate {
        title: escape(config.title.as_str()),
        link: escape(format!("https://{}/", host).as_str()),
        description: escape(config.description.as_str()),
        language: escape(config.language.as_str()),
        last_build_date: rfc1123(generated_at),
        self_link: escape(format!("https://{}{}", host, config.path).as_str()),
        items: articles
            .iter()
            .map(|article| FeedItem::from_article(article, generated_at))
            .collect(),
    };

    template.render()
}

/// Body served when the feed cannot be built. Not a usable feed, just
/// something a reader can show.
pub fn error_document() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        "\n",
        r#"<rss version="2.0"><channel><title>Feed unavailable</title><link>#</link>"#,
        r#"<description>The feed could not be generated. Check server logs.</description>"#,
        "</channel></rss>"
    )
    .to_string()
}
