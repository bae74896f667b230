use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A comment left on an article, as returned by the list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub news_url: String,
    pub user_email: String,
    pub comment_text: String,
    pub like_count: i64,
    pub created_at: Option<DateTime<Utc>>,
}

/// An article a user has liked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleLike {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub news_url: String,
    pub news_title: Option<String>,
    pub news_image: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A saved read-history entry. Client fields are flattened next to the
/// server-assigned `_id` and `saved_at`; `saved_at` is passed through exactly
/// as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub saved_at: Value,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
