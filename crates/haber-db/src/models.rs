//! Typed views of stored documents. Distinct from the haber-types API models
//! to keep the DB layer independent.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRow {
    pub id: String,
    #[serde(default)]
    pub saved_at: Value,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentRow {
    pub id: String,
    pub news_url: String,
    pub user_email: String,
    pub comment_text: String,
    #[serde(default)]
    pub like_count: i64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LikeRow {
    pub id: String,
    pub email: String,
    pub news_url: String,
    pub news_title: Option<String>,
    pub news_image: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
