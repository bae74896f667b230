use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// -- Common --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Query string carrying a single `email` parameter.
#[derive(Debug, Default, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

// -- Auth --

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub user_id: String,
    pub email: String,
}

// -- Comments --

#[derive(Debug, Default, Deserialize)]
pub struct AddCommentRequest {
    pub news_url: Option<String>,
    pub user_email: Option<String>,
    pub comment_text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddCommentResponse {
    pub message: String,
    pub comment_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentsQuery {
    pub news_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LikeCommentRequest {
    pub comment_id: Option<String>,
}

// -- Likes --

#[derive(Debug, Default, Deserialize)]
pub struct ToggleLikeRequest {
    pub email: Option<String>,
    pub news_url: Option<String>,
    pub news_title: Option<String>,
    pub news_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleLikeResponse {
    pub message: String,
    pub liked: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckLikeQuery {
    pub email: Option<String>,
    pub news_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckLikeResponse {
    pub liked: bool,
}

// -- Profile --

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
    pub stats: ProfileStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub comment_count: u64,
    pub total_likes: i64,
    /// Counts every saved history entry, not only this user's.
    pub history_count: u64,
}

/// Mobile clients send numeric PINs as JSON numbers; accept both shapes.
/// Booleans, arrays and objects are rejected rather than stringified.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {other}"
        ))),
    }
}
