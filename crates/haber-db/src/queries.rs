use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::Database;
use crate::collection::{Collection, Document, Filter, Sort, Update};
use crate::models::{CommentRow, HistoryRow, LikeRow, UserRow};

/// Current UTC time as stored in documents. Fixed microsecond precision keeps
/// lexical order equal to chronological order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    // -- Users --

    /// Inserts a user unless the email is taken. Returns the new id, or
    /// `None` for a duplicate. The lookup and insert share one transaction.
    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<Option<String>> {
        self.with_tx(|tx| {
            let filter = Filter::all().eq("email", email);
            if Collection::Users.find_one(tx, &filter)?.is_some() {
                return Ok(None);
            }
            insert_user(tx, email, password_hash)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            Collection::Users
                .find_one(conn, &Filter::all().eq("email", email))?
                .map(Document::into_row)
                .transpose()
        })
    }

    // -- History --

    /// Stores client fields with a fresh `saved_at`. Any client-provided
    /// `saved_at` is overwritten.
    pub fn insert_history(&self, mut fields: Map<String, Value>) -> Result<String> {
        fields.insert("saved_at".into(), now_timestamp().into());
        self.with_conn(|conn| Collection::History.insert_one(conn, &fields))
    }

    /// Newest first.
    pub fn get_history(&self) -> Result<Vec<HistoryRow>> {
        self.with_conn(|conn| {
            let docs = Collection::History.find(conn, &Filter::all(), Some(&Sort::desc("saved_at")))?;
            Ok(decode_rows(Collection::History, docs))
        })
    }

    pub fn count_history(&self) -> Result<u64> {
        self.with_conn(|conn| Collection::History.count(conn, &Filter::all()))
    }

    // -- Comments --

    pub fn insert_comment(&self, news_url: &str, user_email: &str, comment_text: &str) -> Result<String> {
        let mut body = Map::new();
        body.insert("news_url".into(), news_url.into());
        body.insert("user_email".into(), user_email.into());
        body.insert("comment_text".into(), comment_text.into());
        body.insert("like_count".into(), 0.into());
        body.insert("created_at".into(), now_timestamp().into());

        self.with_conn(|conn| Collection::Comments.insert_one(conn, &body))
    }

    /// Comments on one article, newest first.
    pub fn get_comments_for_article(&self, news_url: &str) -> Result<Vec<CommentRow>> {
        self.find_comments(Filter::all().eq("news_url", news_url))
    }

    /// Comments written by one user, newest first.
    pub fn get_comments_by_user(&self, email: &str) -> Result<Vec<CommentRow>> {
        self.find_comments(Filter::all().eq("user_email", email))
    }

    fn find_comments(&self, filter: Filter) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let docs = Collection::Comments.find(conn, &filter, Some(&Sort::desc("created_at")))?;
            Ok(decode_rows(Collection::Comments, docs))
        })
    }

    /// Adds one like to a comment. Returns false when no comment has that id.
    pub fn increment_comment_likes(&self, comment_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let modified = Collection::Comments.update_one(
                conn,
                &Filter::by_id(comment_id),
                &Update::inc("like_count", 1),
            )?;
            Ok(modified > 0)
        })
    }

    /// Number of comments by `email` and the sum of their like counts.
    pub fn get_comment_stats(&self, email: &str) -> Result<(u64, i64)> {
        self.with_conn(|conn| {
            let filter = Filter::all().eq("user_email", email);
            let count = Collection::Comments.count(conn, &filter)?;
            let total_likes: i64 = Collection::Comments
                .find(conn, &filter, None)?
                .iter()
                .filter_map(|doc| doc.get("like_count").and_then(Value::as_i64))
                .sum();
            Ok((count, total_likes))
        })
    }

    // -- Likes --

    /// Toggle an article like: removes if exists, inserts if not.
    /// Returns true when the like was added, false when it was removed.
    pub fn toggle_like(
        &self,
        email: &str,
        news_url: &str,
        news_title: Option<&str>,
        news_image: Option<&str>,
    ) -> Result<bool> {
        self.with_tx(|tx| {
            let filter = Filter::all().eq("email", email).eq("news_url", news_url);

            if let Some(existing) = Collection::Likes.find_one(tx, &filter)? {
                Collection::Likes.delete_one(tx, &Filter::by_id(existing.id))?;
                return Ok(false);
            }

            let mut body = Map::new();
            body.insert("email".into(), email.into());
            body.insert("news_url".into(), news_url.into());
            body.insert("news_title".into(), news_title.into());
            body.insert("news_image".into(), news_image.into());
            body.insert("created_at".into(), now_timestamp().into());

            Collection::Likes.insert_one(tx, &body)?;
            Ok(true)
        })
    }

    /// Articles liked by `email`, newest first.
    pub fn get_likes_for_user(&self, email: &str) -> Result<Vec<LikeRow>> {
        self.with_conn(|conn| {
            let docs = Collection::Likes.find(
                conn,
                &Filter::all().eq("email", email),
                Some(&Sort::desc("created_at")),
            )?;
            Ok(decode_rows(Collection::Likes, docs))
        })
    }

    pub fn has_liked(&self, email: &str, news_url: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let filter = Filter::all().eq("email", email).eq("news_url", news_url);
            Ok(Collection::Likes.find_one(conn, &filter)?.is_some())
        })
    }
}

/// Corrupt documents are skipped rather than failing the whole listing.
fn decode_rows<T: DeserializeOwned>(collection: Collection, docs: Vec<Document>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| match doc.into_row() {
            Ok(row) => Some(row),
            Err(e) => {
                warn!("Skipping corrupt document in {}: {:#}", collection.name(), e);
                None
            }
        })
        .collect()
}

/// Inserts a user document. `None` when the unique email index rejects it.
fn insert_user(conn: &Connection, email: &str, password_hash: &str) -> Result<Option<String>> {
    let mut body = Map::new();
    body.insert("email".into(), email.into());
    body.insert("password".into(), password_hash.into());
    body.insert("created_at".into(), now_timestamp().into());

    match Collection::Users.insert_one(conn, &body) {
        Ok(id) => Ok(Some(id)),
        Err(e) if is_unique_violation(&e) => Ok(None),
        Err(e) => Err(e),
    }
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _)) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
