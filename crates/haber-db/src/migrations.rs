use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const SCHEMA_VERSION: i64 = 2;

/// Every collection is a table of `(id, doc)` pairs where `doc` is a JSON
/// object. The implicit rowid records insertion order.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (collections)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id      TEXT PRIMARY KEY,
                doc     TEXT NOT NULL CHECK (json_valid(doc))
            );

            CREATE TABLE history (
                id      TEXT PRIMARY KEY,
                doc     TEXT NOT NULL CHECK (json_valid(doc))
            );

            CREATE TABLE comments (
                id      TEXT PRIMARY KEY,
                doc     TEXT NOT NULL CHECK (json_valid(doc))
            );

            CREATE TABLE likes (
                id      TEXT PRIMARY KEY,
                doc     TEXT NOT NULL CHECK (json_valid(doc))
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (unique email, unique like per article)");
        conn.execute_batch(
            "
            CREATE UNIQUE INDEX idx_users_email
                ON users(json_extract(doc, '$.email'));

            CREATE UNIQUE INDEX idx_likes_email_news_url
                ON likes(json_extract(doc, '$.email'), json_extract(doc, '$.news_url'));

            CREATE INDEX idx_comments_news_url
                ON comments(json_extract(doc, '$.news_url'));

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete (schema v{})", SCHEMA_VERSION);
    Ok(())
}
