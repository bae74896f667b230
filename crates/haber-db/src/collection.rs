//! Schemaless document collections stored as JSON in SQLite tables.
//!
//! Filters are conjunctions of equality tests. Field names are restricted to
//! ASCII alphanumerics and `_` because they are written into the SQL as
//! literal JSON paths, which is what lets the expression indexes match.

use anyhow::{Context, Result, bail};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params_from_iter};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    History,
    Comments,
    Likes,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::History => "history",
            Collection::Comments => "comments",
            Collection::Likes => "likes",
        }
    }
}

/// A stored document: the id generated on insert plus its JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: Map<String, Value>,
}

impl Document {
    fn parse(id: String, raw: &str) -> Result<Self> {
        let body = serde_json::from_str(raw)
            .with_context(|| format!("document {} is not a JSON object", id))?;
        Ok(Self { id, body })
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }

    /// Deserializes the document into a row type. The id is exposed to the
    /// row under the `id` key.
    pub fn into_row<T: DeserializeOwned>(self) -> Result<T> {
        let Document { id, mut body } = self;
        body.insert("id".to_string(), Value::String(id.clone()));
        serde_json::from_value(Value::Object(body))
            .with_context(|| format!("document {} does not match the expected shape", id))
    }
}

/// Equality filter over top-level fields and/or the document id.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    id: Option<String>,
    fields: Vec<(String, Value)>,
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            fields: Vec::new(),
        }
    }

    /// Adds `field == value`. A `null` value also matches documents that lack the field.
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.push((field.to_string(), value.into()));
        self
    }

    fn where_clause(&self, params: &mut Vec<SqlValue>) -> Result<String> {
        let mut clauses = Vec::new();

        if let Some(id) = &self.id {
            params.push(SqlValue::Text(id.clone()));
            clauses.push(format!("id = ?{}", params.len()));
        }

        for (field, value) in &self.fields {
            let extract = json_extract(field)?;
            params.push(to_sql_value(value)?);
            clauses.push(format!("{} IS ?{}", extract, params.len()));
        }

        if clauses.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" WHERE {}", clauses.join(" AND ")))
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sort {
    field: String,
    descending: bool,
}

impl Sort {
    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }
}

/// Single-field modification applied by `update_one`.
#[derive(Debug, Clone)]
pub enum Update {
    /// Adds `by` to a numeric field, treating a missing field as 0.
    Inc { field: String, by: i64 },
    Set { field: String, value: Value },
}

impl Update {
    pub fn inc(field: &str, by: i64) -> Self {
        Update::Inc {
            field: field.to_string(),
            by,
        }
    }

    pub fn set(field: &str, value: impl Into<Value>) -> Self {
        Update::Set {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

impl Collection {
    pub fn find_one(self, conn: &Connection, filter: &Filter) -> Result<Option<Document>> {
        let mut params = Vec::new();
        let where_sql = filter.where_clause(&mut params)?;
        let sql = format!(
            "SELECT id, doc FROM {}{} ORDER BY rowid LIMIT 1",
            self.name(),
            where_sql
        );

        let row = conn
            .query_row(&sql, params_from_iter(&params), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .optional()?;

        row.map(|(id, raw)| Document::parse(id, &raw)).transpose()
    }

    /// All matching documents. Without a sort they come back in insertion
    /// order; with one, ties fall back to insertion order in the same direction.
    pub fn find(self, conn: &Connection, filter: &Filter, sort: Option<&Sort>) -> Result<Vec<Document>> {
        let mut params = Vec::new();
        let where_sql = filter.where_clause(&mut params)?;

        let order_sql = match sort {
            Some(sort) => {
                let extract = json_extract(&sort.field)?;
                let dir = if sort.descending { "DESC" } else { "ASC" };
                format!(" ORDER BY {extract} {dir}, rowid {dir}")
            }
            None => " ORDER BY rowid".to_string(),
        };

        let sql = format!("SELECT id, doc FROM {}{}{}", self.name(), where_sql, order_sql);
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(params_from_iter(&params), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, raw)| Document::parse(id, &raw))
            .collect()
    }

    /// Stores `body` under a freshly generated id and returns that id.
    pub fn insert_one(self, conn: &Connection, body: &Map<String, Value>) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let doc = serde_json::to_string(body)?;

        conn.execute(
            &format!("INSERT INTO {} (id, doc) VALUES (?1, ?2)", self.name()),
            (&id, &doc),
        )?;

        Ok(id)
    }

    /// Applies `update` to the first matching document in one statement.
    /// Returns the number of modified documents (0 or 1).
    pub fn update_one(self, conn: &Connection, filter: &Filter, update: &Update) -> Result<usize> {
        let mut params = Vec::new();
        let where_sql = filter.where_clause(&mut params)?;

        let set_sql = match update {
            Update::Inc { field, by } => {
                let path = json_path(field)?;
                params.push(SqlValue::Integer(*by));
                format!(
                    "json_set(doc, {path}, COALESCE(json_extract(doc, {path}), 0) + ?{})",
                    params.len()
                )
            }
            Update::Set { field, value } => {
                let path = json_path(field)?;
                params.push(SqlValue::Text(serde_json::to_string(value)?));
                format!("json_set(doc, {path}, json(?{}))", params.len())
            }
        };

        let table = self.name();
        let sql = format!(
            "UPDATE {table} SET doc = {set_sql}
             WHERE rowid = (SELECT rowid FROM {table}{where_sql} ORDER BY rowid LIMIT 1)"
        );

        Ok(conn.execute(&sql, params_from_iter(&params))?)
    }

    /// Removes the first matching document. Returns the number removed (0 or 1).
    pub fn delete_one(self, conn: &Connection, filter: &Filter) -> Result<usize> {
        let mut params = Vec::new();
        let where_sql = filter.where_clause(&mut params)?;

        let table = self.name();
        let sql = format!(
            "DELETE FROM {table}
             WHERE rowid = (SELECT rowid FROM {table}{where_sql} ORDER BY rowid LIMIT 1)"
        );

        Ok(conn.execute(&sql, params_from_iter(&params))?)
    }

    pub fn count(self, conn: &Connection, filter: &Filter) -> Result<u64> {
        let mut params = Vec::new();
        let where_sql = filter.where_clause(&mut params)?;
        let sql = format!("SELECT COUNT(*) FROM {}{}", self.name(), where_sql);

        let n: i64 = conn.query_row(&sql, params_from_iter(&params), |r| r.get(0))?;
        Ok(n as u64)
    }
}

/// SQL string literal holding the JSON path of a top-level field, e.g. `'$.email'`.
/// Written the same way the migrations write their index expressions.
fn json_path(field: &str) -> Result<String> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("invalid field name '{}'", field);
    }
    Ok(format!("'$.{}'", field))
}

fn json_extract(field: &str) -> Result<String> {
    Ok(format!("json_extract(doc, {})", json_path(field)?))
}

/// Maps a JSON value onto what `json_extract` yields for it, so `IS` compares like with like.
fn to_sql_value(value: &Value) -> Result<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(serde_json::to_string(value)?),
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
