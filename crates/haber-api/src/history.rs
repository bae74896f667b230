use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use serde_json::{Map, Value};

use haber_types::api::MessageResponse;
use haber_types::models::HistoryEntry;

use crate::error::ApiError;
use crate::{AppState, blocking};

const MAX_FIELDS: usize = 32;
const MAX_KEY_LEN: usize = 64;

/// Keys the server assigns itself. `id` is where rows carry the document id.
const RESERVED_KEYS: &[&str] = &["_id", "id", "saved_at"];

/// POST /save_history — stores the posted object with a server `saved_at`.
///
/// Keys may use letters and digits in any script plus `_` (`başlık` is fine,
/// `a.b` and `$where` are not). `_id`, `id` and `saved_at` are rejected.
pub async fn save_history(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = validate_entry(body)?;

    blocking(&state, move |db| Ok(db.insert_history(fields)?)).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("News saved to history")),
    ))
}

/// GET /history — every entry, newest first.
pub async fn get_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let rows = blocking(&state, |db| Ok(db.get_history()?)).await?;

    let entries = rows
        .into_iter()
        .map(|row| HistoryEntry {
            id: row.id,
            saved_at: row.saved_at,
            fields: row.fields,
        })
        .collect();

    Ok(Json(entries))
}

/// Accepts a non-empty JSON object of at most `MAX_FIELDS` keys. Keys must be
/// alphanumeric or `_`, at most `MAX_KEY_LEN` characters, and not reserved.
/// Values are stored as sent.
fn validate_entry(body: Value) -> Result<Map<String, Value>, ApiError> {
    let fields = match body {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => {
            return Err(ApiError::Validation(
                "History entry must be a JSON object".into(),
            ));
        }
    };

    if fields.is_empty() {
        return Err(ApiError::Validation("No data provided".into()));
    }

    if fields.len() > MAX_FIELDS {
        return Err(ApiError::Validation(format!(
            "History entry has more than {} fields",
            MAX_FIELDS
        )));
    }

    for key in fields.keys() {
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(ApiError::Validation(format!(
                "Field '{}' is assigned by the server",
                key
            )));
        }
        if key.is_empty()
            || key.chars().count() > MAX_KEY_LEN
            || !key.chars().all(|c| c.is_alphanumeric() || c == '_')
        {
            return Err(ApiError::Validation(format!("Invalid field name '{}'", key)));
        }
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_typical_entry() {
        let fields = validate_entry(json!({
            "title": "Headline",
            "url": "https://news.example/a",
            "image_url": null,
            "tags": ["world"]
        }))
        .unwrap();
        assert_eq!(fields.len(), 4);
    }

    #[test]
    fn rejects_empty_and_non_objects() {
        assert!(validate_entry(json!({})).is_err());
        assert!(validate_entry(Value::Null).is_err());
        assert!(validate_entry(json!(["title"])).is_err());
        assert!(validate_entry(json!("title")).is_err());
    }

    #[test]
    fn rejects_reserved_and_malformed_keys() {
        assert!(validate_entry(json!({"saved_at": "2020-01-01"})).is_err());
        assert!(validate_entry(json!({"_id": "x"})).is_err());
        assert!(validate_entry(json!({"id": "x"})).is_err());
        assert!(validate_entry(json!({"$where": "1"})).is_err());
        assert!(validate_entry(json!({"a.b": "1"})).is_err());

        let mut long_key = Map::new();
        long_key.insert("k".repeat(MAX_KEY_LEN + 1), json!(1));
        assert!(validate_entry(Value::Object(long_key)).is_err());
    }

    #[test]
    fn accepts_non_ascii_keys() {
        let fields = validate_entry(json!({"başlık": "Manşet", "görsel_url": null})).unwrap();
        assert_eq!(fields.len(), 2);

        let mut long_key = Map::new();
        long_key.insert("ş".repeat(MAX_KEY_LEN), json!(1));
        assert!(validate_entry(Value::Object(long_key)).is_ok());
    }

    #[test]
    fn rejects_too_many_fields() {
        let map: Map<String, Value> = (0..=MAX_FIELDS)
            .map(|i| (format!("f{}", i), json!(i)))
            .collect();
        assert!(validate_entry(Value::Object(map)).is_err());
    }
}
