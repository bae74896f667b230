//! End-to-end tests: drive the real router against an in-memory database.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use haber_api::AppStateInner;
use haber_api::routes::build_router;
use haber_db::Database;

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    build_router(Arc::new(AppStateInner { db }))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(body)).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

fn assert_error(status: StatusCode, body: &Value, expected: StatusCode) {
    assert_eq!(status, expected, "body: {body}");
    assert!(body["error"].is_string(), "missing error field: {body}");
}

// -- Auth --

#[tokio::test]
async fn register_then_duplicate() {
    let app = app();

    let (status, body) = post(&app, "/register", json!({"email": "a@x.com", "password": "pw1"})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["message"].is_string());
    assert!(body.get("user_id").is_none());

    let (status, body) = post(&app, "/register", json!({"email": "a@x.com", "password": "pw2"})).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_requires_email_and_password() {
    let app = app();

    for body in [
        json!({"email": "a@x.com"}),
        json!({"password": "pw"}),
        json!({"email": "", "password": "pw"}),
        json!({}),
        json!({"email": "a@x.com", "password": true}),
    ] {
        let (status, resp) = post(&app, "/register", body).await;
        assert_error(status, &resp, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn login_accepts_only_the_right_password() {
    let app = app();
    post(&app, "/register", json!({"email": "a@x.com", "password": "pw1"})).await;

    let (status, body) = post(&app, "/login", json!({"email": "a@x.com", "password": "pw1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@x.com");
    assert!(body["user_id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(body.get("password").is_none());

    // idempotent
    let (status, again) = post(&app, "/login", json!({"email": "a@x.com", "password": "pw1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["user_id"], body["user_id"]);

    let (status, wrong) = post(&app, "/login", json!({"email": "a@x.com", "password": "wrong"})).await;
    assert_error(status, &wrong, StatusCode::UNAUTHORIZED);

    let (status, unknown) = post(&app, "/login", json!({"email": "b@x.com", "password": "pw1"})).await;
    assert_error(status, &unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong["error"], unknown["error"]);
}

#[tokio::test]
async fn login_with_unreadable_body_is_unauthorized() {
    let app = app();
    post(&app, "/register", json!({"email": "a@x.com", "password": "pw1"})).await;

    for body in [
        json!({"email": 5, "password": "pw1"}),
        json!({"email": "a@x.com", "password": true}),
        json!({}),
        json!([1, 2]),
    ] {
        let (status, res) = post(&app, "/login", body).await;
        assert_error(status, &res, StatusCode::UNAUTHORIZED);
    }

    // no content-type
    let req = Request::builder()
        .method("POST")
        .uri("/login")
        .body(Body::from(r#"{"email":"a@x.com","password":"pw1"}"#))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_error(status, &body, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn numeric_password_round_trips() {
    let app = app();

    let (status, _) = post(&app, "/register", json!({"email": "n@x.com", "password": 123456})).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = post(&app, "/login", json!({"email": "n@x.com", "password": "123456"})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = app();

    let req = Request::builder()
        .method("POST")
        .uri("/register")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_error(status, &body, StatusCode::BAD_REQUEST);
}

// -- History --

#[tokio::test]
async fn history_lists_newest_first_with_duplicates() {
    let app = app();

    let first = json!({"title": "First", "url": "https://news.example/1"});
    let second = json!({"title": "Second", "url": "https://news.example/2"});

    assert_eq!(post(&app, "/save_history", first.clone()).await.0, StatusCode::CREATED);
    assert_eq!(post(&app, "/save_history", second).await.0, StatusCode::CREATED);
    assert_eq!(post(&app, "/save_history", first).await.0, StatusCode::CREATED);

    let (status, body) = get(&app, "/history").await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["title"], "First");
    assert_eq!(entries[1]["title"], "Second");
    assert_eq!(entries[2]["title"], "First");
    for entry in entries {
        assert!(entry["_id"].is_string());
        assert!(entry["saved_at"].is_string());
    }
    assert_ne!(entries[0]["_id"], entries[2]["_id"]);
}

#[tokio::test]
async fn save_history_rejects_empty_or_invalid_bodies() {
    let app = app();

    let (status, body) = post(&app, "/save_history", json!({})).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);

    let (status, body) = post(&app, "/save_history", json!({"saved_at": "yesterday"})).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);

    let (status, body) = post(&app, "/save_history", json!([1, 2])).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/save_history", None).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);

    let (_, body) = get(&app, "/history").await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn history_keeps_non_ascii_keys() {
    let app = app();

    let (status, _) = post(&app, "/save_history", json!({"başlık": "Manşet", "url": "u1"})).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post(&app, "/save_history", json!({"id": "x"})).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);

    let (_, body) = get(&app, "/history").await;
    assert_eq!(body[0]["başlık"], "Manşet");
}

// -- Comments --

#[tokio::test]
async fn comments_are_filtered_by_article_newest_first() {
    let app = app();

    for (url, email, text) in [
        ("news-1", "a@x.com", "first"),
        ("news-2", "a@x.com", "elsewhere"),
        ("news-1", "b@x.com", "second"),
    ] {
        let (status, body) = post(
            &app,
            "/comments",
            json!({"news_url": url, "user_email": email, "comment_text": text}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["comment_id"].is_string());
    }

    let (status, body) = get(&app, "/comments?news_url=news-1").await;
    assert_eq!(status, StatusCode::OK);
    let comments = body.as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert!(comments.iter().all(|c| c["news_url"] == "news-1"));
    assert_eq!(comments[0]["comment_text"], "second");
    assert_eq!(comments[1]["comment_text"], "first");
    assert_eq!(comments[0]["like_count"], 0);
    assert!(comments[0]["_id"].is_string());
    assert!(comments[0]["created_at"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn comments_on_encoded_urls() {
    let app = app();
    let url = "https://news.example/a?id=1&lang=tr";

    post(
        &app,
        "/comments",
        json!({"news_url": url, "user_email": "a@x.com", "comment_text": "nice"}),
    )
    .await;

    let (_, body) = get(&app, "/comments?news_url=https%3A%2F%2Fnews.example%2Fa%3Fid%3D1%26lang%3Dtr").await;
    let comments = body.as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["news_url"], url);
}

#[tokio::test]
async fn comment_endpoints_require_fields() {
    let app = app();

    let (status, body) = post(&app, "/comments", json!({"news_url": "n", "user_email": "a@x.com"})).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/comments").await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/user/comments").await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);

    let (status, body) = post(&app, "/comments/like", json!({})).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn liking_a_comment_twice_counts_twice() {
    let app = app();

    let (_, body) = post(
        &app,
        "/comments",
        json!({"news_url": "news-1", "user_email": "a@x.com", "comment_text": "nice"}),
    )
    .await;
    let comment_id = body["comment_id"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let (status, body) = post(&app, "/comments/like", json!({"comment_id": comment_id})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());
    }

    let (_, body) = get(&app, "/comments?news_url=news-1").await;
    assert_eq!(body[0]["like_count"], 2);
}

#[tokio::test]
async fn liking_unknown_or_malformed_comment_ids() {
    let app = app();

    let (status, body) = post(&app, "/comments/like", json!({"comment_id": "not-an-id"})).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);

    let (status, body) = post(
        &app,
        "/comments/like",
        json!({"comment_id": "3f2b1c4e-8d7a-4e6f-9a0b-1c2d3e4f5a6b"}),
    )
    .await;
    assert_error(status, &body, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_comments_lists_only_that_user() {
    let app = app();

    for (email, text) in [("a@x.com", "one"), ("b@x.com", "other"), ("a@x.com", "two")] {
        post(
            &app,
            "/comments",
            json!({"news_url": "news-1", "user_email": email, "comment_text": text}),
        )
        .await;
    }

    let (status, body) = get(&app, "/user/comments?email=a@x.com").await;
    assert_eq!(status, StatusCode::OK);
    let comments = body.as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert!(comments.iter().all(|c| c["user_email"] == "a@x.com"));
    assert_eq!(comments[0]["comment_text"], "two");
}

// -- Likes --

#[tokio::test]
async fn toggle_like_flips_membership() {
    let app = app();
    let like = json!({
        "email": "a@x.com",
        "news_url": "news-1",
        "news_title": "Headline",
        "news_image": "https://img.example/1.jpg"
    });

    let (status, body) = get(&app, "/likes/check?email=a@x.com&news_url=news-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], false);

    let (status, body) = post(&app, "/likes", like.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], true);
    assert!(body["message"].is_string());

    let (_, body) = get(&app, "/likes/check?email=a@x.com&news_url=news-1").await;
    assert_eq!(body["liked"], true);

    let (_, body) = get(&app, "/likes?email=a@x.com").await;
    let likes = body.as_array().unwrap();
    assert_eq!(likes.len(), 1);
    assert_eq!(likes[0]["news_title"], "Headline");
    assert_eq!(likes[0]["news_image"], "https://img.example/1.jpg");
    assert!(likes[0]["_id"].is_string());

    let (status, body) = post(&app, "/likes", like).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], false);

    let (_, body) = get(&app, "/likes/check?email=a@x.com&news_url=news-1").await;
    assert_eq!(body["liked"], false);

    let (_, body) = get(&app, "/likes?email=a@x.com").await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn likes_list_is_newest_first_and_allows_missing_metadata() {
    let app = app();

    post(&app, "/likes", json!({"email": "a@x.com", "news_url": "news-1"})).await;
    post(&app, "/likes", json!({"email": "a@x.com", "news_url": "news-2"})).await;

    let (_, body) = get(&app, "/likes?email=a@x.com").await;
    let likes = body.as_array().unwrap();
    assert_eq!(likes.len(), 2);
    assert_eq!(likes[0]["news_url"], "news-2");
    assert_eq!(likes[1]["news_url"], "news-1");
    assert!(likes[0]["news_title"].is_null());
}

#[tokio::test]
async fn like_endpoints_require_fields() {
    let app = app();

    let (status, body) = post(&app, "/likes", json!({"email": "a@x.com"})).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/likes").await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/likes/check?email=a@x.com").await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);
}

// -- Profile --

#[tokio::test]
async fn profile_aggregates_comment_stats() {
    let app = app();
    post(&app, "/register", json!({"email": "a@x.com", "password": "pw1"})).await;

    let mut first_id = String::new();
    for (i, email) in ["a@x.com", "a@x.com", "b@x.com"].into_iter().enumerate() {
        let (_, body) = post(
            &app,
            "/comments",
            json!({"news_url": format!("news-{i}"), "user_email": email, "comment_text": "c"}),
        )
        .await;
        if i == 0 {
            first_id = body["comment_id"].as_str().unwrap().to_string();
        }
    }
    for _ in 0..3 {
        post(&app, "/comments/like", json!({"comment_id": first_id})).await;
    }
    post(&app, "/save_history", json!({"title": "t"})).await;
    post(&app, "/save_history", json!({"title": "t"})).await;

    let (status, body) = get(&app, "/profile?email=a@x.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@x.com");
    assert!(body["created_at"].is_string());
    assert!(body.get("password").is_none());
    assert_eq!(body["stats"]["comment_count"], 2);
    assert_eq!(body["stats"]["total_likes"], 3);
    assert_eq!(body["stats"]["history_count"], 2);
}

#[tokio::test]
async fn profile_errors() {
    let app = app();

    let (status, body) = get(&app, "/profile").await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/profile?email=ghost@x.com").await;
    assert_error(status, &body, StatusCode::NOT_FOUND);
}
