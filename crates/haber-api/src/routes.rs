use axum::{
    Router,
    routing::{get, post},
};

use crate::{AppState, auth, comments, history, likes, profile};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Auth
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // History
        .route("/save_history", post(history::save_history))
        .route("/history", get(history::get_history))
        // Comments
        .route(
            "/comments",
            get(comments::get_comments).post(comments::add_comment),
        )
        .route("/comments/like", post(comments::like_comment))
        .route("/user/comments", get(comments::get_user_comments))
        // Profile
        .route("/profile", get(profile::get_profile))
        // Likes
        .route("/likes", get(likes::get_likes).post(likes::toggle_like))
        .route("/likes/check", get(likes::check_like))
        .with_state(state)
}
