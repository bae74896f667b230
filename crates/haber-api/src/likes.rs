use axum::{
    Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;

use haber_types::api::{CheckLikeQuery, CheckLikeResponse, EmailQuery, ToggleLikeRequest, ToggleLikeResponse};
use haber_types::models::ArticleLike;

use crate::error::{ApiError, non_empty};
use crate::{AppState, blocking};

pub async fn toggle_like(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<ToggleLikeRequest>, ApiError>,
) -> Result<Json<ToggleLikeResponse>, ApiError> {
    let (Some(email), Some(news_url)) = (non_empty(req.email), non_empty(req.news_url)) else {
        return Err(ApiError::Validation("email and news_url are required".into()));
    };
    let news_title = req.news_title;
    let news_image = req.news_image;

    let liked = blocking(&state, move |db| {
        Ok(db.toggle_like(&email, &news_url, news_title.as_deref(), news_image.as_deref())?)
    })
    .await?;

    let message = if liked { "Liked" } else { "Like removed" };

    Ok(Json(ToggleLikeResponse {
        message: message.into(),
        liked,
    }))
}

/// GET /likes?email= — liked articles, newest first.
pub async fn get_likes(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<EmailQuery>, ApiError>,
) -> Result<Json<Vec<ArticleLike>>, ApiError> {
    let email = non_empty(query.email)
        .ok_or_else(|| ApiError::Validation("email parameter is required".into()))?;

    let rows = blocking(&state, move |db| Ok(db.get_likes_for_user(&email)?)).await?;

    let likes = rows
        .into_iter()
        .map(|row| ArticleLike {
            id: row.id,
            email: row.email,
            news_url: row.news_url,
            news_title: row.news_title,
            news_image: row.news_image,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(likes))
}

pub async fn check_like(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<CheckLikeQuery>, ApiError>,
) -> Result<Json<CheckLikeResponse>, ApiError> {
    let (Some(email), Some(news_url)) = (non_empty(query.email), non_empty(query.news_url)) else {
        return Err(ApiError::Validation(
            "email and news_url parameters are required".into(),
        ));
    };

    let liked = blocking(&state, move |db| Ok(db.has_liked(&email, &news_url)?)).await?;

    Ok(Json(CheckLikeResponse { liked }))
}
