use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::debug;
use uuid::Uuid;

use haber_db::models::CommentRow;
use haber_types::api::{
    AddCommentRequest, AddCommentResponse, CommentsQuery, EmailQuery, LikeCommentRequest,
    MessageResponse,
};
use haber_types::models::Comment;

use crate::error::{ApiError, non_empty};
use crate::{AppState, blocking};

pub async fn add_comment(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<AddCommentRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(news_url), Some(user_email), Some(comment_text)) = (
        non_empty(req.news_url),
        non_empty(req.user_email),
        non_empty(req.comment_text),
    ) else {
        return Err(ApiError::Validation(
            "news_url, user_email and comment_text are required".into(),
        ));
    };

    let comment_id = blocking(&state, move |db| {
        Ok(db.insert_comment(&news_url, &user_email, &comment_text)?)
    })
    .await?;

    debug!("Added comment {}", comment_id);

    Ok((
        StatusCode::CREATED,
        Json(AddCommentResponse {
            message: "Comment added".into(),
            comment_id,
        }),
    ))
}

/// GET /comments?news_url= — comments on one article, newest first.
pub async fn get_comments(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<CommentsQuery>, ApiError>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let news_url = non_empty(query.news_url)
        .ok_or_else(|| ApiError::Validation("news_url parameter is required".into()))?;

    let rows = blocking(&state, move |db| Ok(db.get_comments_for_article(&news_url)?)).await?;

    Ok(Json(rows.into_iter().map(comment_view).collect()))
}

/// GET /user/comments?email= — one user's comments, newest first.
pub async fn get_user_comments(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<EmailQuery>, ApiError>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let email = non_empty(query.email)
        .ok_or_else(|| ApiError::Validation("email parameter is required".into()))?;

    let rows = blocking(&state, move |db| Ok(db.get_comments_by_user(&email)?)).await?;

    Ok(Json(rows.into_iter().map(comment_view).collect()))
}

/// POST /comments/like — adds one like. Not de-duplicated per user.
pub async fn like_comment(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LikeCommentRequest>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    let comment_id = non_empty(req.comment_id)
        .ok_or_else(|| ApiError::Validation("comment_id is required".into()))?
        .parse::<Uuid>()
        .map_err(|_| ApiError::Validation("comment_id is not a valid id".into()))?;

    let found = blocking(&state, move |db| {
        Ok(db.increment_comment_likes(&comment_id.to_string())?)
    })
    .await?;

    if !found {
        return Err(ApiError::NotFound("Comment not found".into()));
    }

    Ok(Json(MessageResponse::new("Like added")))
}

fn comment_view(row: CommentRow) -> Comment {
    Comment {
        id: row.id,
        news_url: row.news_url,
        user_email: row.user_email,
        comment_text: row.comment_text,
        like_count: row.like_count,
        created_at: row.created_at,
    }
}
