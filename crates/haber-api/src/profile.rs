use axum::{
    Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;

use haber_types::api::{EmailQuery, ProfileResponse, ProfileStats};

use crate::error::{ApiError, non_empty};
use crate::{AppState, blocking};

/// GET /profile?email= — account creation time plus activity counters.
///
/// `history_count` is the size of the whole history collection; history
/// entries carry no owner.
pub async fn get_profile(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<EmailQuery>, ApiError>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let email = non_empty(query.email)
        .ok_or_else(|| ApiError::Validation("email parameter is required".into()))?;

    let (user, (comment_count, total_likes), history_count) = blocking(&state, move |db| {
        let user = db
            .get_user_by_email(&email)?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
        let comment_stats = db.get_comment_stats(&user.email)?;
        let history_count = db.count_history()?;
        Ok((user, comment_stats, history_count))
    })
    .await?;

    Ok(Json(ProfileResponse {
        email: user.email,
        created_at: user.created_at,
        stats: ProfileStats {
            comment_count,
            total_likes,
            history_count,
        },
    }))
}
