use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};

use haber_types::api::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest};

use crate::error::{ApiError, non_empty};
use crate::{AppState, blocking};

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(email), Some(password)) = (non_empty(req.email), non_empty(req.password)) else {
        return Err(ApiError::Validation("email and password are required".into()));
    };

    let user_id = blocking(&state, move |db| {
        // Skip hashing for known emails; create_user re-checks inside its transaction
        if db.get_user_by_email(&email)?.is_some() {
            return Ok(None);
        }

        let password_hash = hash_password(&password)?;
        Ok(db.create_user(&email, &password_hash)?)
    })
    .await?
    .ok_or_else(|| ApiError::Duplicate("This email is already registered".into()))?;

    info!("Registered user {}", user_id);

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User created successfully")),
    ))
}

/// Unknown email, wrong password and an unreadable body all produce the same error.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = payload.map_err(|_| ApiError::InvalidCredentials)?;
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let user = blocking(&state, move |db| {
        let Some(user) = db.get_user_by_email(&email)? else {
            return Ok(None);
        };
        Ok(verify_password(&password, &user.password).then_some(user))
    })
    .await?
    .ok_or(ApiError::InvalidCredentials)?;

    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        user_id: user.id,
        email: user.email,
    }))
}

/// Argon2id with a random salt, encoded as a PHC string.
fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(password_hash) {
        Ok(hash) => hash,
        Err(e) => {
            warn!("Unparseable stored password hash: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
