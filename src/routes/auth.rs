use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    middleware::rate_limit::check_rate_limit,
    models::{
        auth::AuthenticatedUser,
        user::{AuthResponse, RefreshTokenRequest, SessionView, SignInRequest, SignUpRequest},
    },
    routes::{bad_request, internal_error, not_found, ApiError},
    services::{
        auth::{normalize_email, AuthError, AuthService, MIN_PASSWORD_LEN},
        forms::is_plausible_email,
        metrics,
    },
    AppState,
};

fn auth_error(e: AuthError) -> ApiError {
    let status = match &e {
        AuthError::InvalidCredentials | AuthError::TokenInvalid => StatusCode::UNAUTHORIZED,
        AuthError::EmailTaken => StatusCode::CONFLICT,
        AuthError::Database(_) | AuthError::Internal(_) => return internal_error(e.into()),
    };
    (status, Json(json!({ "error": e.to_string() })))
}

/// POST /api/auth/sign-up
pub async fn sign_up(
    State(state): State<AppState>,
    Json(body): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    if !is_plausible_email(&body.email) {
        return Err(bad_request("A valid email address is required"));
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    AuthService::sign_up(
        &state.db,
        &state.config,
        &body.email,
        &body.password,
        body.display_name.as_deref(),
    )
    .await
    .map(|res| (StatusCode::CREATED, Json(res)))
    .map_err(auth_error)
}

/// POST /api/auth/sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<SignInRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    // 5 attempts per 15 min per email
    let rate_key = format!("rate:sign-in:{}", normalize_email(&body.email));
    check_rate_limit(state.redis.as_ref(), &rate_key, 5, 900).await?;

    match AuthService::sign_in(&state.db, &state.config, &body.email, &body.password).await {
        Ok(res) => {
            metrics::SIGN_INS.with_label_values(&["success"]).inc();
            Ok(Json(res))
        }
        Err(AuthError::InvalidCredentials) => {
            metrics::SIGN_INS.with_label_values(&["failure"]).inc();
            tracing::info!("sign-in failed: invalid credentials");
            Err(auth_error(AuthError::InvalidCredentials))
        }
        Err(e) => Err(auth_error(e)),
    }
}

/// POST /api/auth/refresh: rotates the refresh token.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    AuthService::refresh(&state.db, &state.config, &body.refresh_token)
        .await
        .map(Json)
        .map_err(auth_error)
}

/// POST /api/auth/sign-out
pub async fn sign_out(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<Value>, ApiError> {
    AuthService::sign_out(&state.db, &state.config, &body.refresh_token)
        .await
        .map_err(internal_error)?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/auth/session
pub async fn session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<SessionView>, ApiError> {
    AuthService::session(&state.db, user.user_id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(not_found)
}
