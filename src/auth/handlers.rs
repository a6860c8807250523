use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest, UserResponse},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::User,
    },
    error::AppError,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(get_me).patch(update_me))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    if payload.name.trim().is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request(
            "Name, email, and password are required",
        ));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::bad_request("Invalid email"));
    }
    if payload.password.len() < 6 {
        return Err(AppError::bad_request(
            "Password must be at least 6 characters long",
        ));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict(
            "User with this email already exists".into(),
        ));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        payload.name.trim(),
        &payload.email,
        payload.phone.as_deref(),
        &hash,
    )
    .await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.email, user.role)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: Some("User registered successfully".into()),
            user,
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }

    // One message for both unknown email and wrong password.
    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Invalid email or password".into()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthenticated("Invalid email or password".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.email, user.role)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        success: true,
        message: Some("Login successful".into()),
        user,
        token,
    }))
}

#[instrument(skip(state))]
async fn get_me(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = User::find_by_id(&state.db, ctx.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(UserResponse {
        success: true,
        message: None,
        user,
    }))
}

#[instrument(skip(state, payload))]
async fn update_me(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    if payload.is_empty() {
        return Err(AppError::bad_request("No valid fields to update"));
    }
    let user = User::update_profile(
        &state.db,
        ctx.id,
        payload.name.as_deref(),
        payload.phone.as_ref().map(|p| p.as_deref()),
    )
    .await?;
    info!(user_id = %ctx.id, "profile updated");
    Ok(Json(UserResponse {
        success: true,
        message: Some("Profile updated successfully".into()),
        user,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_accepts_plausible_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("spaces in@x.com"));
        assert!(!is_valid_email("a@nodot"));
    }
}
