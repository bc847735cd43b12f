use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::{Validate, ValidationError};

use crate::api::extract::ValidatedJson;
use crate::domain::services::auth_service::{AuthService, Registration};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::server::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify-email", post(verify_email))
        .route("/resend-verification", post(resend_verification))
        .route("/request-password-reset", post(request_password_reset))
        .route("/verify-reset-token", post(verify_reset_token))
        .route("/reset-password", post(reset_password))
        .route("/me", get(me))
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Lastname is required"))]
    pub lastname: String,
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Token is required"))]
    pub token: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user = AuthService::new(state)
        .register(Registration {
            name: payload.name,
            lastname: payload.lastname,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully. Please check your email to verify your account.",
            "requiresVerification": true,
            "user": user,
        })),
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let result = AuthService::new(state).login(&payload.email, &payload.password).await?;

    Ok(Json(json!({
        "message": "Login successful",
        "token": result.token,
        "user": result.user,
    })))
}

async fn verify_email(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<TokenRequest>,
) -> Result<Json<Value>, AppError> {
    AuthService::new(state).verify_email(payload.token.trim()).await?;

    Ok(Json(json!({ "message": "Email verified successfully. You can now log in." })))
}

async fn resend_verification(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<EmailRequest>,
) -> Result<Json<Value>, AppError> {
    AuthService::new(state).resend_verification(&payload.email).await?;

    Ok(Json(json!({ "message": "Verification email sent" })))
}

async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<EmailRequest>,
) -> Result<Json<Value>, AppError> {
    AuthService::new(state).request_password_reset(&payload.email).await?;

    Ok(Json(json!({
        "message": "If an account with that email exists, a password reset link has been sent",
    })))
}

async fn verify_reset_token(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<TokenRequest>,
) -> Result<Json<Value>, AppError> {
    AuthService::new(state).verify_reset_token(payload.token.trim()).await?;

    Ok(Json(json!({ "valid": true, "message": "Token is valid" })))
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    AuthService::new(state)
        .reset_password(payload.token.trim(), payload.password)
        .await?;

    Ok(Json(json!({ "message": "Password has been reset successfully" })))
}

async fn me(State(state): State<Arc<AppState>>, user: AuthUser) -> Result<Json<Value>, AppError> {
    let profile = AuthService::new(state).profile(user.id).await?;

    Ok(Json(json!({ "user": profile })))
}
