//! Account endpoints: signup, verification, login, tokens, password reset, profile

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::accounts::{LoggedIn, Signup};
use crate::email::EmailSender;
use crate::error::ScanError;
use crate::session::SessionTokens;
use crate::state::AppState;
use crate::store::{AccountStore, AccountView, ProfileUpdate};

use super::session::authenticate;

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

impl MessageResponse {
    pub fn ok(message: &'static str) -> Json<Self> {
        Json(Self {
            success: true,
            message,
        })
    }
}

#[derive(Serialize)]
pub struct UserResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub user: AccountView,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub contact_number: String,
    pub role: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub home_location: Option<String>,
}

/// POST /api/auth/signup
pub async fn signup<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let user = state.accounts.signup(Signup {
        email: req.email,
        password: req.password,
        name: req.name,
        contact_number: req.contact_number,
        role: req.role,
        skills: req.skills,
        home_location: req.home_location,
    })?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            success: true,
            message: Some("Account created. Check your email to verify it."),
            user,
        }),
    ))
}

#[derive(Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailResponse {
    pub success: bool,
    pub user: AccountView,
    pub pending_approval: bool,
}

/// POST /api/auth/verify-email
pub async fn verify_email<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    Json(req): Json<VerifyEmailRequest>,
) -> Result<Json<VerifyEmailResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let verified = state.accounts.verify_email(&req.token)?;
    Ok(Json(VerifyEmailResponse {
        success: true,
        user: verified.account,
        pending_approval: verified.pending_approval,
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(flatten)]
    pub session: LoggedIn,
}

/// POST /api/auth/login
pub async fn login<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let session = state.accounts.login(&req.email, &req.password)?;
    Ok(Json(LoginResponse {
        success: true,
        session,
    }))
}

/// POST /api/auth/logout
///
/// Always succeeds; a missing or stale token simply has nothing to clear.
pub async fn logout<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    if let Ok(account) = authenticate(&state, &headers) {
        state.accounts.logout(account.id)?;
    }
    Ok(MessageResponse::ok("Logged out successfully"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    #[serde(flatten)]
    pub tokens: SessionTokens,
}

/// POST /api/auth/refresh-token
pub async fn refresh_token<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let tokens = state.sessions.refresh(&req.refresh_token)?;
    Ok(Json(RefreshResponse {
        success: true,
        tokens,
    }))
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// POST /api/auth/forgot-password
pub async fn forgot_password<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    state.accounts.forgot_password(&req.email)?;
    Ok(MessageResponse::ok(
        "If that email is registered, a reset link has been sent",
    ))
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// POST /api/auth/reset-password/:token
pub async fn reset_password<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    state.accounts.reset_password(&token, &req.password)?;
    Ok(MessageResponse::ok("Password reset successful"))
}

/// GET /api/auth/check-auth and GET /api/auth/me
pub async fn me<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let account = authenticate(&state, &headers)?;
    Ok(Json(UserResponse {
        success: true,
        message: None,
        user: AccountView::from(&account),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub contact_number: Option<String>,
    pub skills: Option<Vec<String>>,
    pub home_location: Option<String>,
}

/// PUT /api/auth/update-profile
pub async fn update_profile<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let account = authenticate(&state, &headers)?;
    let user = state.accounts.update_profile(
        &account,
        ProfileUpdate {
            name: req.name,
            contact_number: req.contact_number,
            skills: req.skills,
            home_location: req.home_location,
        },
    )?;
    Ok(Json(UserResponse {
        success: true,
        message: Some("Profile updated successfully"),
        user,
    }))
}
