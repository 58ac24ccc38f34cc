use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{
    RegistrationInput, validate_login, validate_profile_update, validate_registration,
};
use super::{ApiError, ApiResponse, AppState};
use crate::services::{RegisteredUser, UserProfile};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub contact: Option<String>,
    pub password: Option<String>,
    pub password2: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub token: String,
    pub user: UserProfile,
}

/// POST /api/accounts/register/
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<RegisteredUser>>), ApiError> {
    let Json(payload) = payload?;
    let input = RegistrationInput {
        email: payload.email.as_deref(),
        name: payload.name.as_deref(),
        contact: payload.contact.as_deref(),
        password: payload.password.as_deref(),
        password2: payload.password2.as_deref(),
    };
    let registration =
        validate_registration(&input, state.config().security.min_password_length)?;

    let registered = state.shared.account_service.register(registration).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(registered))))
}

/// GET /api/accounts/activate/{uidb64}/{token}/
pub async fn activate(
    State(state): State<Arc<AppState>>,
    Path((uidb64, token)): Path<(String, String)>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let grant = state
        .shared
        .account_service
        .activate(&uidb64, &token)
        .await?;

    Ok(Json(ApiResponse::success(SessionResponse {
        message: Some("Account activated successfully!".to_string()),
        token: grant.token,
        user: grant.user,
    })))
}

/// POST /api/accounts/login/
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let Json(payload) = payload?;
    let (email, password) = validate_login(payload.email.as_deref(), payload.password.as_deref())?;

    let grant = state.shared.account_service.login(&email, password).await?;

    Ok(Json(ApiResponse::success(SessionResponse {
        message: None,
        token: grant.token,
        user: grant.user,
    })))
}

/// GET /api/accounts/profile/
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let profile = state.shared.account_service.profile(user.id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// PUT /api/accounts/update-profile/
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let Json(payload) = payload?;
    let update = validate_profile_update(payload.name.as_deref(), payload.contact.as_deref())?;

    let profile = state
        .shared
        .account_service
        .update_profile(user.id, update)
        .await?;

    Ok(Json(ApiResponse::success(profile)))
}
