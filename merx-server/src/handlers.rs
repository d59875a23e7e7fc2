use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use merx_core::{AuthError, Claims, TokenBundle};
use merx_model::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cookies::{refresh_cookie, refresh_cookie_value};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub email_confirm_link: String,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    pub reset_link: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

/// Turn a token bundle into the access-token body plus the refresh
/// cookie on the response.
fn bundle_response(bundle: TokenBundle) -> AppResult<Response> {
    let cookie = refresh_cookie(&bundle.refresh_token)
        .map_err(|_| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "cookie encoding failed"))?;

    let expires_in = (bundle.access_token.expires_at - Utc::now()).num_seconds();
    let body = AccessTokenResponse {
        access_token: bundle.access_token.token,
        token_type: "Bearer",
        expires_in,
    };

    let mut response = Json(body).into_response();
    response.headers_mut().append(header::SET_COOKIE, cookie);
    Ok(response)
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Response> {
    let bundle = state.auth.login(&request.username, &request.password).await?;
    bundle_response(bundle)
}

pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let presented = refresh_cookie_value(&headers)
        .ok_or_else(|| AppError::from(AuthError::InvalidToken))?;
    let bundle = state.auth.refresh_access_token(&presented).await?;
    bundle_response(bundle)
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    request.validate()?;

    let registration = state
        .auth
        .register(
            &request.username,
            &request.email,
            &request.password,
            request.role,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: registration.user_id,
            email_confirm_link: registration.confirmation_link,
        }),
    ))
}

pub async fn confirm_email(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> AppResult<StatusCode> {
    state.auth.confirm_email(&query.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ForgotPasswordResponse>> {
    let reset_link = state.auth.forgot_password(&request.email).await?;
    Ok(Json(ForgotPasswordResponse { reset_link }))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    Json(request): Json<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    request.validate()?;
    state
        .auth
        .reset_password(&query.token, &request.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_password(
    State(state): State<AppState>,
    Json(request): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    request.validate()?;
    state
        .auth
        .change_password(
            &request.username,
            &request.old_password,
            &request.new_password,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Echo the authenticated caller's claims, decoded by the bearer
/// middleware without touching the credential store.
pub async fn me(Extension(claims): Extension<Claims>) -> Json<Claims> {
    Json(claims)
}
