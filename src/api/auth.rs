/// Auth endpoints
use crate::{
    account::{
        GoogleLoginRequest, LoginRequest, RefreshRequest, RefreshResponse, RegisterRequest,
        TokenResponse, UpdateProfileRequest, UserProfile,
    },
    api::validate_body,
    auth::CurrentUser,
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};

pub async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    validate_body(&req)?;

    let (user, tokens) = ctx
        .accounts
        .register(&req.email, &req.password, req.full_name)
        .await?;

    tracing::info!(user_id = %user.id, "account registered");

    Ok((StatusCode::CREATED, Json(TokenResponse::new(tokens, &user))))
}

pub async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    validate_body(&req)?;

    let (user, tokens) = ctx.accounts.login(&req.email, &req.password).await?;

    Ok(Json(TokenResponse::new(tokens, &user)))
}

pub async fn google_login(
    State(ctx): State<AppContext>,
    Json(req): Json<GoogleLoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    validate_body(&req)?;

    let verifier = ctx.google.as_ref().ok_or_else(|| {
        ApiError::InvalidState("Google login is not configured".to_string())
    })?;

    let claims = verifier.verify(&req.id_token).await?;
    let (user, tokens) = ctx.accounts.login_google(&claims).await?;

    tracing::info!(user_id = %user.id, "google login");

    Ok(Json(TokenResponse::new(tokens, &user)))
}

pub async fn refresh(
    State(ctx): State<AppContext>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let (_, tokens) = ctx.accounts.refresh_session(&req.refresh_token).await?;

    Ok(Json(RefreshResponse {
        access_token: tokens.access,
        refresh_token: tokens.refresh,
        token_type: "bearer".to_string(),
    }))
}

pub async fn logout(
    State(ctx): State<AppContext>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<StatusCode> {
    ctx.accounts.logout(&req.refresh_token).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}

pub async fn update_me(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    validate_body(&req)?;

    let updated = ctx.accounts.update_profile(user.id, &req).await?;

    Ok(Json(UserProfile::from(&updated)))
}
