/// Item autofill endpoint
use crate::{
    api::validate_body,
    auth::CurrentUser,
    autofill::AutofillResult,
    context::AppContext,
    error::ApiResult,
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AutofillRequest {
    #[validate(url)]
    pub url: String,
}

/// Fetch product metadata for a URL; failures return empty fields, never an
/// error
pub async fn fetch_metadata(
    State(ctx): State<AppContext>,
    CurrentUser(_user): CurrentUser,
    Json(req): Json<AutofillRequest>,
) -> ApiResult<Json<AutofillResult>> {
    validate_body(&req)?;

    Ok(Json(ctx.autofill.fetch(&req.url).await))
}
