/// HTTP API surface
///
/// All routes mounted under /api/v1, plus the WebSocket endpoint wired up
/// separately by the server.

pub mod auth;
pub mod autofill;
pub mod gifting;
pub mod realtime;
pub mod wishlists;

use crate::{context::AppContext, error::ApiError};
use axum::{
    routing::{delete, get, post},
    Router,
};
use validator::Validate;

/// Validate a request body, mapping field errors into the API taxonomy
pub(crate) fn validate_body<T: Validate>(body: &T) -> Result<(), ApiError> {
    body.validate()
        .map_err(|e| ApiError::InvalidInput(e.to_string()))
}

pub fn routes() -> Router<AppContext> {
    Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/google", post(auth::google_login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me).patch(auth::update_me))
        // Wishlists and items
        .route("/wishlists", get(wishlists::list).post(wishlists::create))
        .route(
            "/wishlists/:id",
            get(wishlists::get)
                .patch(wishlists::update)
                .delete(wishlists::remove),
        )
        .route("/wishlists/:id/reorder", post(wishlists::reorder))
        .route("/wishlists/:id/items", post(wishlists::create_item))
        .route("/wishlists/public/:share_token", get(wishlists::public))
        .route(
            "/items/:id",
            axum::routing::patch(wishlists::update_item).delete(wishlists::remove_item),
        )
        // Reservations and contributions
        .route("/items/:id/reserve", post(gifting::reserve))
        .route("/items/:id/reservations", get(gifting::list_reservations))
        .route("/reservations/:id", delete(gifting::cancel_reservation))
        .route(
            "/items/:id/contributions",
            get(gifting::list_contributions).post(gifting::contribute),
        )
        .route("/contributions/:id", delete(gifting::remove_contribution))
        // Autofill
        .route("/autofill", post(autofill::fetch_metadata))
}
