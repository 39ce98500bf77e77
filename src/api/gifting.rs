/// Reservation and contribution endpoints
///
/// Each one acts for either the authenticated account or an anonymous guest
/// named in the request body. List responses are redacted projections that
/// never expose guest identifiers.

use crate::{
    api::validate_body,
    auth::OptionalUser,
    context::AppContext,
    db::models::{Contribution, Reservation, User},
    error::ApiResult,
    gifting::{Actor, CancelRequest, ContributeRequest, ContributionSummary, ReserveRequest},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Redacted reservation projection
#[derive(Debug, Serialize, Deserialize)]
pub struct ReservationView {
    pub id: Uuid,
    pub item_id: Uuid,
    pub is_full_reservation: bool,
    pub reserved_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Redacted contribution projection
#[derive(Debug, Serialize, Deserialize)]
pub struct ContributionView {
    pub id: Uuid,
    pub item_id: Uuid,
    pub amount: f64,
    pub message: Option<String>,
    pub contributor_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContributionListResponse {
    pub contributions: Vec<ContributionView>,
    pub summary: ContributionSummary,
}

fn actor_from(user: Option<&User>, guest_name: Option<String>, guest_identifier: Option<String>) -> Actor {
    match user {
        Some(user) => Actor::Account(user.id),
        None => Actor::Guest {
            name: guest_name,
            identifier: guest_identifier,
        },
    }
}

async fn display_name(ctx: &AppContext, user_id: Option<Uuid>, guest_name: Option<String>) -> ApiResult<Option<String>> {
    match user_id {
        Some(id) => {
            let name: Option<Option<String>> =
                sqlx::query_scalar("SELECT full_name FROM users WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(&ctx.db)
                    .await?;
            Ok(name.flatten())
        }
        None => Ok(guest_name),
    }
}

pub async fn reserve(
    State(ctx): State<AppContext>,
    OptionalUser(user): OptionalUser,
    Path(item_id): Path<Uuid>,
    Json(req): Json<ReserveRequest>,
) -> ApiResult<(StatusCode, Json<ReservationView>)> {
    validate_body(&req)?;

    let actor = actor_from(user.as_ref(), req.guest_name, req.guest_identifier);
    let reservation = ctx.reservations.reserve(item_id, &actor).await?;
    let view = reservation_view(&ctx, reservation).await?;

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list_reservations(
    State(ctx): State<AppContext>,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ReservationView>>> {
    let mut views = Vec::new();
    for reservation in ctx.reservations.list(item_id).await? {
        views.push(reservation_view(&ctx, reservation).await?);
    }

    Ok(Json(views))
}

pub async fn cancel_reservation(
    State(ctx): State<AppContext>,
    OptionalUser(user): OptionalUser,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelRequest>>,
) -> ApiResult<StatusCode> {
    // Account callers may omit the body entirely.
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let actor = actor_from(user.as_ref(), None, req.guest_identifier);
    ctx.reservations.cancel(id, &actor).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn contribute(
    State(ctx): State<AppContext>,
    OptionalUser(user): OptionalUser,
    Path(item_id): Path<Uuid>,
    Json(req): Json<ContributeRequest>,
) -> ApiResult<(StatusCode, Json<ContributionView>)> {
    validate_body(&req)?;

    let actor = actor_from(user.as_ref(), req.guest_name, req.guest_identifier);
    let (contribution, _) = ctx
        .contributions
        .contribute(item_id, req.amount, req.message, &actor)
        .await?;
    let view = contribution_view(&ctx, contribution).await?;

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list_contributions(
    State(ctx): State<AppContext>,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<ContributionListResponse>> {
    let price: Option<f64> = sqlx::query_scalar("SELECT price FROM items WHERE id = ?1")
        .bind(item_id)
        .fetch_optional(&ctx.db)
        .await?
        .flatten();

    let mut contributions = Vec::new();
    for contribution in ctx.contributions.list(item_id).await? {
        contributions.push(contribution_view(&ctx, contribution).await?);
    }

    let summary = ctx.contributions.summarize(item_id, price).await?;

    Ok(Json(ContributionListResponse {
        contributions,
        summary,
    }))
}

pub async fn remove_contribution(
    State(ctx): State<AppContext>,
    OptionalUser(user): OptionalUser,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelRequest>>,
) -> ApiResult<Json<ContributionSummary>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let actor = actor_from(user.as_ref(), None, req.guest_identifier);
    let summary = ctx.contributions.remove(id, &actor).await?;

    Ok(Json(summary))
}

async fn reservation_view(ctx: &AppContext, r: Reservation) -> ApiResult<ReservationView> {
    let reserved_by = display_name(ctx, r.user_id, r.guest_name).await?;
    Ok(ReservationView {
        id: r.id,
        item_id: r.item_id,
        is_full_reservation: r.is_full_reservation,
        reserved_by,
        created_at: r.created_at,
    })
}

async fn contribution_view(ctx: &AppContext, c: Contribution) -> ApiResult<ContributionView> {
    let contributor_name = display_name(ctx, c.user_id, c.guest_name).await?;
    Ok(ContributionView {
        id: c.id,
        item_id: c.item_id,
        amount: c.amount,
        message: c.message,
        contributor_name,
        created_at: c.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gifting::tests::{seed_item, seed_wishlist, GroupGift};
    use chrono::Utc;

    async fn seed_account(ctx: &AppContext, name: &str) -> User {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, full_name, created_at, updated_at)
             VALUES (?1, ?2, 'x', ?3, ?4, ?4)",
        )
        .bind(id)
        .bind(format!("{}@example.com", id))
        .bind(name)
        .bind(Utc::now())
        .execute(&ctx.db)
        .await
        .unwrap();

        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_one(&ctx.db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn account_cancels_reservation_without_a_body() {
        let ctx = AppContext::for_tests().await;
        let (_, wishlist) = seed_wishlist(&ctx.db, true).await;
        let item = seed_item(&ctx.db, wishlist, None, GroupGift::No).await;
        let claimant = seed_account(&ctx, "Claimant").await;

        let reservation = ctx
            .reservations
            .reserve(item, &Actor::Account(claimant.id))
            .await
            .unwrap();

        let status = cancel_reservation(
            State(ctx.clone()),
            OptionalUser(Some(claimant)),
            Path(reservation.id),
            None,
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(ctx.reservations.list(item).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn account_removes_contribution_without_a_body() {
        let ctx = AppContext::for_tests().await;
        let (_, wishlist) = seed_wishlist(&ctx.db, true).await;
        let item = seed_item(&ctx.db, wishlist, Some(100.0), GroupGift::Yes).await;
        let contributor = seed_account(&ctx, "Contributor").await;

        let (contribution, _) = ctx
            .contributions
            .contribute(item, 25.0, None, &Actor::Account(contributor.id))
            .await
            .unwrap();

        let Json(summary) = remove_contribution(
            State(ctx.clone()),
            OptionalUser(Some(contributor)),
            Path(contribution.id),
            None,
        )
        .await
        .unwrap();

        assert_eq!(summary.total, 0.0);
        assert_eq!(summary.count, 0);
    }

    #[tokio::test]
    async fn guest_cancellation_still_requires_its_identifier() {
        let ctx = AppContext::for_tests().await;
        let (_, wishlist) = seed_wishlist(&ctx.db, true).await;
        let item = seed_item(&ctx.db, wishlist, None, GroupGift::No).await;

        let reservation = ctx
            .reservations
            .reserve(
                item,
                &Actor::Guest {
                    name: Some("Amy".into()),
                    identifier: Some("dev-1".into()),
                },
            )
            .await
            .unwrap();

        // An anonymous caller with no body cannot cancel someone's claim.
        let result = cancel_reservation(
            State(ctx.clone()),
            OptionalUser(None),
            Path(reservation.id),
            None,
        )
        .await;
        assert!(result.is_err());

        let status = cancel_reservation(
            State(ctx.clone()),
            OptionalUser(None),
            Path(reservation.id),
            Some(Json(CancelRequest {
                guest_identifier: Some("dev-1".into()),
            })),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
