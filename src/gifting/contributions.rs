/// Contribution ledger
///
/// Append-only funding records per item. Amounts are capped at write time to
/// the remaining gap to the item price, and aggregates are recomputed from a
/// fresh read after every mutation.

use crate::{
    db::models::Contribution,
    error::{ApiError, ApiResult},
    gifting::{load_gift_target, Actor},
    realtime::{RoomRegistry, WsEvent},
    wishlist::funding_progress,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Aggregate funding state for one item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionSummary {
    pub item_id: Uuid,
    pub total: f64,
    pub count: i64,
    pub progress: f64,
}

/// Contribution ledger service
pub struct ContributionLedger {
    db: SqlitePool,
    rooms: Arc<RoomRegistry>,
}

impl ContributionLedger {
    pub fn new(db: SqlitePool, rooms: Arc<RoomRegistry>) -> Self {
        Self { db, rooms }
    }

    /// Record a contribution toward a group-gift item
    ///
    /// The stored amount may be lower than requested: it is clamped to the
    /// remaining gap to the item price. The caller learns the actual amount
    /// only from the returned record.
    pub async fn contribute(
        &self,
        item_id: Uuid,
        amount: f64,
        message: Option<String>,
        actor: &Actor,
    ) -> ApiResult<(Contribution, ContributionSummary)> {
        let (item, wishlist) = load_gift_target(&self.db, item_id, actor).await?;

        if !item.is_group_gift {
            return Err(ApiError::InvalidState(
                "Item does not accept contributions".to_string(),
            ));
        }
        if amount <= 0.0 {
            return Err(ApiError::InvalidInput(
                "Contribution amount must be positive".to_string(),
            ));
        }

        // Check-then-act on "remaining" is racy by design: concurrent
        // contributions can overshoot the price by at most one request's
        // clamped amount. Aggregates are recomputed fresh below either way.
        let amount = match item.price {
            Some(price) if price > 0.0 => {
                let remaining = price - self.total_for(item_id).await?;
                if remaining <= 0.0 {
                    return Err(ApiError::InvalidState(
                        "Item is already fully funded".to_string(),
                    ));
                }
                amount.min(remaining)
            }
            _ => amount,
        };

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO contributions (id, item_id, user_id, guest_name, guest_identifier,
                                        amount, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(id)
        .bind(item_id)
        .bind(actor.account_id())
        .bind(actor.guest_name())
        .bind(actor.guest_identifier())
        .bind(amount)
        .bind(&message)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        let contribution = self.get(id).await?;
        let summary = self.summarize(item_id, item.price).await?;

        self.rooms.broadcast(
            wishlist.id,
            &WsEvent::ContributionAdded {
                item_id,
                amount: contribution.amount,
                total_contributed: summary.total,
                progress: summary.progress,
            },
        );

        Ok((contribution, summary))
    }

    /// Remove a contribution on behalf of whoever created it
    pub async fn remove(&self, contribution_id: Uuid, actor: &Actor) -> ApiResult<ContributionSummary> {
        let contribution = self.get(contribution_id).await?;

        let permitted = match actor {
            Actor::Account(id) => contribution.user_id == Some(*id),
            Actor::Guest { identifier, .. } => {
                identifier.is_some() && contribution.guest_identifier.as_deref() == identifier.as_deref()
            }
        };
        if !permitted {
            return Err(ApiError::Forbidden(
                "Only the contributor can remove this contribution".to_string(),
            ));
        }

        sqlx::query("DELETE FROM contributions WHERE id = ?1")
            .bind(contribution_id)
            .execute(&self.db)
            .await?;

        let (price, wishlist_id): (Option<f64>, Uuid) =
            sqlx::query_as("SELECT price, wishlist_id FROM items WHERE id = ?1")
                .bind(contribution.item_id)
                .fetch_one(&self.db)
                .await?;

        let summary = self.summarize(contribution.item_id, price).await?;

        self.rooms.broadcast(
            wishlist_id,
            &WsEvent::ContributionRemoved {
                item_id: contribution.item_id,
                total_contributed: summary.total,
                progress: summary.progress,
            },
        );

        Ok(summary)
    }

    /// All contributions for an item, newest first
    pub async fn list(&self, item_id: Uuid) -> ApiResult<Vec<Contribution>> {
        let rows = sqlx::query_as::<_, Contribution>(
            "SELECT * FROM contributions WHERE item_id = ?1 ORDER BY created_at DESC",
        )
        .bind(item_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Aggregate funding state from a fresh read
    pub async fn summarize(&self, item_id: Uuid, price: Option<f64>) -> ApiResult<ContributionSummary> {
        let (total, count): (f64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0.0), COUNT(*) FROM contributions WHERE item_id = ?1",
        )
        .bind(item_id)
        .fetch_one(&self.db)
        .await?;

        Ok(ContributionSummary {
            item_id,
            total,
            count,
            progress: funding_progress(price, total),
        })
    }

    async fn total_for(&self, item_id: Uuid) -> ApiResult<f64> {
        let total: f64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0.0) FROM contributions WHERE item_id = ?1")
                .bind(item_id)
                .fetch_one(&self.db)
                .await?;

        Ok(total)
    }

    async fn get(&self, id: Uuid) -> ApiResult<Contribution> {
        sqlx::query_as::<_, Contribution>("SELECT * FROM contributions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Contribution not found".to_string()))
    }
}
