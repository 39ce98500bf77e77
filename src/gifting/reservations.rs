/// Item reservations
///
/// Non-group items take a single full reservation; the partial unique index
/// on full reservations is the authority under concurrent claims. Group
/// items accept any number of non-full reservations alongside contributions.

use crate::{
    db::models::Reservation,
    error::{is_unique_violation, ApiError, ApiResult},
    gifting::{load_gift_target, Actor},
    realtime::{RoomRegistry, WsEvent},
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Reservation manager service
pub struct ReservationManager {
    db: SqlitePool,
    rooms: Arc<RoomRegistry>,
}

impl ReservationManager {
    pub fn new(db: SqlitePool, rooms: Arc<RoomRegistry>) -> Self {
        Self { db, rooms }
    }

    /// Reserve an item for the acting account or guest
    pub async fn reserve(&self, item_id: Uuid, actor: &Actor) -> ApiResult<Reservation> {
        let (item, wishlist) = load_gift_target(&self.db, item_id, actor).await?;

        let full_reservation = !item.is_group_gift;
        if full_reservation && self.find_full_reservation(item_id).await?.is_some() {
            return Err(ApiError::Conflict("Item is already reserved".to_string()));
        }

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO reservations (id, item_id, user_id, guest_name, guest_identifier,
                                       is_full_reservation, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(id)
        .bind(item_id)
        .bind(actor.account_id())
        .bind(actor.guest_name())
        .bind(actor.guest_identifier())
        .bind(full_reservation)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(|e| {
            // Two claims can pass the pre-check before either commits; the
            // unique index decides the winner.
            if is_unique_violation(&e) {
                ApiError::Conflict("Item is already reserved".to_string())
            } else {
                ApiError::Database(e)
            }
        })?;

        let reservation = self.get(id).await?;
        let reserved_by = self.display_name(&reservation).await?;

        self.rooms.broadcast(
            wishlist.id,
            &WsEvent::ItemReserved {
                item_id,
                reserved_by,
            },
        );

        Ok(reservation)
    }

    /// Cancel a reservation on behalf of whoever created it
    pub async fn cancel(&self, reservation_id: Uuid, actor: &Actor) -> ApiResult<()> {
        let reservation = self.get(reservation_id).await?;

        let permitted = match actor {
            Actor::Account(id) => reservation.user_id == Some(*id),
            Actor::Guest { identifier, .. } => {
                identifier.is_some()
                    && reservation.guest_identifier.as_deref() == identifier.as_deref()
            }
        };
        if !permitted {
            return Err(ApiError::Forbidden(
                "Only the reserver can cancel this reservation".to_string(),
            ));
        }

        sqlx::query("DELETE FROM reservations WHERE id = ?1")
            .bind(reservation_id)
            .execute(&self.db)
            .await?;

        let wishlist_id: Uuid = sqlx::query_scalar("SELECT wishlist_id FROM items WHERE id = ?1")
            .bind(reservation.item_id)
            .fetch_one(&self.db)
            .await?;

        self.rooms.broadcast(
            wishlist_id,
            &WsEvent::ItemUnreserved {
                item_id: reservation.item_id,
            },
        );

        Ok(())
    }

    /// All reservations for an item
    pub async fn list(&self, item_id: Uuid) -> ApiResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE item_id = ?1 ORDER BY created_at",
        )
        .bind(item_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    async fn find_full_reservation(&self, item_id: Uuid) -> ApiResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE item_id = ?1 AND is_full_reservation = 1",
        )
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }

    async fn get(&self, id: Uuid) -> ApiResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))
    }

    async fn display_name(&self, reservation: &Reservation) -> ApiResult<Option<String>> {
        match reservation.user_id {
            Some(user_id) => {
                let name: Option<Option<String>> =
                    sqlx::query_scalar("SELECT full_name FROM users WHERE id = ?1")
                        .bind(user_id)
                        .fetch_optional(&self.db)
                        .await?;
                Ok(name.flatten())
            }
            None => Ok(reservation.guest_name.clone()),
        }
    }
}
