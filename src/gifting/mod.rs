/// Reservations and contributions
///
/// Both operate on behalf of either an authenticated account or an anonymous
/// guest, and broadcast every mutation to the owning wishlist's room.

mod contributions;
mod reservations;

pub use contributions::{ContributionLedger, ContributionSummary};
pub use reservations::ReservationManager;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Who is reserving, contributing, or cancelling
///
/// Guests are trusted on the strength of their client-supplied identifier
/// alone; whoever holds the identifier can cancel.
#[derive(Debug, Clone, PartialEq)]
pub enum Actor {
    Account(Uuid),
    Guest {
        name: Option<String>,
        identifier: Option<String>,
    },
}

impl Actor {
    pub fn account_id(&self) -> Option<Uuid> {
        match self {
            Actor::Account(id) => Some(*id),
            Actor::Guest { .. } => None,
        }
    }

    pub fn guest_name(&self) -> Option<&str> {
        match self {
            Actor::Account(_) => None,
            Actor::Guest { name, .. } => name.as_deref(),
        }
    }

    pub fn guest_identifier(&self) -> Option<&str> {
        match self {
            Actor::Account(_) => None,
            Actor::Guest { identifier, .. } => identifier.as_deref(),
        }
    }
}

/// Reservation request body; guest fields are ignored for account callers
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct ReserveRequest {
    #[validate(length(max = 255))]
    pub guest_name: Option<String>,
    #[validate(length(max = 255))]
    pub guest_identifier: Option<String>,
}

/// Contribution request body
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContributeRequest {
    pub amount: f64,
    #[validate(length(max = 500))]
    pub message: Option<String>,
    #[validate(length(max = 255))]
    pub guest_name: Option<String>,
    #[validate(length(max = 255))]
    pub guest_identifier: Option<String>,
}

/// Cancellation body carrying the guest identifier for anonymous callers
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CancelRequest {
    pub guest_identifier: Option<String>,
}

use crate::db::models::{Item, Wishlist};
use crate::error::{ApiError, ApiResult};
use sqlx::SqlitePool;

/// Load an item open to gifting along with its wishlist, rejecting the
/// actors and states common to reservation and contribution
///
/// Soft-deleted items read as missing. The wishlist owner can never act on
/// their own items, and guests must supply a display name.
pub(crate) async fn load_gift_target(
    db: &SqlitePool,
    item_id: Uuid,
    actor: &Actor,
) -> ApiResult<(Item, Wishlist)> {
    let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = ?1 AND is_deleted = 0")
        .bind(item_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;

    let wishlist = sqlx::query_as::<_, Wishlist>("SELECT * FROM wishlists WHERE id = ?1")
        .bind(item.wishlist_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Wishlist not found".to_string()))?;

    if !wishlist.is_active {
        return Err(ApiError::InvalidState(
            "Wishlist is no longer active".to_string(),
        ));
    }

    if actor.account_id() == Some(wishlist.user_id) {
        return Err(ApiError::Forbidden(
            "Owners cannot act on their own items".to_string(),
        ));
    }

    if matches!(actor, Actor::Guest { name, .. } if name.as_deref().map_or(true, str::is_empty)) {
        return Err(ApiError::InvalidInput("Guest name is required".to_string()));
    }

    Ok((item, wishlist))
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Utc;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    pub enum GroupGift {
        Yes,
        No,
    }

    /// Seed an owner and one wishlist, returning (owner_id, wishlist_id)
    pub async fn seed_wishlist(db: &SqlitePool, active: bool) -> (Uuid, Uuid) {
        let owner = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, created_at, updated_at)
             VALUES (?1, ?2, 'x', ?3, ?3)",
        )
        .bind(owner)
        .bind(format!("{}@example.com", owner))
        .bind(Utc::now())
        .execute(db)
        .await
        .unwrap();

        let wishlist = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO wishlists (id, user_id, title, share_token, is_active,
                                    created_at, updated_at)
             VALUES (?1, ?2, 'List', ?3, ?4, ?5, ?5)",
        )
        .bind(wishlist)
        .bind(owner)
        .bind(wishlist.to_string())
        .bind(active)
        .bind(Utc::now())
        .execute(db)
        .await
        .unwrap();

        (owner, wishlist)
    }

    pub async fn seed_item(
        db: &SqlitePool,
        wishlist: Uuid,
        price: Option<f64>,
        group: GroupGift,
    ) -> Uuid {
        let item = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO items (id, wishlist_id, name, price, is_group_gift, is_deleted,
                                sort_order, created_at, updated_at)
             VALUES (?1, ?2, 'Item', ?3, ?4, 0, 0, ?5, ?5)",
        )
        .bind(item)
        .bind(wishlist)
        .bind(price)
        .bind(matches!(group, GroupGift::Yes))
        .bind(Utc::now())
        .execute(db)
        .await
        .unwrap();

        item
    }
}
