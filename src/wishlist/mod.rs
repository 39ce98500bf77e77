/// Wishlist and item management
///
/// Owner CRUD, ordering, soft deletion, and the redacted public projection
/// served through share tokens.

mod manager;

pub use manager::WishlistManager;

use crate::db::models::{Item, Wishlist};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Wishlist creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateWishlistRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub occasion: Option<String>,
    pub event_date: Option<NaiveDate>,
    #[validate(length(max = 50))]
    pub theme: Option<String>,
}

/// Partial wishlist update; absent fields keep their value
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateWishlistRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub occasion: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
    #[validate(length(max = 50))]
    pub theme: Option<String>,
}

/// Item creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 2000))]
    pub url: Option<String>,
    #[validate(length(max = 2000))]
    pub image_url: Option<String>,
    pub price: Option<f64>,
    #[serde(default)]
    pub is_group_gift: bool,
    #[validate(length(max = 20))]
    pub priority: Option<String>,
}

/// Partial item update; absent fields keep their value
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 2000))]
    pub url: Option<String>,
    #[validate(length(max = 2000))]
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub is_group_gift: Option<bool>,
    #[validate(length(max = 20))]
    pub priority: Option<String>,
}

/// Full reorder request listing item ids in their new display order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub item_ids: Vec<Uuid>,
}

/// Wishlist with its active items, returned to the owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistDetail {
    #[serde(flatten)]
    pub wishlist: Wishlist,
    pub items: Vec<Item>,
}

/// Redacted item projection for unauthenticated share-token access
///
/// Exposes aggregate reservation and funding state only; reserver and
/// contributor identities stay private.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub is_group_gift: bool,
    pub priority: Option<String>,
    pub sort_order: i64,
    pub is_reserved: bool,
    pub total_contributed: f64,
    pub contribution_count: i64,
    pub progress: f64,
}

/// Redacted wishlist projection for unauthenticated share-token access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicWishlist {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub occasion: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub theme: Option<String>,
    pub owner_name: Option<String>,
    pub items: Vec<PublicItem>,
}

/// Funding progress as a percentage clamped to [0, 100]
///
/// Items without a positive price report 0 regardless of contributions.
pub fn funding_progress(price: Option<f64>, total: f64) -> f64 {
    match price {
        Some(price) if price > 0.0 => (total / price * 100.0).clamp(0.0, 100.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_clamps_to_bounds() {
        assert_eq!(funding_progress(Some(100.0), 0.0), 0.0);
        assert_eq!(funding_progress(Some(100.0), 50.0), 50.0);
        assert_eq!(funding_progress(Some(100.0), 100.0), 100.0);
        // Overshoot from concurrent contributions still reports 100.
        assert_eq!(funding_progress(Some(100.0), 120.0), 100.0);
    }

    #[test]
    fn progress_is_zero_without_a_price() {
        assert_eq!(funding_progress(None, 50.0), 0.0);
        assert_eq!(funding_progress(Some(0.0), 50.0), 0.0);
    }
}
