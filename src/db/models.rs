/// Database row models
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User account record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Normalized (lower-cased) email, unique across accounts
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    /// External identity binding; both halves set or neither
    pub oauth_provider: Option<String>,
    pub oauth_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Refresh token record
///
/// Stores only the sha256 hash of the raw token. Rows are revoked on
/// rotation or logout and retained for replay detection, never deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

/// Wishlist record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Wishlist {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub occasion: Option<String>,
    pub event_date: Option<NaiveDate>,
    /// Unguessable token granting public read access
    pub share_token: String,
    pub is_active: bool,
    pub theme: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Wishlist item record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub wishlist_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub is_group_gift: bool,
    pub priority: Option<String>,
    /// Items are soft-deleted to preserve reservation/contribution history
    pub is_deleted: bool,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reservation record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub item_id: Uuid,
    pub user_id: Option<Uuid>,
    pub guest_name: Option<String>,
    pub guest_identifier: Option<String>,
    pub is_full_reservation: bool,
    pub created_at: DateTime<Utc>,
}

/// Contribution record (append/delete only, never mutated)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Contribution {
    pub id: Uuid,
    pub item_id: Uuid,
    pub user_id: Option<Uuid>,
    pub guest_name: Option<String>,
    pub guest_identifier: Option<String>,
    pub amount: f64,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}
