/// Wishlist manager using runtime sqlx queries
use crate::{
    db::models::{Item, User, Wishlist},
    error::{ApiError, ApiResult},
    realtime::{ItemPayload, RoomRegistry, WsEvent},
    wishlist::{
        funding_progress, CreateItemRequest, CreateWishlistRequest, PublicItem, PublicWishlist,
        ReorderRequest, UpdateItemRequest, UpdateWishlistRequest, WishlistDetail,
    },
};
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Wishlist manager service
pub struct WishlistManager {
    db: SqlitePool,
    rooms: Arc<RoomRegistry>,
}

#[derive(FromRow)]
struct PublicItemRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    url: Option<String>,
    image_url: Option<String>,
    price: Option<f64>,
    is_group_gift: bool,
    priority: Option<String>,
    sort_order: i64,
    is_reserved: bool,
    total_contributed: f64,
    contribution_count: i64,
}

impl WishlistManager {
    pub fn new(db: SqlitePool, rooms: Arc<RoomRegistry>) -> Self {
        Self { db, rooms }
    }

    /// Create a wishlist with a fresh share token
    pub async fn create_wishlist(
        &self,
        owner: Uuid,
        req: &CreateWishlistRequest,
    ) -> ApiResult<Wishlist> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let share_token = generate_share_token();

        sqlx::query(
            "INSERT INTO wishlists (id, user_id, title, description, occasion, event_date,
                                    share_token, is_active, theme, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9, ?10)",
        )
        .bind(id)
        .bind(owner)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.occasion)
        .bind(req.event_date)
        .bind(&share_token)
        .bind(&req.theme)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        self.find_owned(id, owner).await
    }

    /// List the caller's wishlists, newest first
    pub async fn list_wishlists(&self, owner: Uuid) -> ApiResult<Vec<Wishlist>> {
        let wishlists = sqlx::query_as::<_, Wishlist>(
            "SELECT * FROM wishlists WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .bind(owner)
        .fetch_all(&self.db)
        .await?;

        Ok(wishlists)
    }

    /// Get a wishlist with its active items
    pub async fn get_wishlist(&self, id: Uuid, owner: Uuid) -> ApiResult<WishlistDetail> {
        let wishlist = self.find_owned(id, owner).await?;
        let items = self.active_items(id).await?;

        Ok(WishlistDetail { wishlist, items })
    }

    /// Update wishlist fields; absent fields keep their value
    pub async fn update_wishlist(
        &self,
        id: Uuid,
        owner: Uuid,
        req: &UpdateWishlistRequest,
    ) -> ApiResult<Wishlist> {
        let current = self.find_owned(id, owner).await?;

        sqlx::query(
            "UPDATE wishlists
             SET title = ?1, description = ?2, occasion = ?3, event_date = ?4,
                 is_active = ?5, theme = ?6, updated_at = ?7
             WHERE id = ?8",
        )
        .bind(req.title.as_ref().unwrap_or(&current.title))
        .bind(req.description.as_ref().or(current.description.as_ref()))
        .bind(req.occasion.as_ref().or(current.occasion.as_ref()))
        .bind(req.event_date.or(current.event_date))
        .bind(req.is_active.unwrap_or(current.is_active))
        .bind(req.theme.as_ref().or(current.theme.as_ref()))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await?;

        self.find_owned(id, owner).await
    }

    /// Delete a wishlist and everything under it
    pub async fn delete_wishlist(&self, id: Uuid, owner: Uuid) -> ApiResult<()> {
        self.find_owned(id, owner).await?;

        // Items, reservations, and contributions go with it (FK cascade).
        sqlx::query("DELETE FROM wishlists WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        self.rooms
            .broadcast(id, &WsEvent::WishlistDeleted { wishlist_id: id });

        Ok(())
    }

    /// Public redacted projection looked up by share token
    pub async fn get_public_wishlist(&self, share_token: &str) -> ApiResult<PublicWishlist> {
        let wishlist = sqlx::query_as::<_, Wishlist>(
            "SELECT * FROM wishlists WHERE share_token = ?1 AND is_active = 1",
        )
        .bind(share_token)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Wishlist not found".to_string()))?;

        let owner = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(wishlist.user_id)
            .fetch_optional(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, PublicItemRow>(
            "SELECT i.id, i.name, i.description, i.url, i.image_url, i.price,
                    i.is_group_gift, i.priority, i.sort_order,
                    EXISTS(SELECT 1 FROM reservations r
                           WHERE r.item_id = i.id AND r.is_full_reservation = 1) AS is_reserved,
                    COALESCE((SELECT SUM(c.amount) FROM contributions c
                              WHERE c.item_id = i.id), 0) AS total_contributed,
                    (SELECT COUNT(*) FROM contributions c
                     WHERE c.item_id = i.id) AS contribution_count
             FROM items i
             WHERE i.wishlist_id = ?1 AND i.is_deleted = 0
             ORDER BY i.sort_order, i.created_at",
        )
        .bind(wishlist.id)
        .fetch_all(&self.db)
        .await?;

        let items = rows
            .into_iter()
            .map(|row| PublicItem {
                progress: funding_progress(row.price, row.total_contributed),
                id: row.id,
                name: row.name,
                description: row.description,
                url: row.url,
                image_url: row.image_url,
                price: row.price,
                is_group_gift: row.is_group_gift,
                priority: row.priority,
                sort_order: row.sort_order,
                is_reserved: row.is_reserved,
                total_contributed: row.total_contributed,
                contribution_count: row.contribution_count,
            })
            .collect();

        Ok(PublicWishlist {
            id: wishlist.id,
            title: wishlist.title,
            description: wishlist.description,
            occasion: wishlist.occasion,
            event_date: wishlist.event_date,
            theme: wishlist.theme,
            owner_name: owner.and_then(|u| u.full_name),
            items,
        })
    }

    /// Add an item at the end of the wishlist
    pub async fn create_item(
        &self,
        wishlist_id: Uuid,
        owner: Uuid,
        req: &CreateItemRequest,
    ) -> ApiResult<Item> {
        self.find_owned(wishlist_id, owner).await?;

        let next_order: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM items
             WHERE wishlist_id = ?1 AND is_deleted = 0",
        )
        .bind(wishlist_id)
        .fetch_one(&self.db)
        .await?;

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO items (id, wishlist_id, name, description, url, image_url, price,
                                is_group_gift, priority, is_deleted, sort_order,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?11, ?12)",
        )
        .bind(id)
        .bind(wishlist_id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(&req.url)
        .bind(&req.image_url)
        .bind(req.price)
        .bind(req.is_group_gift)
        .bind(&req.priority)
        .bind(next_order)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        let item = self.find_active_item(id).await?;

        self.rooms.broadcast(
            wishlist_id,
            &WsEvent::ItemAdded {
                item: ItemPayload::from(&item),
            },
        );

        Ok(item)
    }

    /// Update item fields; absent fields keep their value
    pub async fn update_item(
        &self,
        item_id: Uuid,
        owner: Uuid,
        req: &UpdateItemRequest,
    ) -> ApiResult<Item> {
        let current = self.find_owned_item(item_id, owner).await?;

        sqlx::query(
            "UPDATE items
             SET name = ?1, description = ?2, url = ?3, image_url = ?4, price = ?5,
                 is_group_gift = ?6, priority = ?7, updated_at = ?8
             WHERE id = ?9",
        )
        .bind(req.name.as_ref().unwrap_or(&current.name))
        .bind(req.description.as_ref().or(current.description.as_ref()))
        .bind(req.url.as_ref().or(current.url.as_ref()))
        .bind(req.image_url.as_ref().or(current.image_url.as_ref()))
        .bind(req.price.or(current.price))
        .bind(req.is_group_gift.unwrap_or(current.is_group_gift))
        .bind(req.priority.as_ref().or(current.priority.as_ref()))
        .bind(Utc::now())
        .bind(item_id)
        .execute(&self.db)
        .await?;

        let item = self.find_active_item(item_id).await?;

        self.rooms.broadcast(
            item.wishlist_id,
            &WsEvent::ItemUpdated {
                item: ItemPayload::from(&item),
            },
        );

        Ok(item)
    }

    /// Soft-delete an item, preserving its reservation and contribution rows
    pub async fn delete_item(&self, item_id: Uuid, owner: Uuid) -> ApiResult<()> {
        let item = self.find_owned_item(item_id, owner).await?;

        sqlx::query("UPDATE items SET is_deleted = 1, updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(item_id)
            .execute(&self.db)
            .await?;

        self.rooms
            .broadcast(item.wishlist_id, &WsEvent::ItemDeleted { item_id });

        Ok(())
    }

    /// Reassign sort positions 0..N-1 to the listed items, in list order
    ///
    /// Items not named in the request keep their previous position.
    pub async fn reorder(
        &self,
        wishlist_id: Uuid,
        owner: Uuid,
        req: &ReorderRequest,
    ) -> ApiResult<Vec<Item>> {
        self.find_owned(wishlist_id, owner).await?;

        let active: HashSet<Uuid> = self
            .active_items(wishlist_id)
            .await?
            .into_iter()
            .map(|item| item.id)
            .collect();

        if req.item_ids.iter().any(|id| !active.contains(id)) {
            return Err(ApiError::InvalidInput(
                "Item does not belong to this wishlist".to_string(),
            ));
        }

        let now = Utc::now();
        for (position, item_id) in req.item_ids.iter().enumerate() {
            sqlx::query("UPDATE items SET sort_order = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(position as i64)
                .bind(now)
                .bind(item_id)
                .execute(&self.db)
                .await?;
        }

        self.rooms.broadcast(
            wishlist_id,
            &WsEvent::ItemsReordered {
                item_ids: req.item_ids.clone(),
            },
        );

        self.active_items(wishlist_id).await
    }

    /// Active items in display order
    pub async fn active_items(&self, wishlist_id: Uuid) -> ApiResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            "SELECT * FROM items
             WHERE wishlist_id = ?1 AND is_deleted = 0
             ORDER BY sort_order, created_at",
        )
        .bind(wishlist_id)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    async fn find_owned(&self, id: Uuid, owner: Uuid) -> ApiResult<Wishlist> {
        // Missing and not-owned are indistinguishable to the caller.
        sqlx::query_as::<_, Wishlist>("SELECT * FROM wishlists WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Wishlist not found".to_string()))
    }

    async fn find_active_item(&self, id: Uuid) -> ApiResult<Item> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = ?1 AND is_deleted = 0")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))
    }

    async fn find_owned_item(&self, item_id: Uuid, owner: Uuid) -> ApiResult<Item> {
        let item = self.find_active_item(item_id).await?;
        self.find_owned(item.wishlist_id, owner).await?;

        Ok(item)
    }
}

/// Random URL-safe share token
fn generate_share_token() -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
