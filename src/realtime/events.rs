/// Realtime event types broadcast to wishlist rooms
use crate::db::models::Item;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Item projection carried in realtime events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemPayload {
    pub id: Uuid,
    pub wishlist_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub is_group_gift: bool,
    pub priority: Option<String>,
    pub sort_order: i64,
}

impl From<&Item> for ItemPayload {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            wishlist_id: item.wishlist_id,
            name: item.name.clone(),
            description: item.description.clone(),
            url: item.url.clone(),
            image_url: item.image_url.clone(),
            price: item.price,
            is_group_gift: item.is_group_gift,
            priority: item.priority.clone(),
            sort_order: item.sort_order,
        }
    }
}

/// Events fanned out over wishlist WebSocket rooms
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsEvent {
    ItemAdded {
        item: ItemPayload,
    },
    ItemUpdated {
        item: ItemPayload,
    },
    ItemDeleted {
        item_id: Uuid,
    },
    ItemsReordered {
        item_ids: Vec<Uuid>,
    },
    ItemReserved {
        item_id: Uuid,
        reserved_by: Option<String>,
    },
    ItemUnreserved {
        item_id: Uuid,
    },
    ContributionAdded {
        item_id: Uuid,
        amount: f64,
        total_contributed: f64,
        progress: f64,
    },
    ContributionRemoved {
        item_id: Uuid,
        total_contributed: f64,
        progress: f64,
    },
    WishlistDeleted {
        wishlist_id: Uuid,
    },
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_snake_case_type_tag() {
        let event = WsEvent::ItemDeleted {
            item_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "item_deleted");
        assert_eq!(json["item_id"], Uuid::nil().to_string());

        let pong = serde_json::to_value(WsEvent::Pong).unwrap();
        assert_eq!(pong["type"], "pong");
    }

    #[test]
    fn contribution_event_carries_aggregates() {
        let event = WsEvent::ContributionAdded {
            item_id: Uuid::nil(),
            amount: 20.0,
            total_contributed: 100.0,
            progress: 100.0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "contribution_added");
        assert_eq!(json["progress"], 100.0);
    }
}
