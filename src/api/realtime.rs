/// WebSocket endpoint for live wishlist updates
use crate::{
    context::AppContext,
    error::{ApiError, ApiResult},
    realtime::WsEvent,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use uuid::Uuid;

/// Upgrade to a WebSocket subscribed to one wishlist room
pub async fn wishlist_updates(
    ws: WebSocketUpgrade,
    State(ctx): State<AppContext>,
    Path(wishlist_id): Path<Uuid>,
) -> ApiResult<Response> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM wishlists WHERE id = ?1)")
            .bind(wishlist_id)
            .fetch_one(&ctx.db)
            .await?;
    if !exists {
        return Err(ApiError::NotFound("Wishlist not found".to_string()));
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, ctx, wishlist_id)))
}

async fn handle_socket(socket: WebSocket, ctx: AppContext, wishlist_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let (client_id, mut events) = ctx.rooms.connect(wishlist_id);

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(payload) => {
                        if sender.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    // Registry side dropped us (pruned after a failed send).
                    None => break,
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if is_ping_frame(&text) {
                            ctx.rooms.send_direct(wishlist_id, client_id, &WsEvent::Pong);
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    ctx.rooms.disconnect(wishlist_id, client_id);
    tracing::debug!(wishlist_id = %wishlist_id, client_id = %client_id, "websocket closed");
}

/// Keepalive frames arrive as `{"type":"ping"}`; bare `ping` text is
/// tolerated too
fn is_ping_frame(text: &str) -> bool {
    if text.trim().eq_ignore_ascii_case("ping") {
        return true;
    }

    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_string))
        .map_or(false, |t| t == "ping")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_and_bare_ping_frames_are_recognized() {
        assert!(is_ping_frame(r#"{"type":"ping"}"#));
        assert!(is_ping_frame(" {\"type\": \"ping\"} "));
        assert!(is_ping_frame("ping"));
        assert!(is_ping_frame("PING"));

        assert!(!is_ping_frame(r#"{"type":"pong"}"#));
        assert!(!is_ping_frame(r#"{"kind":"ping"}"#));
        assert!(!is_ping_frame("pingpong"));
        assert!(!is_ping_frame(""));
    }

    #[tokio::test]
    async fn ping_frame_draws_a_pong_on_the_same_connection() {
        let ctx = AppContext::for_tests().await;
        let wishlist_id = Uuid::new_v4();

        let (client_id, mut events) = ctx.rooms.connect(wishlist_id);
        let (_, mut bystander) = ctx.rooms.connect(wishlist_id);

        let frame = r#"{"type":"ping"}"#;
        assert!(is_ping_frame(frame));
        ctx.rooms.send_direct(wishlist_id, client_id, &WsEvent::Pong);

        let reply = events.recv().await.unwrap();
        assert_eq!(reply, r#"{"type":"pong"}"#);
        assert!(bystander.try_recv().is_err());
    }
}
