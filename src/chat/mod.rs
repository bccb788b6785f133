pub mod connection;
pub mod event;
pub mod join;
pub mod limiter;
pub mod msg;
pub mod presence;
mod ws;

use axum::{Router, routing::get};

use crate::AppState;
use crate::chat::event::ClientEvent;
use crate::error::ChatResult;
use crate::now_ms;

pub use crate::chat::connection::{ChatHub, ConnectionId};

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws::chat_ws))
}

/// Single entry point for every client event. Replies and broadcasts go
/// through the connection queues; errors bubble to the caller, which
/// reports them to the offending connection only.
pub async fn dispatch(state: &AppState, conn_id: ConnectionId, event: ClientEvent) -> ChatResult<()> {
    match event {
        ClientEvent::Authenticate { user_id } => join::authenticate(state, conn_id, &user_id).await,
        ClientEvent::ListPublicRooms => join::list_public_rooms(state, conn_id).await,
        ClientEvent::ListMyPrivateRooms => join::list_my_private_rooms(state, conn_id).await,
        ClientEvent::CreateRoom {
            name,
            is_private,
            password,
        } => join::create_room(state, conn_id, &name, is_private, password.as_deref()).await,
        ClientEvent::GetInvite { room_id } => join::get_invite(state, conn_id, &room_id).await,
        ClientEvent::JoinRoom {
            identifier,
            password,
        } => join::join_room(state, conn_id, &identifier, password.as_deref()).await,
        ClientEvent::LeaveRoom { room_id } => join::leave_room(state, conn_id, &room_id).await,
        ClientEvent::PresenceRequest { room_id } => {
            join::presence_request(state, conn_id, &room_id).await
        }
        ClientEvent::Message { room_id, content } => {
            msg::send(state, conn_id, &room_id, &content).await
        }
        ClientEvent::MessageEdit {
            message_id,
            content,
        } => msg::edit(state, conn_id, &message_id, &content).await,
        ClientEvent::MessageDelete { message_id } => {
            msg::delete(state, conn_id, &message_id).await
        }
    }
}

/// Terminal cleanup for a closed transport: presence, limiter state, the
/// connection itself; the vacated room hears about it immediately.
pub async fn disconnect(state: &AppState, conn_id: ConnectionId) {
    let now = now_ms();
    let mut hub = state.hub.lock().await;
    if let Some(room_id) = hub.presence.on_disconnect(conn_id) {
        hub.broadcast_presence(&room_id, 0, now);
    }
    hub.limiter.forget(conn_id);
    hub.unregister(conn_id);
}
