//! Session and room event handlers: authenticate, room listing and
//! creation, join/leave, presence requests.

use crate::AppState;
use crate::chat::connection::ConnectionId;
use crate::chat::event::{MessageView, RoomView, ServerEvent};
use crate::chat::msg::HISTORY_LIMIT;
use crate::db;
use crate::error::{ChatError, ChatResult};
use crate::identity;
use crate::now_ms;
use crate::rooms::{access, registry};

pub async fn authenticate(state: &AppState, conn_id: ConnectionId, user_id: &str) -> ChatResult<()> {
    let Some(identity) = identity::lookup(&state.db_pool, user_id).await? else {
        return Err(ChatError::AuthenticationRequired);
    };
    let mut hub = state.hub.lock().await;
    hub.bind_identity(conn_id, identity.clone())?;
    hub.send_to(
        conn_id,
        ServerEvent::Authenticated {
            user_id: identity.user_id,
            username: identity.username,
        },
    );
    Ok(())
}

pub async fn list_public_rooms(state: &AppState, conn_id: ConnectionId) -> ChatResult<()> {
    {
        state.hub.lock().await.identity(conn_id)?;
    }
    let rooms = registry::list_public(&state.db_pool).await?;
    let rooms = rooms
        .iter()
        .map(|room| RoomView::from_record(room, false))
        .collect();
    let hub = state.hub.lock().await;
    hub.send_to(conn_id, ServerEvent::Rooms { rooms });
    Ok(())
}

pub async fn list_my_private_rooms(state: &AppState, conn_id: ConnectionId) -> ChatResult<()> {
    let identity = { state.hub.lock().await.identity(conn_id)?.clone() };
    let rooms = registry::list_private_for(&state.db_pool, &identity.user_id).await?;
    let rooms = rooms
        .iter()
        .map(|room| RoomView::from_record(room, true))
        .collect();
    let hub = state.hub.lock().await;
    hub.send_to(conn_id, ServerEvent::PrivateRooms { rooms });
    Ok(())
}

pub async fn create_room(
    state: &AppState,
    conn_id: ConnectionId,
    name: &str,
    is_private: bool,
    password: Option<&str>,
) -> ChatResult<()> {
    let identity = { state.hub.lock().await.identity(conn_id)?.clone() };
    let room =
        registry::create_room(&state.db_pool, &identity.user_id, name, is_private, password)
            .await?;
    tracing::info!(room = %room.name, private = room.is_private, by = %identity.user_id, "room created");
    let hub = state.hub.lock().await;
    hub.send_to(
        conn_id,
        ServerEvent::RoomCreated {
            room: RoomView::from_record(&room, false),
            invite_code: room.invite_code.clone(),
        },
    );
    Ok(())
}

pub async fn get_invite(state: &AppState, conn_id: ConnectionId, room_id: &str) -> ChatResult<()> {
    let identity = { state.hub.lock().await.identity(conn_id)?.clone() };
    let Some(room) = db::room_by_id(&state.db_pool, room_id).await? else {
        return Err(ChatError::NotFound("room"));
    };
    let invite_code = access::invite_code_for(&room, &identity.user_id)?.to_owned();
    let hub = state.hub.lock().await;
    hub.send_to(
        conn_id,
        ServerEvent::Invite {
            room_id: room.id,
            invite_code,
        },
    );
    Ok(())
}

/// Resolve, authorize, switch the connection's room, register presence,
/// and reply with recent history. Joining implicitly leaves any previous
/// room and broadcasts that room's updated view.
pub async fn join_room(
    state: &AppState,
    conn_id: ConnectionId,
    identifier: &str,
    password: Option<&str>,
) -> ChatResult<()> {
    let now = now_ms();
    let identity = { state.hub.lock().await.identity(conn_id)?.clone() };

    let room = access::resolve_room(&state.db_pool, identifier).await?;
    access::authorize_join(&room, identifier, password)?;

    // sends hold the hub across persist + fan-out, so taking it before
    // the history snapshot means no message can land between the
    // snapshot and this connection's subscription
    let mut hub = state.hub.lock().await;
    let history = db::history(&state.db_pool, &room.id, HISTORY_LIMIT).await?;
    registry::touch(&state.db_pool, &room.id, now).await?;
    let vacated = hub
        .presence
        .join(&room.id, conn_id, &identity.user_id, &identity.username, now);
    if let Some(prev) = vacated {
        hub.broadcast_presence(&prev, 0, now);
    }
    hub.set_current_room(conn_id, Some(room.id.clone()));
    hub.send_to(
        conn_id,
        ServerEvent::Joined {
            room: RoomView::from_record(&room, false),
            messages: history.iter().map(MessageView::from).collect(),
        },
    );
    hub.broadcast_presence(&room.id, 0, now);
    Ok(())
}

pub async fn leave_room(state: &AppState, conn_id: ConnectionId, room_id: &str) -> ChatResult<()> {
    let now = now_ms();
    let mut hub = state.hub.lock().await;
    hub.identity(conn_id)?;
    let was_member = hub.presence.leave(room_id, conn_id);
    if hub.current_room(conn_id) == Some(room_id) {
        hub.set_current_room(conn_id, None);
    }
    hub.send_to(
        conn_id,
        ServerEvent::Left {
            room_id: room_id.to_owned(),
        },
    );
    // a connection that was never in the room gets its ack and nothing
    // else; only real departures disturb the room
    if was_member {
        hub.broadcast_presence(room_id, 0, now);
    }
    Ok(())
}

/// Direct reply with the room's current view; no broadcast, no throttle.
pub async fn presence_request(
    state: &AppState,
    conn_id: ConnectionId,
    room_id: &str,
) -> ChatResult<()> {
    let now = now_ms();
    let hub = state.hub.lock().await;
    hub.identity(conn_id)?;
    let users = hub.presence.compute_view(room_id, now);
    hub.send_to(
        conn_id,
        ServerEvent::Presence {
            room_id: room_id.to_owned(),
            users,
        },
    );
    Ok(())
}
