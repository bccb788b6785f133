//! Message pipeline: send, edit, delete, all fanning out to the room's
//! current subscribers.
//!
//! The hub lock is held across persist + fan-out so every subscriber in
//! a room observes events in the order they committed to the store.
//! Cross-room ordering is not promised.

use uuid::Uuid;

use crate::AppState;
use crate::chat::connection::ConnectionId;
use crate::chat::event::{MessageView, ServerEvent};
use crate::chat::presence::ACTIVITY_THROTTLE_MS;
use crate::db::{self, MAX_CONTENT_LEN, MessageRecord};
use crate::error::{ChatError, ChatResult};
use crate::now_ms;
use crate::rooms::registry;

pub const HISTORY_LIMIT: i64 = 100;

fn validate_content(content: &str) -> ChatResult<()> {
    let len = content.chars().count();
    if len == 0 || len > MAX_CONTENT_LEN {
        return Err(ChatError::Validation(
            "messages are 1-2000 characters".to_owned(),
        ));
    }
    Ok(())
}

pub async fn send(
    state: &AppState,
    conn_id: ConnectionId,
    room_id: &str,
    content: &str,
) -> ChatResult<()> {
    let now = now_ms();
    let mut hub = state.hub.lock().await;
    let identity = hub.identity(conn_id)?.clone();
    // the request's room id is only honored if this connection actually
    // subscribed to it; a spoofed id bounces here
    if hub.current_room(conn_id) != Some(room_id) {
        return Err(ChatError::Validation(
            "join the room before sending to it".to_owned(),
        ));
    }
    if !hub.limiter.check_and_stamp(conn_id, now) {
        return Err(ChatError::RateLimited);
    }
    validate_content(content)?;

    let msg = MessageRecord {
        id: Uuid::now_v7().to_string(),
        room_id: room_id.to_owned(),
        user_id: identity.user_id,
        username: identity.username,
        content: content.to_owned(),
        created_at: now,
        edited_at: None,
        deleted_at: None,
    };
    db::insert_message(&state.db_pool, &msg).await?;
    registry::touch(&state.db_pool, room_id, now).await?;

    hub.presence.touch(room_id, conn_id, now);
    hub.fan_out(
        room_id,
        ServerEvent::Message {
            message: MessageView::from(&msg),
        },
    );
    hub.broadcast_presence(room_id, ACTIVITY_THROTTLE_MS, now);
    Ok(())
}

pub async fn edit(
    state: &AppState,
    conn_id: ConnectionId,
    message_id: &str,
    content: &str,
) -> ChatResult<()> {
    let now = now_ms();
    let hub = state.hub.lock().await;
    let identity = hub.identity(conn_id)?.clone();
    validate_content(content)?;

    // absence may just mean the retention window expired it
    let Some(mut msg) = db::message_by_id(&state.db_pool, message_id).await? else {
        return Err(ChatError::NotFound("message"));
    };
    if msg.user_id != identity.user_id {
        return Err(ChatError::Authorization(
            "only the author can edit a message".to_owned(),
        ));
    }
    if msg.deleted_at.is_some() {
        return Err(ChatError::Validation(
            "deleted messages cannot be edited".to_owned(),
        ));
    }

    db::apply_edit(&state.db_pool, message_id, content, now).await?;
    msg.content = content.to_owned();
    msg.edited_at = Some(now);
    hub.fan_out(
        &msg.room_id,
        ServerEvent::MessageUpdated {
            message: MessageView::from(&msg),
        },
    );
    Ok(())
}

/// Author-only soft delete. Deleting twice is a no-op that still
/// re-emits the deletion event with the original timestamp.
pub async fn delete(state: &AppState, conn_id: ConnectionId, message_id: &str) -> ChatResult<()> {
    let now = now_ms();
    let hub = state.hub.lock().await;
    let identity = hub.identity(conn_id)?.clone();

    let Some(msg) = db::message_by_id(&state.db_pool, message_id).await? else {
        return Err(ChatError::NotFound("message"));
    };
    if msg.user_id != identity.user_id {
        return Err(ChatError::Authorization(
            "only the author can delete a message".to_owned(),
        ));
    }

    let deleted_at = match msg.deleted_at {
        Some(t) => t,
        None => {
            db::apply_delete(&state.db_pool, message_id, now).await?;
            now
        }
    };
    // deliberately minimal: no content rides a deletion
    hub.fan_out(
        &msg.room_id,
        ServerEvent::MessageDeleted {
            id: msg.id.clone(),
            room_id: msg.room_id.clone(),
            user_id: msg.user_id.clone(),
            deleted_at,
        },
    );
    Ok(())
}
