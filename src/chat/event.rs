//! Wire shapes for the connection-scoped event surface. Everything rides
//! one websocket as internally tagged JSON.

use serde::{Deserialize, Serialize};

use crate::db::{MessageRecord, RoomRecord};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Authenticate {
        user_id: String,
    },
    ListPublicRooms,
    ListMyPrivateRooms,
    CreateRoom {
        name: String,
        is_private: bool,
        #[serde(default)]
        password: Option<String>,
    },
    GetInvite {
        room_id: String,
    },
    JoinRoom {
        identifier: String,
        #[serde(default)]
        password: Option<String>,
    },
    LeaveRoom {
        room_id: String,
    },
    PresenceRequest {
        room_id: String,
    },
    Message {
        room_id: String,
        content: String,
    },
    MessageEdit {
        message_id: String,
        content: String,
    },
    MessageDelete {
        message_id: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Authenticated {
        user_id: String,
        username: String,
    },
    Rooms {
        rooms: Vec<RoomView>,
    },
    PrivateRooms {
        rooms: Vec<RoomView>,
    },
    RoomCreated {
        room: RoomView,
        #[serde(skip_serializing_if = "Option::is_none")]
        invite_code: Option<String>,
    },
    Invite {
        room_id: String,
        invite_code: String,
    },
    Joined {
        room: RoomView,
        messages: Vec<MessageView>,
    },
    Left {
        room_id: String,
    },
    Presence {
        room_id: String,
        users: Vec<PresenceUser>,
    },
    Message {
        #[serde(flatten)]
        message: MessageView,
    },
    MessageUpdated {
        #[serde(flatten)]
        message: MessageView,
    },
    MessageDeleted {
        id: String,
        room_id: String,
        user_id: String,
        deleted_at: i64,
    },
    Error {
        kind: String,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomView {
    pub id: String,
    pub name: String,
    pub is_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    pub created_by: String,
    pub created_at: i64,
    pub last_active_at: i64,
}

impl RoomView {
    /// `with_invite` is only set on creator-facing surfaces; the code
    /// never rides a broadcast.
    pub fn from_record(room: &RoomRecord, with_invite: bool) -> Self {
        Self {
            id: room.id.clone(),
            name: room.name.clone(),
            is_private: room.is_private,
            invite_code: with_invite.then(|| room.invite_code.clone()).flatten(),
            created_by: room.created_by.clone(),
            created_at: room.created_at,
            last_active_at: room.last_active_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub username: String,
    pub content: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl From<&MessageRecord> for MessageView {
    fn from(msg: &MessageRecord) -> Self {
        Self {
            id: msg.id.clone(),
            room_id: msg.room_id.clone(),
            user_id: msg.user_id.clone(),
            username: msg.username.clone(),
            content: msg.content.clone(),
            created_at: msg.created_at,
            edited_at: msg.edited_at,
            deleted_at: msg.deleted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PresenceUser {
    pub user_id: String,
    pub username: String,
    pub active: bool,
    pub last_active_at: i64,
}
