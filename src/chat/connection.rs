//! Live-connection registry. Owns the per-connection outbound queues,
//! the identity bindings, and the single-active-room rule; presence and
//! the rate limiter hang off the same hub so every event handler mutates
//! them under one lock.

use std::collections::HashMap;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::chat::event::ServerEvent;
use crate::chat::limiter::RateLimiter;
use crate::chat::presence::PresenceTracker;
use crate::error::{ChatError, ChatResult};
use crate::identity::Identity;

pub type ConnectionId = Uuid;

#[derive(Debug)]
pub struct Connection {
    sender: mpsc::UnboundedSender<ServerEvent>,
    pub identity: Option<Identity>,
    pub current_room: Option<String>,
}

#[derive(Debug, Default)]
pub struct ChatHub {
    connections: HashMap<ConnectionId, Connection>,
    by_user: HashMap<String, ConnectionId>,
    pub presence: PresenceTracker,
    pub limiter: RateLimiter,
}

impl ChatHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, conn_id: ConnectionId, sender: mpsc::UnboundedSender<ServerEvent>) {
        self.connections.insert(
            conn_id,
            Connection {
                sender,
                identity: None,
                current_room: None,
            },
        );
    }

    /// Binds an identity to the connection and points the user index at
    /// it. Last bind wins: a newer connection for the same user takes
    /// over directed delivery. Rebinding as a different user retires the
    /// old index entry and carries the new identity into any presence
    /// entry the connection already holds.
    pub fn bind_identity(&mut self, conn_id: ConnectionId, identity: Identity) -> ChatResult<()> {
        let conn = self
            .connections
            .get_mut(&conn_id)
            .ok_or(ChatError::NotFound("connection"))?;
        if let Some(old) = conn.identity.replace(identity.clone()) {
            if old.user_id != identity.user_id && self.by_user.get(&old.user_id) == Some(&conn_id)
            {
                self.by_user.remove(&old.user_id);
            }
        }
        self.by_user.insert(identity.user_id.clone(), conn_id);
        if let Some(room_id) = conn.current_room.clone() {
            self.presence
                .rebind(&room_id, conn_id, &identity.user_id, &identity.username);
        }
        Ok(())
    }

    pub fn identity(&self, conn_id: ConnectionId) -> ChatResult<&Identity> {
        self.connections
            .get(&conn_id)
            .and_then(|conn| conn.identity.as_ref())
            .ok_or(ChatError::AuthenticationRequired)
    }

    pub fn current_room(&self, conn_id: ConnectionId) -> Option<&str> {
        self.connections
            .get(&conn_id)
            .and_then(|conn| conn.current_room.as_deref())
    }

    pub fn set_current_room(&mut self, conn_id: ConnectionId, room_id: Option<String>) {
        if let Some(conn) = self.connections.get_mut(&conn_id) {
            conn.current_room = room_id;
        }
    }

    pub fn connection_for_user(&self, user_id: &str) -> Option<ConnectionId> {
        self.by_user.get(user_id).copied()
    }

    /// Queues an event for one connection. A closed receiver is the
    /// disconnect path racing us; dropping the event is correct.
    pub fn send_to(&self, conn_id: ConnectionId, event: ServerEvent) {
        if let Some(conn) = self.connections.get(&conn_id) {
            let _ = conn.sender.send(event);
        }
    }

    /// Delivers an event to every current subscriber of a room. Failures
    /// are per-connection and never interrupt the rest of the fan-out.
    pub fn fan_out(&self, room_id: &str, event: ServerEvent) {
        for conn_id in self.presence.connections(room_id) {
            self.send_to(conn_id, event.clone());
        }
    }

    /// Emits the room's computed presence view to its subscribers unless
    /// the throttle suppresses it. Rooms with no subscribers are skipped
    /// outright so client-supplied ids cannot grow the throttle map.
    pub fn broadcast_presence(&mut self, room_id: &str, throttle_ms: i64, now: i64) {
        if self.presence.connections(room_id).is_empty() {
            return;
        }
        if !self.presence.should_broadcast(room_id, throttle_ms, now) {
            return;
        }
        let users = self.presence.compute_view(room_id, now);
        self.fan_out(
            room_id,
            ServerEvent::Presence {
                room_id: room_id.to_owned(),
                users,
            },
        );
    }

    pub fn unregister(&mut self, conn_id: ConnectionId) {
        if let Some(conn) = self.connections.remove(&conn_id) {
            if let Some(identity) = conn.identity {
                // only drop the index entry if it still points at us
                if self.by_user.get(&identity.user_id) == Some(&conn_id) {
                    self.by_user.remove(&identity.user_id);
                }
            }
        }
    }
}
