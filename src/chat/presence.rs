//! Ephemeral per-room presence. Derived from live connections only;
//! nothing here touches the store.

use std::collections::HashMap;

use crate::chat::connection::ConnectionId;
use crate::chat::event::PresenceUser;

/// A user counts as active this long after their last activity.
pub const ACTIVE_WINDOW_MS: i64 = 5 * 60 * 1000;

/// Throttle for presence refreshes triggered by chat traffic. Join and
/// leave updates bypass the throttle.
pub const ACTIVITY_THROTTLE_MS: i64 = 3000;

#[derive(Debug, Clone)]
pub struct PresenceEntry {
    pub user_id: String,
    pub username: String,
    pub last_active_at: i64,
}

#[derive(Debug, Default)]
pub struct PresenceTracker {
    rooms: HashMap<String, HashMap<ConnectionId, PresenceEntry>>,
    last_broadcast: HashMap<String, i64>,
}

impl PresenceTracker {
    /// Tracks the connection in `room_id`. A connection lives in at most
    /// one room, so any previous membership is dropped first; the vacated
    /// room id is returned so the caller can broadcast its new view.
    pub fn join(
        &mut self,
        room_id: &str,
        conn_id: ConnectionId,
        user_id: &str,
        username: &str,
        now: i64,
    ) -> Option<String> {
        let vacated = self
            .room_of(conn_id)
            .filter(|prev| *prev != room_id)
            .map(str::to_owned);
        if let Some(prev) = &vacated {
            self.leave(prev, conn_id);
        }
        self.rooms.entry(room_id.to_owned()).or_default().insert(
            conn_id,
            PresenceEntry {
                user_id: user_id.to_owned(),
                username: username.to_owned(),
                last_active_at: now,
            },
        );
        vacated
    }

    /// Swaps the identity on an existing entry; a connection that
    /// re-authenticates while in a room must not keep showing its old
    /// user.
    pub fn rebind(&mut self, room_id: &str, conn_id: ConnectionId, user_id: &str, username: &str) {
        if let Some(entry) = self
            .rooms
            .get_mut(room_id)
            .and_then(|conns| conns.get_mut(&conn_id))
        {
            entry.user_id = user_id.to_owned();
            entry.username = username.to_owned();
        }
    }

    /// Refreshes activity without forcing a broadcast.
    pub fn touch(&mut self, room_id: &str, conn_id: ConnectionId, now: i64) {
        if let Some(entry) = self
            .rooms
            .get_mut(room_id)
            .and_then(|conns| conns.get_mut(&conn_id))
        {
            entry.last_active_at = now;
        }
    }

    /// Removes the connection from the room; returns whether it was
    /// tracked there. Empty rooms are pruned outright.
    pub fn leave(&mut self, room_id: &str, conn_id: ConnectionId) -> bool {
        let Some(conns) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let removed = conns.remove(&conn_id).is_some();
        if conns.is_empty() {
            self.rooms.remove(room_id);
            self.last_broadcast.remove(room_id);
        }
        removed
    }

    /// Terminal cleanup; returns the room the connection vacated, if any.
    pub fn on_disconnect(&mut self, conn_id: ConnectionId) -> Option<String> {
        let room_id = self.room_of(conn_id)?.to_owned();
        self.leave(&room_id, conn_id);
        Some(room_id)
    }

    pub fn room_of(&self, conn_id: ConnectionId) -> Option<&str> {
        self.rooms
            .iter()
            .find(|(_, conns)| conns.contains_key(&conn_id))
            .map(|(room_id, _)| room_id.as_str())
    }

    pub fn connections(&self, room_id: &str) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|conns| conns.keys().copied().collect())
            .unwrap_or_default()
    }

    /// One entry per user, keeping the freshest activity across that
    /// user's connections. Active users first, then alphabetically, so
    /// the view is deterministic.
    pub fn compute_view(&self, room_id: &str, now: i64) -> Vec<PresenceUser> {
        let mut by_user: HashMap<&str, (&str, i64)> = HashMap::new();
        if let Some(conns) = self.rooms.get(room_id) {
            for entry in conns.values() {
                by_user
                    .entry(&entry.user_id)
                    .and_modify(|(_, last)| *last = (*last).max(entry.last_active_at))
                    .or_insert((&entry.username, entry.last_active_at));
            }
        }
        let mut users: Vec<PresenceUser> = by_user
            .into_iter()
            .map(|(user_id, (username, last_active_at))| PresenceUser {
                user_id: user_id.to_owned(),
                username: username.to_owned(),
                active: now - last_active_at <= ACTIVE_WINDOW_MS,
                last_active_at,
            })
            .collect();
        users.sort_by(|a, b| {
            b.active
                .cmp(&a.active)
                .then_with(|| a.username.cmp(&b.username))
        });
        users
    }

    /// Throttle gate for a room's presence emission. A zero throttle
    /// always passes; otherwise the previous emission must be old enough.
    /// Passing stamps the room.
    pub fn should_broadcast(&mut self, room_id: &str, throttle_ms: i64, now: i64) -> bool {
        if throttle_ms > 0 {
            if let Some(last) = self.last_broadcast.get(room_id) {
                if now - last < throttle_ms {
                    return false;
                }
            }
        }
        self.last_broadcast.insert(room_id.to_owned(), now);
        true
    }

    #[cfg(test)]
    fn tracked_rooms(&self) -> usize {
        self.rooms.len()
    }
}
