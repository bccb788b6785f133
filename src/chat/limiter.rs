//! Per-connection flood gate. One timestamp per connection, fixed
//! interval, no burst allowance. Rejections leave the stamp untouched.

use std::collections::HashMap;

use crate::chat::connection::ConnectionId;

pub const MIN_SEND_INTERVAL_MS: i64 = 1000;

#[derive(Debug, Default)]
pub struct RateLimiter {
    last_accepted: HashMap<ConnectionId, i64>,
}

impl RateLimiter {
    /// Accepts and stamps `now`, or rejects. Stamping happens at
    /// submission time, before any persistence awaits, so two
    /// near-simultaneous sends from one connection cannot both pass.
    pub fn check_and_stamp(&mut self, conn_id: ConnectionId, now: i64) -> bool {
        match self.last_accepted.get(&conn_id) {
            Some(last) if now - last < MIN_SEND_INTERVAL_MS => false,
            _ => {
                self.last_accepted.insert(conn_id, now);
                true
            }
        }
    }

    pub fn forget(&mut self, conn_id: ConnectionId) {
        self.last_accepted.remove(&conn_id);
    }
}
