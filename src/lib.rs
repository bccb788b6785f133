pub mod chat;
pub mod db;
pub mod error;
pub mod identity;
pub mod rooms;

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::chat::ChatHub;

pub use crate::error::{ChatError, ChatResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub hub: Arc<Mutex<ChatHub>>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self {
            db_pool,
            hub: Arc::new(Mutex::new(ChatHub::new())),
        }
    }
}

/// Milliseconds since the unix epoch.
pub fn now_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
