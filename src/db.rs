//! Schema and row types for the persistent store: rooms and messages,
//! plus the users table the identity collaborator reads.

use sqlx::SqlitePool;

/// Hard cap enforced by the store schema as well as the pipeline.
pub const MAX_CONTENT_LEN: usize = 2000;

/// What a soft-deleted message's content becomes.
pub const DELETED_PLACEHOLDER: &str = "[deleted]";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoomRecord {
    pub id: String,
    pub name: String,
    pub is_private: bool,
    pub invite_code: Option<String>,
    pub password_hash: Option<String>,
    pub created_by: String,
    pub created_at: i64,
    pub last_active_at: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRecord {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub username: String,
    pub content: String,
    pub created_at: i64,
    pub edited_at: Option<i64>,
    pub deleted_at: Option<i64>,
}

pub async fn init(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS rooms (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            is_private INTEGER NOT NULL DEFAULT 0,
            invite_code TEXT UNIQUE,
            password_hash TEXT,
            created_by TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            last_active_at INTEGER NOT NULL
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            room_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            username TEXT NOT NULL,
            content TEXT NOT NULL CHECK (length(content) <= 2000),
            created_at INTEGER NOT NULL,
            edited_at INTEGER,
            deleted_at INTEGER
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_room ON messages (room_id, created_at)")
        .execute(db_pool)
        .await?;

    Ok(())
}

pub async fn room_by_id(db_pool: &SqlitePool, id: &str) -> Result<Option<RoomRecord>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id,name,is_private,invite_code,password_hash,created_by,created_at,last_active_at
         FROM rooms WHERE id=?",
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await
}

pub async fn room_by_invite(
    db_pool: &SqlitePool,
    invite_code: &str,
) -> Result<Option<RoomRecord>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id,name,is_private,invite_code,password_hash,created_by,created_at,last_active_at
         FROM rooms WHERE invite_code=?",
    )
    .bind(invite_code)
    .fetch_optional(db_pool)
    .await
}

pub async fn room_by_name(
    db_pool: &SqlitePool,
    name: &str,
) -> Result<Option<RoomRecord>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id,name,is_private,invite_code,password_hash,created_by,created_at,last_active_at
         FROM rooms WHERE name=?",
    )
    .bind(name)
    .fetch_optional(db_pool)
    .await
}

pub async fn message_by_id(
    db_pool: &SqlitePool,
    id: &str,
) -> Result<Option<MessageRecord>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id,room_id,user_id,username,content,created_at,edited_at,deleted_at
         FROM messages WHERE id=?",
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await
}

pub async fn insert_message(db_pool: &SqlitePool, msg: &MessageRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO messages (id,room_id,user_id,username,content,created_at)
         VALUES (?,?,?,?,?,?)",
    )
    .bind(&msg.id)
    .bind(&msg.room_id)
    .bind(&msg.user_id)
    .bind(&msg.username)
    .bind(&msg.content)
    .bind(msg.created_at)
    .execute(db_pool)
    .await?;
    Ok(())
}

pub async fn apply_edit(
    db_pool: &SqlitePool,
    id: &str,
    content: &str,
    edited_at: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE messages SET content=?, edited_at=? WHERE id=?")
        .bind(content)
        .bind(edited_at)
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(())
}

pub async fn apply_delete(
    db_pool: &SqlitePool,
    id: &str,
    deleted_at: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE messages SET content=?, deleted_at=? WHERE id=?")
        .bind(DELETED_PLACEHOLDER)
        .bind(deleted_at)
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(())
}

/// Most recent `limit` messages of a room, oldest first.
pub async fn history(
    db_pool: &SqlitePool,
    room_id: &str,
    limit: i64,
) -> Result<Vec<MessageRecord>, sqlx::Error> {
    let mut rows: Vec<MessageRecord> = sqlx::query_as(
        "SELECT id,room_id,user_id,username,content,created_at,edited_at,deleted_at
         FROM messages WHERE room_id=? ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(room_id)
    .bind(limit)
    .fetch_all(db_pool)
    .await?;
    rows.reverse();
    Ok(rows)
}
