//! Persistent room registry: creation, listing, activity stamping.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::RoomRecord;
use crate::error::{ChatError, ChatResult};
use crate::now_ms;
use crate::rooms::access;

pub async fn create_room(
    db_pool: &SqlitePool,
    created_by: &str,
    name: &str,
    is_private: bool,
    password: Option<&str>,
) -> ChatResult<RoomRecord> {
    access::validate_room_name(name)?;
    let password_hash = password.map(access::hash_password).transpose()?;
    let invite_code = is_private.then(access::mint_invite_code);

    let now = now_ms();
    let room = RoomRecord {
        id: Uuid::now_v7().to_string(),
        name: name.to_owned(),
        is_private,
        invite_code,
        password_hash,
        created_by: created_by.to_owned(),
        created_at: now,
        last_active_at: now,
    };

    let inserted = sqlx::query(
        "INSERT INTO rooms (id,name,is_private,invite_code,password_hash,created_by,created_at,last_active_at)
         VALUES (?,?,?,?,?,?,?,?)",
    )
    .bind(&room.id)
    .bind(&room.name)
    .bind(room.is_private)
    .bind(room.invite_code.as_deref())
    .bind(room.password_hash.as_deref())
    .bind(&room.created_by)
    .bind(room.created_at)
    .bind(room.last_active_at)
    .execute(db_pool)
    .await;

    match inserted {
        Ok(_) => Ok(room),
        Err(err) if is_unique_violation(&err) => Err(ChatError::Conflict(format!(
            "a room named \"{name}\" already exists"
        ))),
        Err(err) => Err(err.into()),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

pub async fn list_public(db_pool: &SqlitePool) -> Result<Vec<RoomRecord>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id,name,is_private,invite_code,password_hash,created_by,created_at,last_active_at
         FROM rooms WHERE is_private=0 ORDER BY last_active_at DESC",
    )
    .fetch_all(db_pool)
    .await
}

/// Private rooms the user created, invite codes included.
pub async fn list_private_for(
    db_pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<RoomRecord>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id,name,is_private,invite_code,password_hash,created_by,created_at,last_active_at
         FROM rooms WHERE is_private=1 AND created_by=? ORDER BY last_active_at DESC",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await
}

/// Unconditional read-modify-write; joins and sends both land here.
pub async fn touch(db_pool: &SqlitePool, room_id: &str, now: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE rooms SET last_active_at=? WHERE id=?")
        .bind(now)
        .bind(room_id)
        .execute(db_pool)
        .await?;
    Ok(())
}
