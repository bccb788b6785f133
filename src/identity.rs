//! Identity collaborator. Session/credential handling lives outside this
//! service; whatever this lookup returns is trusted as-is.

use sqlx::SqlitePool;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
}

pub async fn lookup(db_pool: &SqlitePool, user_id: &str) -> Result<Option<Identity>, sqlx::Error> {
    let row: Option<(String, String)> = sqlx::query_as("SELECT id,username FROM users WHERE id=?")
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?;
    Ok(row.map(|(user_id, username)| Identity { user_id, username }))
}
