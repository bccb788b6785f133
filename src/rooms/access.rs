//! Room resolution and join authorization.
//!
//! Resolution precedence is id, then invite code, then name. The order
//! matters: a private room must never be reachable by guessing its name,
//! so the name lookup runs last and private rooms found that way are
//! reported as absent.

use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{self, RoomRecord};
use crate::error::{ChatError, ChatResult};

pub const NAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 4;
const INVITE_CODE_LEN: usize = 16;

pub fn validate_room_name(name: &str) -> ChatResult<()> {
    let ok = !name.is_empty()
        && name.len() <= NAME_MAX_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(ChatError::Validation(
            "room names are 1-50 letters, digits, spaces, '-' or '_'".to_owned(),
        ))
    }
}

/// URL-safe random token; the only way into a private room.
pub fn mint_invite_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_CODE_LEN)
        .map(char::from)
        .collect()
}

pub fn hash_password(password: &str) -> ChatResult<String> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(ChatError::Validation(
            "password must be at least 4 characters".to_owned(),
        ));
    }
    let salt: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    let digest = salted_digest(&salt, password);
    Ok(format!("{salt}${digest}"))
}

pub fn verify_password(stored: &str, supplied: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, digest)) => salted_digest(salt, supplied) == digest,
        None => false,
    }
}

fn salted_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Looks a room up by id, invite code, or name, in that order.
pub async fn resolve_room(db_pool: &SqlitePool, identifier: &str) -> ChatResult<RoomRecord> {
    if Uuid::parse_str(identifier).is_ok() {
        if let Some(room) = db::room_by_id(db_pool, identifier).await? {
            return Ok(room);
        }
    }
    if let Some(room) = db::room_by_invite(db_pool, identifier).await? {
        return Ok(room);
    }
    db::room_by_name(db_pool, identifier)
        .await?
        .ok_or(ChatError::NotFound("room"))
}

/// Gate on the resolved room. Private rooms admit the exact invite code
/// and nothing else, not even their own name or id; anything else is
/// indistinguishable from the room not existing. A password, when set,
/// applies to public and private rooms alike.
pub fn authorize_join(
    room: &RoomRecord,
    identifier: &str,
    password: Option<&str>,
) -> ChatResult<()> {
    if room.is_private {
        match &room.invite_code {
            Some(code) if identifier == code => {}
            _ => return Err(ChatError::NotFound("room")),
        }
    }
    if let Some(stored) = &room.password_hash {
        let supplied = password
            .ok_or_else(|| ChatError::Authorization("this room requires a password".to_owned()))?;
        if !verify_password(stored, supplied) {
            return Err(ChatError::Authorization("wrong password".to_owned()));
        }
    }
    Ok(())
}

/// Creator-only invite retrieval.
pub fn invite_code_for<'r>(room: &'r RoomRecord, requester_id: &str) -> ChatResult<&'r str> {
    if room.created_by != requester_id {
        return Err(ChatError::Authorization(
            "only the room creator can see the invite code".to_owned(),
        ));
    }
    room.invite_code
        .as_deref()
        .ok_or(ChatError::NotFound("invite code"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(is_private: bool, invite: Option<&str>, hash: Option<String>) -> RoomRecord {
        RoomRecord {
            id: Uuid::now_v7().to_string(),
            name: "quiet corner".to_owned(),
            is_private,
            invite_code: invite.map(str::to_owned),
            password_hash: hash,
            created_by: "u1".to_owned(),
            created_at: 0,
            last_active_at: 0,
        }
    }

    #[test]
    fn room_names_are_bounded_and_allow_listed() {
        assert!(validate_room_name("lobby-test").is_ok());
        assert!(validate_room_name("Study Hall_2").is_ok());
        assert!(validate_room_name("").is_err());
        assert!(validate_room_name(&"x".repeat(51)).is_err());
        assert!(validate_room_name("nope!").is_err());
        assert!(validate_room_name("semi;colon").is_err());
    }

    #[test]
    fn invite_codes_are_long_and_urlsafe() {
        let code = mint_invite_code();
        assert_eq!(code.len(), 16);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(code, mint_invite_code());
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        let stored = hash_password("pass1234").unwrap();
        assert!(stored.contains('$'));
        assert!(!stored.contains("pass1234"));
        assert!(verify_password(&stored, "pass1234"));
        assert!(!verify_password(&stored, "pass12345"));
        assert!(!verify_password("garbage", "pass1234"));
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(
            hash_password("abc"),
            Err(ChatError::Validation(_))
        ));
    }

    #[test]
    fn private_room_admits_only_its_invite_code() {
        let r = room(true, Some("SeCrEtCoDe123456"), None);
        assert!(authorize_join(&r, "SeCrEtCoDe123456", None).is_ok());
        // name and id joins both look like a missing room
        assert!(matches!(
            authorize_join(&r, "quiet corner", None),
            Err(ChatError::NotFound("room"))
        ));
        assert!(matches!(
            authorize_join(&r, &r.id.clone(), None),
            Err(ChatError::NotFound("room"))
        ));
    }

    #[test]
    fn password_gate_applies_to_public_rooms_too() {
        let stored = hash_password("pass1234").unwrap();
        let r = room(false, None, Some(stored));
        assert!(authorize_join(&r, "quiet corner", Some("pass1234")).is_ok());
        assert!(matches!(
            authorize_join(&r, "quiet corner", None),
            Err(ChatError::Authorization(_))
        ));
        assert!(matches!(
            authorize_join(&r, "quiet corner", Some("wrong")),
            Err(ChatError::Authorization(_))
        ));
    }

    #[test]
    fn invite_retrieval_is_creator_only() {
        let r = room(true, Some("SeCrEtCoDe123456"), None);
        assert_eq!(invite_code_for(&r, "u1").unwrap(), "SeCrEtCoDe123456");
        assert!(matches!(
            invite_code_for(&r, "u2"),
            Err(ChatError::Authorization(_))
        ));
    }
}
