use thiserror::Error;

use crate::chat::event::ServerEvent;

pub type ChatResult<T> = Result<T, ChatError>;

/// Everything a connection can be told went wrong. Each variant maps to a
/// stable wire `kind` so clients can branch without parsing messages.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("authenticate first")]
    AuthenticationRequired,
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("too many messages, wait a moment")]
    RateLimited,
    #[error("storage error")]
    Store(#[from] sqlx::Error),
}

impl ChatError {
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::AuthenticationRequired => "authentication_required",
            ChatError::Authorization(_) => "authorization",
            ChatError::Validation(_) => "validation",
            ChatError::NotFound(_) => "not_found",
            ChatError::Conflict(_) => "conflict",
            ChatError::RateLimited => "rate_limited",
            ChatError::Store(_) => "transient_store",
        }
    }

    /// Client-safe message. Store detail stays in the server log.
    pub fn client_message(&self) -> String {
        match self {
            ChatError::Store(_) => "temporary storage error, try again".to_owned(),
            other => other.to_string(),
        }
    }

    /// Turns the error into the structured event delivered to the one
    /// connection that triggered it, logging store failures in full.
    pub fn into_event(self) -> ServerEvent {
        if let ChatError::Store(err) = &self {
            tracing::error!(error = %err, "store operation failed");
        }
        ServerEvent::Error {
            kind: self.kind().to_owned(),
            message: self.client_message(),
        }
    }
}
