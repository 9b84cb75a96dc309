// Error types
// One enum for every way a command can fail, each with its HTTP status

use thiserror::Error;

use crate::command::CommandIntent;

/// Everything that can stop a command on its way to an Odoo bill.
#[derive(Error, Debug)]
pub enum WebhookError {
    /// Missing Odoo configuration or a rejected login handshake
    #[error("{0}")]
    Auth(String),

    /// Odoo answered a call_kw request with an error envelope
    #[error("{0}")]
    RemoteCall(String),

    /// Neither the primary nor the fallback account search matched
    #[error("No expense account found")]
    AccountNotFound,

    /// Shared secret missing or wrong
    #[error("Unauthorized")]
    Unauthorized,

    /// Text parsed, but not as a bill
    #[error("Unsupported or malformed command")]
    UnsupportedCommand(CommandIntent),

    /// Transport failure talking to Odoo
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Payload could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WebhookError {
    /// HTTP status the webhook answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookError::Unauthorized => 401,
            WebhookError::UnsupportedCommand(_) => 400,
            WebhookError::Auth(_)
            | WebhookError::RemoteCall(_)
            | WebhookError::AccountNotFound
            | WebhookError::Http(_)
            | WebhookError::Json(_) => 500,
        }
    }
}

/// Result type alias using WebhookError.
pub type WebhookResult<T> = Result<T, WebhookError>;
