//! Error types shared by both WeCom clients

use std::sync::Arc;

/// Provider codes meaning the access token is invalid or expired.
///
/// 40001: invalid credential, 40014: invalid access_token, 42001: access_token expired.
pub const TOKEN_RETRYABLE_ERROR_CODES: [i64; 3] = [40001, 40014, 42001];

#[derive(Debug, Clone, thiserror::Error)]
pub enum NotifyError {
    /// Caller input is malformed or incomplete. Never reaches the network.
    #[error("invalid message: {0}")]
    Validation(String),

    #[error("unsupported message type: {0}")]
    UnsupportedType(String),

    /// Non-zero `errcode` from the WeCom API.
    #[error("{context} failed: {message} (errcode={code})")]
    Provider {
        context: &'static str,
        code: i64,
        message: String,
    },

    /// Network failure, timeout, or an undecodable response body.
    #[error("HTTP request failed: {0}")]
    Transport(#[source] Arc<reqwest::Error>),
}

/// The request URL is dropped: its query string carries `corpsecret`,
/// `access_token` or the webhook `key`.
impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Arc::new(err.without_url()))
    }
}

impl NotifyError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Provider error code, if this error came from the API envelope
    pub fn errcode(&self) -> Option<i64> {
        match self {
            Self::Provider { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether a fresh access token may fix this error
    pub fn is_token_invalid(&self) -> bool {
        self.errcode()
            .is_some_and(|code| TOKEN_RETRYABLE_ERROR_CODES.contains(&code))
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;
