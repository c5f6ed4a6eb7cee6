use async_trait::async_trait;
use std::fmt;

use crate::error::Result;
use crate::request::SendRequest;

/// Delivery mode of a configured entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Custom application (corp id, secret and agent id)
    App,
    /// Group robot (webhook key)
    Bot,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::App => f.write_str("app"),
            Self::Bot => f.write_str("bot"),
        }
    }
}

/// Trait for sending notifications through one WeCom entry
#[async_trait]
pub trait Notifier: Send + Sync {
    fn kind(&self) -> EntryKind;

    async fn send(&self, request: &SendRequest) -> Result<()>;

    /// Credential health check (no-op by default)
    async fn refresh(&self) -> Result<()> {
        Ok(())
    }
}
