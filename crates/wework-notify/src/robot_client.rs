//! Group robot client: webhook key only, no token and no retry

use async_trait::async_trait;
use tracing::info;

use crate::api::ApiClient;
use crate::error::Result;
use crate::notifier::{EntryKind, Notifier};
use crate::payload::build_robot_payload;
use crate::request::SendRequest;

#[derive(Clone, PartialEq)]
pub struct RobotConfig {
    pub webhook_key: String,
}

impl std::fmt::Debug for RobotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotConfig")
            .field("webhook_key", &"[REDACTED]")
            .finish()
    }
}

pub struct RobotClient {
    api: ApiClient,
    webhook_key: String,
}

impl RobotClient {
    pub fn new(config: RobotConfig, api: ApiClient) -> Self {
        Self {
            api,
            webhook_key: config.webhook_key,
        }
    }
}

#[async_trait]
impl Notifier for RobotClient {
    fn kind(&self) -> EntryKind {
        EntryKind::Bot
    }

    async fn send(&self, request: &SendRequest) -> Result<()> {
        let payload = build_robot_payload(request)?;
        self.api
            .send_webhook_message(&self.webhook_key, &payload)
            .await?;
        info!("Sent {} message via group robot", request.message_type);
        Ok(())
    }
}

impl std::fmt::Debug for RobotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotClient")
            .field("webhook_key", &"[REDACTED]")
            .finish()
    }
}
