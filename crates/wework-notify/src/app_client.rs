//! Custom application client
//!
//! Sends through `/message/send` with a cached access token. When WeCom reports
//! the token as invalid, the token is force-refreshed and the send is retried
//! once; the retry's outcome is final.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::credential::{Clock, CorpTokenSource, CredentialCache, SystemClock, TokenSource};
use crate::error::Result;
use crate::notifier::{EntryKind, Notifier};
use crate::payload::{build_app_payload, Recipients};
use crate::request::SendRequest;

#[derive(Clone, PartialEq)]
pub struct AppConfig {
    pub corp_id: String,
    pub corp_secret: String,
    pub agent_id: i64,
    pub defaults: Recipients,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("corp_id", &self.corp_id)
            .field("corp_secret", &"[REDACTED]")
            .field("agent_id", &self.agent_id)
            .field("defaults", &self.defaults)
            .finish()
    }
}

pub struct AppClient {
    api: ApiClient,
    agent_id: i64,
    defaults: Recipients,
    credentials: CredentialCache,
}

impl AppClient {
    pub fn new(config: AppConfig, api: ApiClient) -> Self {
        Self::with_clock(config, api, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AppConfig, api: ApiClient, clock: Arc<dyn Clock>) -> Self {
        let source: Arc<dyn TokenSource> = Arc::new(CorpTokenSource::new(
            api.clone(),
            config.corp_id,
            config.corp_secret,
        ));

        Self {
            api,
            agent_id: config.agent_id,
            defaults: config.defaults,
            credentials: CredentialCache::with_clock(source, clock),
        }
    }

    pub fn credentials(&self) -> &CredentialCache {
        &self.credentials
    }

    /// Force a fresh token and report how long it is valid for
    pub async fn verify_credentials(&self) -> Result<Duration> {
        self.credentials.refresh(true).await?;
        Ok(self
            .credentials
            .time_to_expiry()
            .await
            .unwrap_or_default())
    }
}

#[async_trait]
impl Notifier for AppClient {
    fn kind(&self) -> EntryKind {
        EntryKind::App
    }

    async fn send(&self, request: &SendRequest) -> Result<()> {
        let payload = build_app_payload(self.agent_id, &self.defaults, request)?;
        let token = self.credentials.ensure_valid().await?;

        match self.api.send_app_message(&token, &payload).await {
            Err(err) if err.is_token_invalid() => {
                warn!("Access token rejected, refreshing and retrying once: {}", err);
                let token = self.credentials.refresh(true).await?;
                self.api.send_app_message(&token, &payload).await?;
            }
            result => result?,
        }

        info!(
            "Sent {} message via application {}",
            request.message_type, self.agent_id
        );
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.verify_credentials().await.map(|_| ())
    }
}

impl std::fmt::Debug for AppClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppClient")
            .field("agent_id", &self.agent_id)
            .field("defaults", &self.defaults)
            .finish()
    }
}
