//! Thin wrapper over the WeCom HTTP endpoints
//!
//! Every WeCom response carries an `errcode`/`errmsg` envelope; `errcode == 0`
//! means success regardless of the HTTP status.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{NotifyError, Result};

pub const API_BASE_URL: &str = "https://qyapi.weixin.qq.com/cgi-bin";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifetime assumed when the token response omits `expires_in`
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(7200);

/// Common `{errcode, errmsg}` envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

impl ProviderResponse {
    pub fn into_result(self, context: &'static str) -> Result<()> {
        if self.errcode == 0 {
            return Ok(());
        }
        let message = if self.errmsg.is_empty() {
            "unknown error".to_string()
        } else {
            self.errmsg
        };
        warn!("{} failed: errcode={} errmsg={}", context, self.errcode, message);
        Err(NotifyError::Provider {
            context,
            code: self.errcode,
            message,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(flatten)]
    envelope: ProviderResponse,
    access_token: Option<String>,
    expires_in: Option<u64>,
}

/// Token issued by `/gettoken`
#[derive(Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: Duration,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Arc<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wework-notify/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::new(base_url.into().trim_end_matches('/').to_string()),
        })
    }

    /// Client against the public WeCom API with the default timeout
    pub fn with_defaults() -> Result<Self> {
        Self::new(API_BASE_URL, DEFAULT_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /gettoken`
    pub async fn get_token(&self, corp_id: &str, corp_secret: &str) -> Result<IssuedToken> {
        let url = format!("{}/gettoken", self.base_url);
        debug!("Requesting WeCom access token for corp {}", corp_id);

        let response: TokenResponse = self
            .client
            .get(&url)
            .query(&[("corpid", corp_id), ("corpsecret", corp_secret)])
            .send()
            .await?
            .json()
            .await?;

        response.envelope.into_result("Token refresh")?;

        let access_token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| NotifyError::Provider {
                context: "Token refresh",
                code: 0,
                message: "missing access_token in token response".to_string(),
            })?;

        let expires_in = response
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);

        Ok(IssuedToken {
            access_token,
            expires_in,
        })
    }

    /// `POST /message/send` for custom applications
    pub async fn send_app_message(&self, access_token: &str, payload: &Value) -> Result<()> {
        self.post("message/send", &[("access_token", access_token)], payload)
            .await
    }

    /// `POST /webhook/send` for group robots
    pub async fn send_webhook_message(&self, key: &str, payload: &Value) -> Result<()> {
        self.post("webhook/send", &[("key", key)], payload).await
    }

    async fn post(&self, path: &str, query: &[(&str, &str)], payload: &Value) -> Result<()> {
        let url = format!("{}/{}", self.base_url, path);

        let response: ProviderResponse = self
            .client
            .post(&url)
            .query(query)
            .json(payload)
            .send()
            .await?
            .json()
            .await?;

        response.into_result("Message send")
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
