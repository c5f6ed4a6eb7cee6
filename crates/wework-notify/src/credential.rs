//! Access token cache for custom applications
//!
//! - Cached token is reused until 30 seconds before expiry
//! - At most one refresh is in flight per cache; callers that queued behind it
//!   observe its token or its failure instead of fetching again
//! - The cache is written only after a fetch succeeds, so a cancelled refresh
//!   leaves the previous state untouched

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::api::{ApiClient, IssuedToken};
use crate::error::{NotifyError, Result};

/// Tokens are treated as expired this long before the provider says so
pub const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Upper bound on a stored lifetime so `Instant` arithmetic cannot overflow
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(u32::MAX as u64);

/// Monotonic time source
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Where fresh tokens come from
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<IssuedToken>;
}

/// Fetches tokens from `/gettoken` with corp credentials
pub struct CorpTokenSource {
    api: ApiClient,
    corp_id: String,
    corp_secret: String,
}

impl CorpTokenSource {
    pub fn new(api: ApiClient, corp_id: impl Into<String>, corp_secret: impl Into<String>) -> Self {
        Self {
            api,
            corp_id: corp_id.into(),
            corp_secret: corp_secret.into(),
        }
    }
}

#[async_trait]
impl TokenSource for CorpTokenSource {
    async fn fetch_token(&self) -> Result<IssuedToken> {
        self.api.get_token(&self.corp_id, &self.corp_secret).await
    }
}

impl std::fmt::Debug for CorpTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorpTokenSource")
            .field("corp_id", &self.corp_id)
            .field("corp_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone)]
struct Credential {
    token: String,
    expires_at: Instant,
}

impl Credential {
    fn is_valid_at(&self, now: Instant) -> bool {
        now + TOKEN_EXPIRY_MARGIN < self.expires_at
    }
}

#[derive(Default)]
struct CacheState {
    credential: Option<Credential>,
    /// Bumped after every network refresh, successful or not
    generation: u64,
    last_failure: Option<NotifyError>,
}

pub struct CredentialCache {
    source: Arc<dyn TokenSource>,
    clock: Arc<dyn Clock>,
    state: RwLock<CacheState>,
    refresh_lock: Mutex<()>,
}

impl CredentialCache {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self::with_clock(source, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Arc<dyn TokenSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            state: RwLock::new(CacheState::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    async fn cached_token(&self) -> Option<String> {
        let state = self.state.read().await;
        let now = self.clock.now();
        state
            .credential
            .as_ref()
            .filter(|c| c.is_valid_at(now))
            .map(|c| c.token.clone())
    }

    /// Return a usable token, refreshing only when the cached one is missing or
    /// inside the expiry margin.
    pub async fn ensure_valid(&self) -> Result<String> {
        if let Some(token) = self.cached_token().await {
            debug!("Using cached WeCom access token");
            return Ok(token);
        }
        self.refresh(false).await
    }

    /// Fetch a new token under the refresh guard.
    ///
    /// Without `force`, a token that became valid while waiting for the guard is
    /// returned as is, and a refresh that failed while waiting is reported
    /// without fetching again.
    pub async fn refresh(&self, force: bool) -> Result<String> {
        let seen_generation = self.state.read().await.generation;
        let _guard = self.refresh_lock.lock().await;

        if !force {
            if let Some(token) = self.cached_token().await {
                debug!("Access token refreshed by a concurrent caller");
                return Ok(token);
            }
            let state = self.state.read().await;
            if state.generation != seen_generation {
                if let Some(err) = &state.last_failure {
                    return Err(err.clone());
                }
            }
        }

        let fetched = self.source.fetch_token().await;

        let mut state = self.state.write().await;
        state.generation += 1;
        match fetched {
            Ok(issued) => {
                // A zero lifetime would store an already-expired credential.
                let lifetime = issued
                    .expires_in
                    .clamp(Duration::from_secs(1), MAX_TOKEN_LIFETIME);
                state.credential = Some(Credential {
                    token: issued.access_token.clone(),
                    expires_at: self.clock.now() + lifetime,
                });
                state.last_failure = None;
                info!(
                    "WeCom access token refreshed (expires in {}s)",
                    lifetime.as_secs()
                );
                Ok(issued.access_token)
            }
            Err(err) => {
                state.last_failure = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Time left before the cached token expires, if one is cached
    pub async fn time_to_expiry(&self) -> Option<Duration> {
        let state = self.state.read().await;
        state
            .credential
            .as_ref()
            .map(|c| c.expires_at.saturating_duration_since(self.clock.now()))
    }

    /// Forget the cached token
    pub async fn clear(&self) {
        let _guard = self.refresh_lock.lock().await;
        self.state.write().await.credential = None;
    }
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCache").finish_non_exhaustive()
    }
}
