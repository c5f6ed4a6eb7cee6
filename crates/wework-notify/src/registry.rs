//! Configured entries and their clients
//!
//! Each entry owns its own client, so application entries never share a token
//! cache.

use std::sync::Arc;
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::app_client::AppClient;
use crate::config::{Config, EntryConfig, EntrySettings};
use crate::error::NotifyError;
use crate::notifier::{EntryKind, Notifier};
use crate::request::SendRequest;
use crate::robot_client::RobotClient;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("No entry found with entry_id {0}")]
    UnknownId(String),
    #[error("No entry found with title {0}")]
    UnknownTitle(String),
    #[error("Multiple entries match the title {0}; please use entry_id instead")]
    AmbiguousTitle(String),
    #[error("Either entry_id or entry_title must be provided")]
    MissingTarget,
    #[error("Only one of entry_id or entry_title may be provided")]
    ConflictingTarget,
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// How a caller names the entry to send through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryTarget {
    Id(String),
    /// Matched case-insensitively
    Title(String),
}

impl EntryTarget {
    pub fn from_parts(
        entry_id: Option<String>,
        entry_title: Option<String>,
    ) -> Result<Self, RegistryError> {
        match (entry_id, entry_title) {
            (Some(_), Some(_)) => Err(RegistryError::ConflictingTarget),
            (Some(id), None) => Ok(Self::Id(id)),
            (None, Some(title)) => Ok(Self::Title(title)),
            (None, None) => Err(RegistryError::MissingTarget),
        }
    }
}

pub struct RegisteredEntry {
    pub id: String,
    pub title: String,
    pub notifier: Arc<dyn Notifier>,
}

impl RegisteredEntry {
    pub fn kind(&self) -> EntryKind {
        self.notifier.kind()
    }
}

#[derive(Default)]
pub struct NotifierRegistry {
    entries: Vec<RegisteredEntry>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one client per configured entry, all sharing a single HTTP client
    pub fn from_config(config: &Config) -> Result<Self, NotifyError> {
        let api = ApiClient::new(&config.api_base_url, config.timeout)?;
        let mut registry = Self::new();
        for entry in &config.entries {
            registry.insert_config(entry, api.clone());
        }
        info!("Loaded {} WeCom entries", registry.entries.len());
        Ok(registry)
    }

    fn insert_config(&mut self, entry: &EntryConfig, api: ApiClient) {
        let notifier: Arc<dyn Notifier> = match &entry.settings {
            EntrySettings::App(app) => Arc::new(AppClient::new(app.clone(), api)),
            EntrySettings::Bot(bot) => Arc::new(RobotClient::new(bot.clone(), api)),
        };
        self.insert(entry.id.clone(), entry.title.clone(), notifier);
    }

    /// Register a client, replacing any entry with the same id
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        notifier: Arc<dyn Notifier>,
    ) {
        let id = id.into();
        let entry = RegisteredEntry {
            id: id.clone(),
            title: title.into(),
            notifier,
        };
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<RegisteredEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn entries(&self) -> &[RegisteredEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolve(&self, target: &EntryTarget) -> Result<&RegisteredEntry, RegistryError> {
        match target {
            EntryTarget::Id(id) => self
                .entries
                .iter()
                .find(|e| &e.id == id)
                .ok_or_else(|| RegistryError::UnknownId(id.clone())),
            EntryTarget::Title(title) => {
                let wanted = title.to_lowercase();
                let mut matches = self
                    .entries
                    .iter()
                    .filter(|e| e.title.to_lowercase() == wanted);
                match (matches.next(), matches.next()) {
                    (Some(entry), None) => Ok(entry),
                    (None, _) => Err(RegistryError::UnknownTitle(title.clone())),
                    (Some(_), Some(_)) => Err(RegistryError::AmbiguousTitle(title.clone())),
                }
            }
        }
    }

    pub async fn send(
        &self,
        target: &EntryTarget,
        request: &SendRequest,
    ) -> Result<(), RegistryError> {
        let entry = self.resolve(target)?;
        debug!("Dispatching {} message to entry {}", request.message_type, entry.id);
        entry.notifier.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<SendRequest>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn kind(&self) -> EntryKind {
            EntryKind::Bot
        }

        async fn send(&self, request: &SendRequest) -> crate::error::Result<()> {
            self.sent.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    fn registry() -> (NotifierRegistry, Arc<RecordingNotifier>) {
        let ops = Arc::new(RecordingNotifier::default());
        let mut registry = NotifierRegistry::new();
        registry.insert("ops", "Ops Alerts", ops.clone());
        registry.insert("dev-a", "Dev", Arc::new(RecordingNotifier::default()));
        registry.insert("dev-b", "DEV", Arc::new(RecordingNotifier::default()));
        (registry, ops)
    }

    #[test]
    fn test_target_from_parts() {
        assert_eq!(
            EntryTarget::from_parts(Some("a".into()), None).unwrap(),
            EntryTarget::Id("a".into())
        );
        assert!(matches!(
            EntryTarget::from_parts(None, None),
            Err(RegistryError::MissingTarget)
        ));
        assert!(matches!(
            EntryTarget::from_parts(Some("a".into()), Some("b".into())),
            Err(RegistryError::ConflictingTarget)
        ));
    }

    #[test]
    fn test_resolve() {
        let (registry, _) = registry();

        let entry = registry.resolve(&EntryTarget::Id("ops".into())).unwrap();
        assert_eq!(entry.title, "Ops Alerts");

        let entry = registry
            .resolve(&EntryTarget::Title("ops alerts".into()))
            .unwrap();
        assert_eq!(entry.id, "ops");

        assert!(matches!(
            registry.resolve(&EntryTarget::Id("nope".into())),
            Err(RegistryError::UnknownId(_))
        ));
        assert!(matches!(
            registry.resolve(&EntryTarget::Title("nope".into())),
            Err(RegistryError::UnknownTitle(_))
        ));
        assert!(matches!(
            registry.resolve(&EntryTarget::Title("dev".into())),
            Err(RegistryError::AmbiguousTitle(_))
        ));
    }

    #[test]
    fn test_insert_replaces_and_remove() {
        let (mut registry, _) = registry();
        registry.insert("ops", "Ops v2", Arc::new(RecordingNotifier::default()));
        assert_eq!(registry.entries().len(), 3);
        assert_eq!(
            registry.resolve(&EntryTarget::Id("ops".into())).unwrap().title,
            "Ops v2"
        );

        assert!(registry.remove("ops").is_some());
        assert!(registry.remove("ops").is_none());
        assert_eq!(registry.entries().len(), 2);
    }

    #[tokio::test]
    async fn test_send_dispatches_to_resolved_entry() {
        let (registry, ops) = registry();
        registry
            .send(&EntryTarget::Title("OPS ALERTS".into()), &SendRequest::text("hi"))
            .await
            .unwrap();

        let sent = ops.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message.as_deref(), Some("hi"));
    }

    #[test]
    fn test_from_config_builds_clients() {
        let config = Config::from_lookup(|key| {
            let value = match key {
                "WEWORK_ENTRIES" => Some("ops,bot"),
                "WEWORK_OPS_TYPE" => Some("app"),
                "WEWORK_OPS_CORP_ID" => Some("ww1"),
                "WEWORK_OPS_CORP_SECRET" => Some("s"),
                "WEWORK_OPS_AGENT_ID" => Some("1"),
                "WEWORK_BOT_TYPE" => Some("bot"),
                "WEWORK_BOT_WEBHOOK_KEY" => Some("k"),
                _ => None,
            };
            value.map(str::to_string)
        })
        .unwrap();

        let registry = NotifierRegistry::from_config(&config).unwrap();
        let kinds: Vec<_> = registry.entries().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![EntryKind::App, EntryKind::Bot]);
    }
}
