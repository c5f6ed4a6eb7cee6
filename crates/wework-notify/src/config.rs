use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::api::{API_BASE_URL, DEFAULT_TIMEOUT};
use crate::app_client::AppConfig;
use crate::notifier::EntryKind;
use crate::payload::Recipients;
use crate::robot_client::RobotConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum EntrySettings {
    App(AppConfig),
    Bot(RobotConfig),
}

impl EntrySettings {
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::App(_) => EntryKind::App,
            Self::Bot(_) => EntryKind::Bot,
        }
    }
}

/// One configured delivery target
#[derive(Debug, Clone, PartialEq)]
pub struct EntryConfig {
    /// Stable identifier (the name listed in `WEWORK_ENTRIES`)
    pub id: String,
    pub title: String,
    pub settings: EntrySettings,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub timeout: Duration,
    pub entries: Vec<EntryConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Values are trimmed; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let timeout = match var("WEWORK_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(
                secs.parse::<u64>()
                    .context("WEWORK_TIMEOUT_SECS must be a number of seconds")?,
            ),
            None => DEFAULT_TIMEOUT,
        };

        let names: Vec<String> = var("WEWORK_ENTRIES")
            .map(|s| {
                s.split(',')
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            if entries.iter().any(|e: &EntryConfig| e.id == name) {
                bail!("Entry '{}' is listed more than once in WEWORK_ENTRIES", name);
            }
            entries.push(load_entry(&name, &var)?);
        }

        Ok(Self {
            api_base_url: var("WEWORK_API_BASE").unwrap_or_else(|| API_BASE_URL.to_string()),
            timeout,
            entries,
        })
    }
}

fn env_prefix(name: &str) -> String {
    format!("WEWORK_{}_", name.to_uppercase().replace(['-', ' '], "_"))
}

fn load_entry<F>(name: &str, var: &F) -> Result<EntryConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let prefix = env_prefix(name);
    let key = |field: &str| format!("{}{}", prefix, field);
    let required = |field: &str| {
        let k = key(field);
        var(k.as_str()).with_context(|| format!("{} must be set for entry '{}'", k, name))
    };

    let settings = match required("TYPE")?.to_lowercase().as_str() {
        "app" => EntrySettings::App(AppConfig {
            corp_id: required("CORP_ID")?,
            corp_secret: required("CORP_SECRET")?,
            agent_id: required("AGENT_ID")?
                .parse::<i64>()
                .with_context(|| format!("{} must be an integer", key("AGENT_ID")))?,
            defaults: Recipients {
                to_user: var(key("TO_USER").as_str()),
                to_party: var(key("TO_PARTY").as_str()),
                to_tag: var(key("TO_TAG").as_str()),
            },
        }),
        "bot" => EntrySettings::Bot(RobotConfig {
            webhook_key: required("WEBHOOK_KEY")?,
        }),
        other => bail!(
            "{} must be 'app' or 'bot', got '{}'",
            key("TYPE"),
            other
        ),
    };

    Ok(EntryConfig {
        id: name.to_string(),
        title: var(key("TITLE").as_str()).unwrap_or_else(|| name.to_string()),
        settings,
    })
}
