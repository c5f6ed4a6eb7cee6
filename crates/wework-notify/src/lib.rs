//! WeWork Notify
//!
//! Sends notifications through WeCom (WeChat Work), either as a custom
//! application with a cached access token or as a group robot webhook.

pub mod api;
pub mod app_client;
pub mod config;
pub mod credential;
pub mod error;
pub mod notifier;
pub mod payload;
pub mod registry;
pub mod request;
pub mod robot_client;

// Re-export key types for convenience
pub use app_client::{AppClient, AppConfig};
pub use config::Config;
pub use error::{NotifyError, Result};
pub use notifier::{EntryKind, Notifier};
pub use payload::Recipients;
pub use registry::{EntryTarget, NotifierRegistry, RegistryError};
pub use request::{MessageType, SendRequest};
pub use robot_client::{RobotClient, RobotConfig};
