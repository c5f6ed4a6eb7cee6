use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wework_notify::{
    Config, EntryKind, EntryTarget, MessageType, Notifier, NotifierRegistry, SendRequest,
};

/// Send notifications through WeCom applications and group robots.
#[derive(Debug, Parser)]
#[command(name = "wework-notify", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a message through a configured entry.
    Send {
        /// Entry id (a name from WEWORK_ENTRIES).
        #[arg(long, conflicts_with = "entry_title")]
        entry_id: Option<String>,
        /// Entry title, matched case-insensitively.
        #[arg(long)]
        entry_title: Option<String>,
        /// text, markdown or image.
        #[arg(long, default_value = "text")]
        message_type: String,
        /// Message content (text and markdown).
        #[arg(long)]
        message: Option<String>,
        /// Users, separated by '|'.
        #[arg(long)]
        to_user: Option<String>,
        /// Departments, separated by '|'.
        #[arg(long)]
        to_party: Option<String>,
        /// Tags, separated by '|'.
        #[arg(long)]
        to_tag: Option<String>,
        /// User ids to mention (robots, text only), separated by '|'.
        #[arg(long)]
        mentioned_list: Option<String>,
        /// Mobile numbers to mention (robots, text only), separated by '|'.
        #[arg(long)]
        mentioned_mobile_list: Option<String>,
        /// Uploaded media id (applications).
        #[arg(long)]
        image_media_id: Option<String>,
        /// Base64 image content (robots).
        #[arg(long)]
        image_base64: Option<String>,
        /// MD5 of the raw image (robots).
        #[arg(long)]
        image_md5: Option<String>,
    },
    /// List configured entries.
    Entries,
    /// Fetch a fresh access token to verify an application's credentials.
    Check {
        /// Entry id.
        entry_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "wework_notify=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    info!("Configuration loaded ({} entries)", config.entries.len());
    info!("  WeCom API: {}", config.api_base_url);

    let registry = NotifierRegistry::from_config(&config).context("Failed to build clients")?;

    match cli.command {
        Command::Send {
            entry_id,
            entry_title,
            message_type,
            message,
            to_user,
            to_party,
            to_tag,
            mentioned_list,
            mentioned_mobile_list,
            image_media_id,
            image_base64,
            image_md5,
        } => {
            let target = EntryTarget::from_parts(entry_id, entry_title)?;
            let request = SendRequest {
                message_type: message_type.parse::<MessageType>()?,
                message,
                to_user,
                to_party,
                to_tag,
                image_media_id,
                image_base64,
                image_md5,
                mentioned_list,
                mentioned_mobile_list,
            };
            registry.send(&target, &request).await?;
            println!("Message sent.");
        }
        Command::Entries => {
            if registry.is_empty() {
                println!("No entries configured. Set WEWORK_ENTRIES.");
            }
            for entry in registry.entries() {
                println!("{}\t{}\t{}", entry.id, entry.kind(), entry.title);
            }
        }
        Command::Check { entry_id } => {
            let entry = registry.resolve(&EntryTarget::Id(entry_id))?;
            if entry.kind() != EntryKind::App {
                bail!("Entry '{}' is a group robot; only applications hold credentials", entry.id);
            }
            entry.notifier.refresh().await?;
            println!("Credentials for '{}' are valid.", entry.id);
        }
    }

    Ok(())
}
