//! keyword-alert: command-line access to the settings store, dedupe ledger
//! and webhook of a keyword alert installation.

use std::path::PathBuf;
use std::sync::Arc;

use alert_core::{now_millis, AppConfig, ErrorExt, ErrorReporter, Settings};
use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use scan_service::{DesktopNotifier, Notifier, NOTIFICATION_TITLE};
use serde_json::{Map, Value};
use storage::{KeyValueStore, LedgerRepository, SettingsRepository, SqliteStore};
use tracing::info;
use tracing_subscriber::EnvFilter;
use webhook_client::{WebhookSink, WebhookTarget};

#[derive(Parser, Debug)]
#[command(name = "keyword-alert")]
#[command(about = "Keyword alert settings, ledger and webhook tools")]
#[command(version)]
struct Args {
    /// Process configuration file
    #[arg(short, long, default_value = "keyword-alert.toml", env = "KEYWORD_ALERT_CONFIG")]
    config: PathBuf,

    /// Overrides `database_url` from the config file
    #[arg(long, env = "KEYWORD_ALERT_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show or change stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
    /// Inspect or clear the seen-posts ledger
    Ledger {
        #[command(subcommand)]
        action: LedgerCommand,
    },
    /// Send a sample match to the configured webhook
    TestWebhook,
    /// Show a sample desktop notification
    TestNotification,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,
    /// Set one key; VALUE is parsed as JSON, falling back to a plain string
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
enum LedgerCommand {
    Stats,
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    let database_url = args
        .database_url
        .clone()
        .unwrap_or_else(|| config.database_url.clone());
    info!("Using store {}", database_url);

    let sqlite = SqliteStore::connect(&database_url)
        .await
        .context("Failed to open settings store")?;
    let store: Arc<dyn KeyValueStore> = Arc::new(sqlite.clone());

    let result = run(args.command, &config, store).await;
    sqlite.close().await;
    result
}

async fn run(command: Command, config: &AppConfig, store: Arc<dyn KeyValueStore>) -> Result<()> {
    let settings = SettingsRepository::new(store.clone());
    let ledger = LedgerRepository::new(store);

    match command {
        Command::Settings { action } => match action {
            SettingsCommand::Show => {
                let current = settings.load().await?;
                println!("{}", serde_json::to_string_pretty(&current)?);
            }
            SettingsCommand::Set { key, value } => {
                let updated = apply_setting(settings.load().await?, &key, &value)?;
                settings.save(&updated).await?;
                println!("{}", serde_json::to_string_pretty(&updated)?);
            }
        },
        Command::Ledger { action } => match action {
            LedgerCommand::Stats => {
                let now = now_millis();
                let entries = ledger.load(now).await?.to_map();
                println!("entries: {}", entries.len());
                if let Some(oldest) = entries.values().min() {
                    println!("oldest:  {}", format_millis(*oldest));
                }
                if let Some(newest) = entries.values().max() {
                    println!("newest:  {}", format_millis(*newest));
                }
            }
            LedgerCommand::Clear => {
                ledger.clear().await?;
                println!("ledger cleared");
            }
        },
        Command::TestWebhook => {
            let current = settings.load().await?;
            let sink = WebhookSink::http(config.webhook_timeout())?;
            if let Err(e) = sink.send_test(&WebhookTarget::from_settings(&current)).await {
                ErrorReporter::new().report_error(&e);
                bail!(e.user_friendly_message());
            }
            println!("test webhook delivered");
        }
        Command::TestNotification => {
            DesktopNotifier::default()
                .notify(NOTIFICATION_TITLE, "This is a test notification")
                .await?;
        }
    }
    Ok(())
}

/// Returns `settings` with `key` replaced, normalized the same way the
/// options page saves it.
fn apply_setting(settings: Settings, key: &str, raw: &str) -> Result<Settings> {
    if !Settings::KEYS.contains(&key) {
        bail!(
            "unknown setting '{}' (expected one of: {})",
            key,
            Settings::KEYS.join(", ")
        );
    }
    let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.into()));

    let mut patch = Map::new();
    patch.insert(key.to_string(), value);
    settings
        .merged(&patch)
        .with_context(|| format!("invalid value for '{}': {}", key, raw))
}

fn format_millis(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}
