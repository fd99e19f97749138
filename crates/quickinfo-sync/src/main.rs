use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use quickinfo_config::FileSettingsStore;
use quickinfo_core::Setting;
use quickinfo_service::JiraClient;
use quickinfo_store::{default_cache_dir, ImageCache};
use quickinfo_sync::config::{CliConfig, Command, ConfigAction};
use quickinfo_sync::terminal::TerminalSurface;
use quickinfo_sync::SyncController;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quickinfo=info")),
        )
        .init();

    let config = CliConfig::parse();
    let layout = config.layout()?;
    let store = FileSettingsStore::new(layout.clone(), config.config_dir.clone());
    debug!("global settings in {}", store.global_dir().display());

    let cache = ImageCache::new(config.cache_dir.clone().unwrap_or_else(default_cache_dir));
    let surface = Arc::new(TerminalSurface::new(config.output_mode()));
    let tracker = Arc::new(JiraClient::new()?);
    let controller = SyncController::new(store, tracker, cache, surface)
        .with_default_issue(layout.default_issue_key());

    let ok = match config.command {
        Command::Status { .. } => {
            let rendered = controller.startup().await;
            if rendered.is_none() {
                eprintln!(
                    "Not configured: run `quickinfo change-url` and `quickinfo change-issue` first."
                );
            }
            rendered.is_some()
        }
        Command::ChangeIssue { key } => controller.change_issue(key).await.is_some(),
        Command::ChangeUrl { url } => {
            controller.change_url(url).await;
            true
        }
        Command::Open => controller.open_in_browser().await,
        Command::RemoveThumbnails => {
            let removed = controller.remove_thumbnails().await;
            println!("Removed {removed} cached images.");
            true
        }
        Command::Config { action } => match action {
            ConfigAction::Get { setting } => {
                println!("{}", controller.resolve(setting).await);
                true
            }
            ConfigAction::Set {
                setting,
                value,
                scope,
            } => {
                let change = controller.set_setting(setting, &value, scope.into()).await?;
                info!("wrote {setting} to {} settings", change.scope.display_name());
                true
            }
            ConfigAction::List => {
                for setting in Setting::ALL {
                    println!("{setting} = {}", controller.resolve(*setting).await);
                }
                true
            }
        },
    };

    if config.ephemeral_cache {
        controller.shutdown().await;
    }
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
