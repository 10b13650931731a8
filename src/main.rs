use lbmirror::cache::CacheManager;
use lbmirror::cli::Cli;
use lbmirror::client::HttpSource;
use lbmirror::clock::SystemClock;
use lbmirror::config::Settings;
use lbmirror::scheduler::Scheduler;

use clap::Parser;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(settings.get_trace_level())
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Setting default subscriber failed");

    let source = Arc::new(HttpSource::from_settings(&settings)?);
    let cache = Arc::new(CacheManager::new(source, Arc::new(SystemClock), &settings));

    let mut scheduler = Scheduler::new(cache);
    scheduler.start();

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, shutting down.");
    scheduler.shutdown().await;

    Ok(())
}
