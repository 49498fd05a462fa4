mod config;
mod console;
mod invidious;
mod mirrors;
mod pipeline;
mod prober;
mod reply;
mod resolver;

use std::sync::Arc;

use tokio::io::{self, BufReader};

use crate::config::load_tube_config;
use crate::console::{run_console, ConsoleSink};
use crate::invidious::InvidiousClient;
use crate::mirrors::MirrorRegistry;
use crate::pipeline::{Pipeline, ReplySink};

#[tokio::main]
async fn main() {
    // Initialize logger - must be done before any logging calls
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = match load_tube_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Failed to load configuration: {}", e);
            return;
        }
    };

    let client = match InvidiousClient::new(config.request_timeout) {
        Ok(client) => client,
        Err(e) => {
            log::error!("❌ Error creating HTTP client: {}", e);
            return;
        }
    };

    // Mirrors are loaded exactly once and shared read-only afterwards.
    let mut registry = MirrorRegistry::new(config.mirror_source.clone());
    registry.load(client.http()).await;
    log::info!(
        "📋 {} candidate mirrors from {:?}",
        registry.list().len(),
        registry.source()
    );

    let pipeline = Arc::new(Pipeline::new(
        Arc::new(client),
        Arc::new(registry),
        &config,
    ));
    let sink: Arc<dyn ReplySink> = Arc::new(ConsoleSink);

    log::info!("🚀 Ready. Type a YouTube URL or 「keyword」 per line, Ctrl+C to stop");
    let handled = run_console(BufReader::new(io::stdin()), pipeline, sink).await;
    log::info!("📊 Handled {} commands", handled);

    log::info!("✅ Bot stopped");
}
