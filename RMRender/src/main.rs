use std::sync::Arc;

use rmrconfig::get_config;
use rmroutput::backends;
use rmrtransport::Transport;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ========== PHASE 1 : Logging and configuration ==========

    let config = get_config();
    if config.get_log_enable_console() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.get_log_min_level().to_lowercase()));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    info!(config_dir=%config.config_directory(), "Configuration loaded");

    // ========== PHASE 2 : Output backend ==========

    let backend = config.get_backend();
    let options = config.get_backend_options();
    info!("🎛️ Creating output backend '{}'...", backend);
    let (engine, events) = backends::create(&backend, &options)?;

    // ========== PHASE 3 : Transport ==========

    let transport = Transport::new(engine, events);
    transport.set_volume(config.get_initial_volume())?;

    // Mirror every state-variable change into the log; the control protocol
    // layer subscribes the same way.
    transport.subscribe(Arc::new(|name, old, new| {
        info!(target: "rmrender", "{}: '{}' -> '{}'", name, old, new);
    }));

    info!("✅ {} is ready for rendering!", config.get_friendly_name());
    info!("Press Ctrl+C to stop...");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    Ok(())
}
