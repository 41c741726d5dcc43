//! # Hearth Client Host
//!
//! Headless host for the client core: loads config, opens storage,
//! hydrates every store and reports what it found.
//!
//! ```text
//! HEARTH_DATA_DIR=/tmp/hearth RUST_LOG=debug hearth-client
//! ```

use hearth_client::{init_tracing, AppState, ClientConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Hearth client");

    let config = ClientConfig::load_or_default(None);
    info!(
        db_path = %config.database_path().display(),
        namespace = %config.storage.namespace,
        platform = %config.notifications.platform,
        "Configuration loaded"
    );

    let state = AppState::from_config(&config).await?;
    let init = state.initialize().await;
    if init.has_failures() {
        warn!("Started with defaults for unreadable state");
    }

    let prefs = state.theme().preferences();
    info!(
        favorites = state.favorites().favorite_cooks().len(),
        notifications = state.notifications().notifications().len(),
        unread = state.notifications().unread_count(),
        dark_mode = prefs.is_dark_mode,
        sound = prefs.sound_enabled,
        "Stores hydrated"
    );
    info!(report = %serde_json::to_string(&init)?, "Startup report");

    state.flush().await?;
    info!("Shutdown complete");
    Ok(())
}
