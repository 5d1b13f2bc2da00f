//! Logging initialization and startup diagnostics

use crate::core::config;

/// Initialize the console logger.
///
/// Honors `RUST_LOG`; defaults to `info` when unset so a bare deployment
/// still produces useful startup output.
pub fn init_logger() {
    if std::env::var("RUST_LOG").is_err() {
        pretty_env_logger::formatted_builder().filter_level(log::LevelFilter::Info).init();
    } else {
        pretty_env_logger::init();
    }
}

/// Logs the effective configuration at startup.
pub fn log_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("📦 sharebox configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("💾 Database: {}", *config::DATABASE_PATH);
    log::info!("🔌 Redis: {}", *config::REDIS_URL);
    if *config::STORAGE_CHANNEL_ID == 0 {
        log::warn!("⚠️ STORAGE_CHANNEL_ID is not set — uploads cannot be backed up");
    } else {
        log::info!("🗄 Storage channel: {}", *config::STORAGE_CHANNEL_ID);
    }
    if *config::ADMIN_MASTER_ID == 0 {
        log::warn!("⚠️ ADMIN_MASTER_ID is not set — no master admin");
    }
}
