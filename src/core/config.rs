use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot

/// Path to the SQLite database file
/// Read once at startup from DATABASE_PATH or defaults to "sharebox.db"
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "sharebox.db".to_string()));

/// Redis connection URL
/// Read from REDIS_URL, defaults to a local instance
pub static REDIS_URL: Lazy<String> =
    Lazy::new(|| env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()));

/// Master admin user id. This user is always treated as an admin regardless
/// of the admins table, and receives error notifications.
/// Read from ADMIN_MASTER_ID, 0 disables the master admin.
pub static ADMIN_MASTER_ID: Lazy<i64> = Lazy::new(|| {
    env::var("ADMIN_MASTER_ID").ok().and_then(|v| v.parse().ok()).unwrap_or(0)
});

/// Private channel where every uploaded file is backed up.
/// Read from STORAGE_CHANNEL_ID (a `-100…` channel id).
pub static STORAGE_CHANNEL_ID: Lazy<i64> = Lazy::new(|| {
    env::var("STORAGE_CHANNEL_ID").ok().and_then(|v| v.parse().ok()).unwrap_or(0)
});

/// Public handle of the bot's creator, shown by the creator button
pub static CREATOR_HANDLE: Lazy<String> =
    Lazy::new(|| env::var("CREATOR_HANDLE").unwrap_or_else(|_| "@sharebox_support".to_string()));

/// Share-code generation parameters
pub mod codes {
    /// Length of a bare retrieval code
    pub const SHARE_CODE_LEN: usize = 15;

    /// Length of an album id shared by the parts of one upload batch
    pub const ALBUM_ID_LEN: usize = 20;

    /// Upper bound accepted when parsing a code out of user input
    pub const MAX_CODE_LEN: usize = 32;
}

/// Broadcast fan-out configuration
pub mod broadcast {
    use super::Duration;

    /// Maximum number of sends in flight at once
    pub const MAX_CONCURRENT: usize = 20;

    /// Pause after each send (in milliseconds)
    pub const SEND_DELAY_MS: u64 = 50;

    /// Post-send delay duration
    pub fn send_delay() -> Duration {
        Duration::from_millis(SEND_DELAY_MS)
    }
}

/// Ephemeral delivered-message cleanup
pub mod cleanup {
    use super::Duration;

    /// Interval between janitor sweeps (in seconds)
    pub const INTERVAL_SECS: u64 = 30;

    /// Sweep interval duration
    pub fn interval() -> Duration {
        Duration::from_secs(INTERVAL_SECS)
    }
}

/// Database pool configuration
pub mod db {
    /// Maximum connections kept by the r2d2 pool
    pub const POOL_MAX_SIZE: u32 = 10;
}
