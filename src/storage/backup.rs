//! Database backup for the admin panel.

use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::AppResult;
use crate::storage::db::{get_connection, DbPool};

/// Copies the live database to a timestamped file using SQLite's online
/// backup API and returns its path. The copy is safe to take while the
/// bot keeps serving writes.
pub fn create_backup(pool: &DbPool) -> AppResult<PathBuf> {
    let conn = get_connection(pool)?;
    let timestamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S");
    let path = PathBuf::from(format!("backup-{timestamp}.db"));

    let mut dst = rusqlite::Connection::open(&path)?;
    let backup = rusqlite::backup::Backup::new(&conn, &mut dst)?;
    backup.run_to_completion(64, Duration::from_millis(50), None)?;

    log::info!("💾 Database backed up to {}", path.display());
    Ok(path)
}
