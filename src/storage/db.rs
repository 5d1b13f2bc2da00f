//! SQLite storage: users, forced-join channels and stored files.
//!
//! Plain SQL CRUD over an r2d2 pool. Cache-aware reads live one level up
//! in [`crate::storage::repository`]; nothing in this module touches Redis.

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Result;

use crate::core::config;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// A channel users must join before retrieving files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// `@username` or a numeric `-100…` id, stored verbatim
    pub channel_id: String,
    /// Invite link shown on the join panel
    pub link: String,
    pub created_at: String,
}

/// A stored file, addressable by its unique code.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub code: String,
    /// Media kind string, see [`crate::core::session::MediaKind`]
    pub kind: String,
    /// Size in bytes (0 when Telegram did not report one)
    pub size: i64,
    /// Telegram file id usable for re-sending
    pub file_id: String,
    pub unique_id: String,
    /// Message id of the backup copy in the storage channel
    pub backup_message_id: i32,
    pub owner_id: i64,
    pub password: Option<String>,
    pub caption: Option<String>,
    /// Batch id shared by all members of a multi-file upload
    pub album_id: Option<String>,
    /// Insertion position inside the album
    pub album_order: Option<i64>,
    pub downloads: i64,
    pub created_at: String,
}

/// New file row, borrowed from a finalized upload entry.
#[derive(Debug)]
pub struct NewFile<'a> {
    pub code: &'a str,
    pub kind: &'a str,
    pub size: i64,
    pub file_id: &'a str,
    pub unique_id: &'a str,
    pub backup_message_id: i32,
    pub owner_id: i64,
    pub album_id: Option<&'a str>,
    pub album_order: Option<i64>,
}

/// Create a new database connection pool
///
/// Initializes the pool and ensures the schema exists on the first
/// connection.
pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder().max_size(config::db::POOL_MAX_SIZE).build(manager)?;

    let conn = pool.get()?;
    if let Err(e) = migrate_schema(&conn) {
        log::warn!("Failed to migrate schema: {}", e);
    }

    Ok(pool)
}

/// Get a connection from the pool
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Creates the tables when they are missing. Idempotent.
pub fn migrate_schema(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL UNIQUE,
            username TEXT,
            is_admin INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE TABLE IF NOT EXISTS channels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            channel_id TEXT NOT NULL UNIQUE,
            link TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            kind TEXT NOT NULL,
            size INTEGER NOT NULL DEFAULT 0,
            file_id TEXT NOT NULL,
            unique_id TEXT NOT NULL,
            backup_message_id INTEGER NOT NULL,
            owner_id INTEGER NOT NULL,
            password TEXT,
            caption TEXT,
            album_id TEXT,
            album_order INTEGER,
            downloads INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_files_owner ON files(owner_id);
        CREATE INDEX IF NOT EXISTS idx_files_album ON files(album_id);",
    )
}

// ── users ───────────────────────────────────────────────────────────

/// Inserts the user when unseen. Returns `true` when a row was created.
pub fn create_user(conn: &DbConnection, user_id: i64, username: Option<&str>) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO users (user_id, username) VALUES (?1, ?2)",
        rusqlite::params![user_id, username],
    )?;
    Ok(inserted > 0)
}

pub fn get_all_user_ids(conn: &DbConnection) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT user_id FROM users ORDER BY id")?;
    let ids = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<i64>>>()?;
    Ok(ids)
}

pub fn get_admin_ids(conn: &DbConnection) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT user_id FROM users WHERE is_admin = 1 ORDER BY id")?;
    let ids = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<i64>>>()?;
    Ok(ids)
}

/// Grants or revokes admin rights. Creates the user row when missing so
/// an admin can be appointed before their first message.
/// Returns `true` when the flag actually changed.
pub fn set_admin(conn: &DbConnection, user_id: i64, is_admin: bool) -> Result<bool> {
    conn.execute("INSERT OR IGNORE INTO users (user_id) VALUES (?1)", rusqlite::params![user_id])?;
    let changed = conn.execute(
        "UPDATE users SET is_admin = ?2 WHERE user_id = ?1 AND is_admin != ?2",
        rusqlite::params![user_id, i32::from(is_admin)],
    )?;
    Ok(changed > 0)
}

pub fn count_users(conn: &DbConnection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
}

// ── channels ────────────────────────────────────────────────────────

/// Registers a channel, reviving a previously removed row.
/// Returns `false` when the channel is already active.
pub fn add_channel(conn: &DbConnection, channel_id: &str, link: &str) -> Result<bool> {
    let changed = conn.execute(
        "INSERT INTO channels (channel_id, link) VALUES (?1, ?2)
         ON CONFLICT(channel_id) DO UPDATE SET link = excluded.link, is_active = 1
         WHERE is_active = 0",
        rusqlite::params![channel_id, link],
    )?;
    Ok(changed > 0)
}

/// Deactivates a channel. Returns `false` when no active channel matched.
pub fn remove_channel(conn: &DbConnection, channel_id: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE channels SET is_active = 0 WHERE channel_id = ? AND is_active = 1",
        rusqlite::params![channel_id],
    )?;
    Ok(changed > 0)
}

/// Active channels only; removed ones stay as inactive rows.
pub fn get_channels(conn: &DbConnection) -> Result<Vec<Channel>> {
    let mut stmt = conn
        .prepare("SELECT channel_id, link, created_at FROM channels WHERE is_active = 1 ORDER BY id")?;
    let channels = stmt
        .query_map([], |row| {
            Ok(Channel { channel_id: row.get(0)?, link: row.get(1)?, created_at: row.get(2)? })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(channels)
}

// ── files ───────────────────────────────────────────────────────────

const FILE_COLUMNS: &str = "code, kind, size, file_id, unique_id, backup_message_id, owner_id, \
     password, caption, album_id, album_order, downloads, created_at";

fn file_from_row(row: &rusqlite::Row<'_>) -> Result<FileRecord> {
    Ok(FileRecord {
        code: row.get(0)?,
        kind: row.get(1)?,
        size: row.get(2)?,
        file_id: row.get(3)?,
        unique_id: row.get(4)?,
        backup_message_id: row.get(5)?,
        owner_id: row.get(6)?,
        password: row.get(7)?,
        caption: row.get(8)?,
        album_id: row.get(9)?,
        album_order: row.get(10)?,
        downloads: row.get(11)?,
        created_at: row.get(12)?,
    })
}

pub fn insert_file(conn: &DbConnection, file: &NewFile<'_>) -> Result<()> {
    conn.execute(
        "INSERT INTO files (code, kind, size, file_id, unique_id, backup_message_id,
                            owner_id, album_id, album_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            file.code,
            file.kind,
            file.size,
            file.file_id,
            file.unique_id,
            file.backup_message_id,
            file.owner_id,
            file.album_id,
            file.album_order,
        ],
    )?;
    Ok(())
}

pub fn get_file_by_code(conn: &DbConnection, code: &str) -> Result<Option<FileRecord>> {
    let mut stmt = conn.prepare(&format!("SELECT {FILE_COLUMNS} FROM files WHERE code = ?"))?;
    let mut rows = stmt.query(rusqlite::params![code])?;
    if let Some(row) = rows.next()? {
        Ok(Some(file_from_row(row)?))
    } else {
        Ok(None)
    }
}

/// All members of an album, in upload order.
pub fn get_album_files(conn: &DbConnection, album_id: &str) -> Result<Vec<FileRecord>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {FILE_COLUMNS} FROM files WHERE album_id = ? ORDER BY album_order"))?;
    let files =
        stmt.query_map(rusqlite::params![album_id], file_from_row)?.collect::<Result<Vec<_>>>()?;
    Ok(files)
}

/// An owner's shareable files: standalone files plus album primaries.
/// The `_part` members never carry their own listing entry.
pub fn get_user_primary_files(conn: &DbConnection, owner_id: i64) -> Result<Vec<FileRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FILE_COLUMNS} FROM files
         WHERE owner_id = ? AND code NOT LIKE '%\\_part%' ESCAPE '\\'
         ORDER BY id DESC"
    ))?;
    let files =
        stmt.query_map(rusqlite::params![owner_id], file_from_row)?.collect::<Result<Vec<_>>>()?;
    Ok(files)
}

pub fn count_user_primary_files(conn: &DbConnection, owner_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM files WHERE owner_id = ? AND code NOT LIKE '%\\_part%' ESCAPE '\\'",
        rusqlite::params![owner_id],
        |row| row.get(0),
    )
}

pub fn count_files(conn: &DbConnection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
}

/// Deletes a stored file and, when it belongs to an album, every member
/// of that album. Returns the removed records so the caller can drop the
/// backup copies from the storage channel.
pub fn delete_file_cascade(conn: &DbConnection, record: &FileRecord) -> Result<Vec<FileRecord>> {
    let removed = match record.album_id.as_deref() {
        Some(album_id) => {
            let members = get_album_files(conn, album_id)?;
            conn.execute("DELETE FROM files WHERE album_id = ?", rusqlite::params![album_id])?;
            members
        }
        None => {
            conn.execute("DELETE FROM files WHERE code = ?", rusqlite::params![record.code])?;
            vec![record.clone()]
        }
    };
    Ok(removed)
}

/// Returns `true` when the row existed.
pub fn set_caption(conn: &DbConnection, code: &str, caption: Option<&str>) -> Result<bool> {
    let changed =
        conn.execute("UPDATE files SET caption = ?2 WHERE code = ?1", rusqlite::params![code, caption])?;
    Ok(changed > 0)
}

/// Returns `true` when the row existed.
pub fn set_password(conn: &DbConnection, code: &str, password: Option<&str>) -> Result<bool> {
    let changed = conn
        .execute("UPDATE files SET password = ?2 WHERE code = ?1", rusqlite::params![code, password])?;
    Ok(changed > 0)
}

/// Bumps the delivery counter of the primary record.
pub fn increment_downloads(conn: &DbConnection, code: &str) -> Result<()> {
    conn.execute("UPDATE files SET downloads = downloads + 1 WHERE code = ?", rusqlite::params![code])?;
    Ok(())
}
