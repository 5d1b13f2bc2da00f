//! Cache-through data access.
//!
//! All reads of the three hot collections (user ids, admin ids, channel
//! map) go through Redis first and fall back to SQLite on a miss, writing
//! the rebuilt value back. Writes keep the cache honest: user creation
//! patches the cached id list in place, admin changes rebuild the admin
//! list wholesale, channel mutations invalidate the map so the next read
//! rebuilds it. The cache never holds a partial collection.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::core::error::{AppError, AppResult};
use crate::storage::cache::RedisCache;
use crate::storage::db::{self, Channel, DbPool, FileRecord, NewFile};

/// Cached per-channel presentation data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Resolved channel title, or the raw id when resolution failed
    pub title: String,
    /// Invite link shown on the join panel
    pub link: String,
}

/// channel id → info, ordered for stable rendering.
pub type ChannelMap = BTreeMap<String, ChannelInfo>;

/// Resolves a channel id to its human-readable title.
///
/// Implemented by the bot against the Telegram API; tests script it.
#[async_trait]
pub trait ChannelTitleResolver: Send + Sync {
    /// `None` when the title cannot be resolved; the caller then shows
    /// the raw id instead.
    async fn resolve_title(&self, channel_id: &str) -> Option<String>;
}

/// Data access facade handed to every handler.
#[derive(Clone)]
pub struct Repository {
    pool: Arc<DbPool>,
    cache: RedisCache,
}

impl Repository {
    pub fn new(pool: Arc<DbPool>, cache: RedisCache) -> Self {
        Self { pool, cache }
    }

    pub fn pool(&self) -> &Arc<DbPool> {
        &self.pool
    }

    fn conn(&self) -> AppResult<db::DbConnection> {
        Ok(db::get_connection(&self.pool)?)
    }

    // ── users ───────────────────────────────────────────────────────

    /// Every known user id. Cache-through.
    pub async fn user_ids(&self) -> AppResult<Vec<i64>> {
        if let Some(ids) = self.cache.get_user_ids().await {
            return Ok(ids);
        }
        let ids = db::get_all_user_ids(&self.conn()?)?;
        self.cache.set_user_ids(&ids).await;
        Ok(ids)
    }

    /// Upserts the sender. New users are appended to the cached id list
    /// instead of invalidating it. Returns `true` for a first contact.
    pub async fn ensure_user(&self, user_id: i64, username: Option<&str>) -> AppResult<bool> {
        let created = db::create_user(&self.conn()?, user_id, username)?;
        if created {
            log::info!("👤 New user {}", user_id);
            self.cache.add_user_id(user_id).await;
        }
        Ok(created)
    }

    pub fn count_users(&self) -> AppResult<i64> {
        Ok(db::count_users(&self.conn()?)?)
    }

    // ── admins ──────────────────────────────────────────────────────

    /// Admin user ids. Cache-through.
    pub async fn admin_ids(&self) -> AppResult<Vec<i64>> {
        if let Some(ids) = self.cache.get_admin_ids().await {
            return Ok(ids);
        }
        let ids = db::get_admin_ids(&self.conn()?)?;
        self.cache.set_admin_ids(&ids).await;
        Ok(ids)
    }

    pub async fn is_admin(&self, user_id: i64) -> AppResult<bool> {
        Ok(self.admin_ids().await?.contains(&user_id))
    }

    /// Grants or revokes admin rights, then rebuilds the cached admin
    /// list from the database. Returns `false` when nothing changed.
    pub async fn set_admin(&self, user_id: i64, is_admin: bool) -> AppResult<bool> {
        let conn = self.conn()?;
        let changed = db::set_admin(&conn, user_id, is_admin)?;
        if changed {
            let ids = db::get_admin_ids(&conn)?;
            self.cache.set_admin_ids(&ids).await;
        }
        Ok(changed)
    }

    // ── channels ────────────────────────────────────────────────────

    /// The forced-join channel map. Cache-through; a miss reads the
    /// channel rows and resolves every title concurrently, degrading to
    /// the raw id for channels the resolver cannot name.
    pub async fn channels(&self, resolver: &dyn ChannelTitleResolver) -> AppResult<ChannelMap> {
        if let Some(map) = self.cache.get_channel_map::<ChannelMap>().await {
            return Ok(map);
        }
        let rows = db::get_channels(&self.conn()?)?;
        let map = self.build_channel_map(rows, resolver).await;
        self.cache.set_channel_map(&map).await;
        Ok(map)
    }

    async fn build_channel_map(&self, rows: Vec<Channel>, resolver: &dyn ChannelTitleResolver) -> ChannelMap {
        let titles = join_all(rows.iter().map(|c| resolver.resolve_title(&c.channel_id))).await;
        rows.into_iter()
            .zip(titles)
            .map(|(c, title)| {
                let title = title.unwrap_or_else(|| c.channel_id.clone());
                (c.channel_id, ChannelInfo { title, link: c.link })
            })
            .collect()
    }

    /// Registers a forced-join channel and drops the cached map.
    /// Returns `false` when the channel was already present.
    pub async fn add_channel(&self, channel_id: &str, link: &str) -> AppResult<bool> {
        let added = db::add_channel(&self.conn()?, channel_id, link)?;
        if added {
            self.cache.invalidate_channel_map().await;
        }
        Ok(added)
    }

    /// Unregisters a forced-join channel and drops the cached map.
    /// Returns `false` when no such channel existed.
    pub async fn remove_channel(&self, channel_id: &str) -> AppResult<bool> {
        let removed = db::remove_channel(&self.conn()?, channel_id)?;
        if removed {
            self.cache.invalidate_channel_map().await;
        }
        Ok(removed)
    }

    // ── files ───────────────────────────────────────────────────────

    /// Looks a stored file up by code.
    pub fn find_file(&self, code: &str) -> AppResult<FileRecord> {
        db::get_file_by_code(&self.conn()?, code)?.ok_or_else(|| AppError::NotFound(code.to_string()))
    }

    /// All album members in upload order, or just the record itself for
    /// standalone files.
    pub fn resolve_batch(&self, record: &FileRecord) -> AppResult<Vec<FileRecord>> {
        match record.album_id.as_deref() {
            Some(album_id) => Ok(db::get_album_files(&self.conn()?, album_id)?),
            None => Ok(vec![record.clone()]),
        }
    }

    /// Persists a finalized upload batch. Stops at the first failing row
    /// and reports it as a persistence error; rows already written stay.
    pub fn save_files(&self, files: &[NewFile<'_>]) -> AppResult<()> {
        let conn = self.conn()?;
        for file in files {
            db::insert_file(&conn, file)
                .map_err(|e| AppError::Persistence(format!("saving {}: {}", file.code, e)))?;
        }
        Ok(())
    }

    /// Removes a file (cascading over its album) and returns the removed
    /// records so the storage-channel copies can be deleted too.
    pub fn delete_file(&self, record: &FileRecord) -> AppResult<Vec<FileRecord>> {
        Ok(db::delete_file_cascade(&self.conn()?, record)?)
    }

    pub fn set_caption(&self, code: &str, caption: Option<&str>) -> AppResult<()> {
        if db::set_caption(&self.conn()?, code, caption)? {
            Ok(())
        } else {
            Err(AppError::NotFound(code.to_string()))
        }
    }

    pub fn set_password(&self, code: &str, password: Option<&str>) -> AppResult<()> {
        if db::set_password(&self.conn()?, code, password)? {
            Ok(())
        } else {
            Err(AppError::NotFound(code.to_string()))
        }
    }

    pub fn increment_downloads(&self, code: &str) -> AppResult<()> {
        Ok(db::increment_downloads(&self.conn()?, code)?)
    }

    pub fn user_files(&self, owner_id: i64) -> AppResult<Vec<FileRecord>> {
        Ok(db::get_user_primary_files(&self.conn()?, owner_id)?)
    }

    pub fn count_user_files(&self, owner_id: i64) -> AppResult<i64> {
        Ok(db::count_user_primary_files(&self.conn()?, owner_id)?)
    }

    pub fn count_files(&self) -> AppResult<i64> {
        Ok(db::count_files(&self.conn()?)?)
    }
}
