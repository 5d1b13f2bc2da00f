//! Upload sessions
//!
//! While a user is in the upload flow, every media message they send is
//! appended to their session. Finishing the session assigns share codes:
//! a single bare code for the batch, plus `{code}_part{N}` codes for the
//! remaining members when the batch holds more than one item. The bare
//! code is the only one shown to the user.

use dashmap::DashMap;

use crate::core::config::codes;
use crate::core::error::{AppError, AppResult};
use crate::core::utils::generate_code;

/// Kind of a stored media item, as reported by Telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
    Voice,
    Audio,
    Document,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Animation => "animation",
            Self::Voice => "voice",
            Self::Audio => "audio",
            Self::Document => "document",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "photo" => Some(Self::Photo),
            "video" => Some(Self::Video),
            "animation" => Some(Self::Animation),
            "voice" => Some(Self::Voice),
            "audio" => Some(Self::Audio),
            "document" => Some(Self::Document),
            _ => None,
        }
    }

    /// Label used in summaries and listings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Photo => "Photo",
            Self::Video => "Video",
            Self::Animation => "Animation",
            Self::Voice => "Voice message",
            Self::Audio => "Audio",
            Self::Document => "Document",
        }
    }
}

/// One media item captured during an upload session. Immutable once added.
#[derive(Debug, Clone)]
pub struct UploadedItem {
    pub kind: MediaKind,
    /// Size in bytes as reported by Telegram (0 when unknown)
    pub size: i64,
    /// Telegram file id usable for re-sending
    pub file_id: String,
    /// Telegram file unique id
    pub unique_id: String,
    /// Message id of the copy in the storage channel
    pub backup_message_id: i32,
}

#[derive(Debug, Default)]
struct UploadSession {
    items: Vec<UploadedItem>,
}

/// Per-kind counts and totals of the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    /// (kind, count) pairs in first-seen order
    pub kinds: Vec<(MediaKind, usize)>,
    pub total: usize,
    /// Total size in megabytes, rounded to two decimals
    pub total_mb: f64,
}

/// One finalized batch member with its assigned code.
#[derive(Debug, Clone)]
pub struct FinalizedEntry {
    pub code: String,
    /// 0-based insertion position inside the batch
    pub album_order: Option<i64>,
    pub item: UploadedItem,
}

/// Result of finishing an upload session.
#[derive(Debug, Clone)]
pub struct FinalizedUpload {
    /// The bare code the user shares
    pub share_code: String,
    /// Set when the batch holds more than one item
    pub album_id: Option<String>,
    pub entries: Vec<FinalizedEntry>,
}

/// In-memory upload sessions, keyed by Telegram user id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<i64, UploadSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a fresh session, discarding any unfinished one.
    pub fn start(&self, user_id: i64) {
        if let Some((_, old)) = self.sessions.remove(&user_id) {
            if !old.items.is_empty() {
                log::info!("🗑 Discarding unfinished upload session of {} ({} items)", user_id, old.items.len());
            }
        }
        self.sessions.insert(user_id, UploadSession::default());
    }

    pub fn is_active(&self, user_id: i64) -> bool {
        self.sessions.contains_key(&user_id)
    }

    /// Appends an item to the active session.
    ///
    /// Returns the new item count, or [`AppError::NoActiveSession`] when the
    /// user never started (or already finished) a session.
    pub fn add_item(&self, user_id: i64, item: UploadedItem) -> AppResult<usize> {
        let mut session = self.sessions.get_mut(&user_id).ok_or(AppError::NoActiveSession)?;
        session.items.push(item);
        Ok(session.items.len())
    }

    /// Aggregated view of the active session.
    pub fn summary(&self, user_id: i64) -> AppResult<SessionSummary> {
        let session = self.sessions.get(&user_id).ok_or(AppError::NoActiveSession)?;
        let mut kinds: Vec<(MediaKind, usize)> = Vec::new();
        let mut total_bytes: i64 = 0;
        for item in &session.items {
            match kinds.iter_mut().find(|(k, _)| *k == item.kind) {
                Some((_, n)) => *n += 1,
                None => kinds.push((item.kind, 1)),
            }
            total_bytes += item.size;
        }
        Ok(SessionSummary {
            kinds,
            total: session.items.len(),
            total_mb: crate::core::utils::bytes_to_mb(total_bytes),
        })
    }

    /// Assigns share codes to the session items.
    ///
    /// The session stays open until [`SessionStore::clear`]; persistence
    /// happens between the two, so a storage failure can still cancel.
    /// Empty sessions cannot be finalized.
    pub fn finalize(&self, user_id: i64) -> AppResult<FinalizedUpload> {
        let session = self.sessions.get(&user_id).ok_or(AppError::NoActiveSession)?;
        if session.items.is_empty() {
            return Err(AppError::InvalidInput("upload session is empty".to_string()));
        }

        let share_code = generate_code(codes::SHARE_CODE_LEN);
        let album = session.items.len() > 1;
        let album_id = album.then(|| generate_code(codes::ALBUM_ID_LEN));

        let entries = session
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| FinalizedEntry {
                code: if idx == 0 { share_code.clone() } else { format!("{share_code}_part{idx}") },
                album_order: Some(idx as i64),
                item: item.clone(),
            })
            .collect();

        Ok(FinalizedUpload { share_code, album_id, entries })
    }

    /// Aborts the session, returning the storage-channel message ids of the
    /// collected items so callers can delete the backup copies.
    pub fn cancel(&self, user_id: i64) -> AppResult<Vec<i32>> {
        let (_, session) = self.sessions.remove(&user_id).ok_or(AppError::NoActiveSession)?;
        Ok(session.items.iter().map(|i| i.backup_message_id).collect())
    }

    /// Drops the session without reporting anything. No-op when absent.
    pub fn clear(&self, user_id: i64) {
        self.sessions.remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(kind: MediaKind, size: i64, msg: i32) -> UploadedItem {
        UploadedItem {
            kind,
            size,
            file_id: format!("file{msg}"),
            unique_id: format!("uniq{msg}"),
            backup_message_id: msg,
        }
    }

    #[test]
    fn add_without_start_is_rejected() {
        let store = SessionStore::new();
        let err = store.add_item(1, item(MediaKind::Photo, 10, 1));
        assert!(matches!(err, Err(AppError::NoActiveSession)));
    }

    #[test]
    fn start_discards_previous_items() {
        let store = SessionStore::new();
        store.start(1);
        store.add_item(1, item(MediaKind::Photo, 10, 1)).unwrap();
        store.start(1);
        let summary = store.summary(1).unwrap();
        assert_eq!(summary.total, 0);
    }

    #[test]
    fn summary_counts_kinds_and_rounds_megabytes() {
        let store = SessionStore::new();
        store.start(5);
        store.add_item(5, item(MediaKind::Photo, 1_048_576, 1)).unwrap();
        store.add_item(5, item(MediaKind::Photo, 1_048_576, 2)).unwrap();
        store.add_item(5, item(MediaKind::Video, 524_288, 3)).unwrap();
        let summary = store.summary(5).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.total_mb, 2.5);
        assert_eq!(summary.kinds, vec![(MediaKind::Photo, 2), (MediaKind::Video, 1)]);
    }

    #[test]
    fn single_item_gets_bare_code_and_no_album() {
        let store = SessionStore::new();
        store.start(1);
        store.add_item(1, item(MediaKind::Document, 100, 9)).unwrap();
        let done = store.finalize(1).unwrap();
        assert_eq!(done.entries.len(), 1);
        assert_eq!(done.album_id, None);
        assert_eq!(done.entries[0].code, done.share_code);
        // A lone file is still position 0 of its batch.
        assert_eq!(done.entries[0].album_order, Some(0));
        assert_eq!(done.share_code.len(), codes::SHARE_CODE_LEN);
    }

    #[test]
    fn multi_item_batch_shares_album_and_part_codes() {
        let store = SessionStore::new();
        store.start(1);
        for n in 0..3 {
            store.add_item(1, item(MediaKind::Photo, 10, n)).unwrap();
        }
        let done = store.finalize(1).unwrap();
        let album = done.album_id.clone().unwrap();
        assert_eq!(album.len(), codes::ALBUM_ID_LEN);
        assert_eq!(done.entries[0].code, done.share_code);
        assert_eq!(done.entries[1].code, format!("{}_part1", done.share_code));
        assert_eq!(done.entries[2].code, format!("{}_part2", done.share_code));
        let orders: Vec<_> = done.entries.iter().map(|e| e.album_order).collect();
        assert_eq!(orders, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn finalize_keeps_session_until_cleared() {
        let store = SessionStore::new();
        store.start(1);
        store.add_item(1, item(MediaKind::Photo, 10, 1)).unwrap();
        store.finalize(1).unwrap();
        assert!(store.is_active(1));
        store.clear(1);
        assert!(!store.is_active(1));
    }

    #[test]
    fn cancel_returns_backup_ids_and_closes() {
        let store = SessionStore::new();
        store.start(1);
        store.add_item(1, item(MediaKind::Photo, 10, 11)).unwrap();
        store.add_item(1, item(MediaKind::Video, 10, 22)).unwrap();
        let ids = store.cancel(1).unwrap();
        assert_eq!(ids, vec![11, 22]);
        assert!(matches!(store.cancel(1), Err(AppError::NoActiveSession)));
    }

    #[test]
    fn empty_session_cannot_finalize() {
        let store = SessionStore::new();
        store.start(1);
        assert!(matches!(store.finalize(1), Err(AppError::InvalidInput(_))));
    }
}
