//! Per-user conversation state
//!
//! A user is either idle (no entry in the store) or in exactly one named
//! dialog state, optionally carrying a resolved file record between steps
//! (e.g. the file a password prompt refers to). Setting a state replaces
//! the whole entry; clearing drops both state and context.

use dashmap::DashMap;

use crate::storage::db::FileRecord;

/// Named dialog states. One per multi-step flow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationState {
    /// Collecting media into the current upload session
    UploadCollect,
    /// Waiting for the code of a file to delete
    DeleteFile,
    /// Caption flow: waiting for the target code
    CaptionAwaitCode,
    /// Caption flow: waiting for the caption text
    CaptionAwaitText,
    /// Caption removal: waiting for the target code
    CaptionUnsetAwaitCode,
    /// Password flow: waiting for the target code
    PasswordAwaitCode,
    /// Password flow: waiting for the password text
    PasswordAwaitText,
    /// Password removal: waiting for the target code
    PasswordUnsetAwaitCode,
    /// Retrieval of a protected file: waiting for the password
    GetFileAwaitPassword,
    /// Tracking info: waiting for the code to inspect
    TrackingAwaitCode,
    /// Admin panel is open
    AdminPanel,
    /// Waiting for a user id to grant admin rights
    AdminSetAdmin,
    /// Waiting for a user id to revoke admin rights
    AdminUnsetAdmin,
    /// Waiting for a message to forward to every user
    AdminForwardBroadcast,
    /// Waiting for a text to copy to every user
    AdminTextBroadcast,
    /// Forced-join management panel is open
    JoinPanel,
    /// Waiting for a channel payload to add
    JoinAddChannel,
    /// Waiting for a channel id to remove
    JoinRemoveChannel,
}

/// What the state store holds per user.
#[derive(Debug, Clone)]
pub struct StateEntry {
    pub state: ConversationState,
    /// File the current flow refers to, resolved at the previous step.
    pub context: Option<FileRecord>,
}

/// In-memory conversation state, keyed by Telegram user id.
#[derive(Debug, Default)]
pub struct StateStore {
    entries: DashMap<i64, StateEntry>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, `None` when the user is idle.
    pub fn state(&self, user_id: i64) -> Option<ConversationState> {
        self.entries.get(&user_id).map(|e| e.state)
    }

    /// Carried context of the current flow, if any.
    pub fn context(&self, user_id: i64) -> Option<FileRecord> {
        self.entries.get(&user_id).and_then(|e| e.context.clone())
    }

    /// Enters `state` with no carried context, replacing any previous entry.
    pub fn set(&self, user_id: i64, state: ConversationState) {
        self.entries.insert(user_id, StateEntry { state, context: None });
    }

    /// Enters `state` carrying `context`, replacing any previous entry.
    pub fn set_with_context(&self, user_id: i64, state: ConversationState, context: FileRecord) {
        self.entries.insert(user_id, StateEntry { state, context: Some(context) });
    }

    /// Returns the user to idle, dropping state and context together.
    pub fn clear(&self, user_id: i64) {
        self.entries.remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(code: &str) -> FileRecord {
        FileRecord {
            code: code.to_string(),
            kind: "photo".to_string(),
            size: 1024,
            file_id: "f".to_string(),
            unique_id: "u".to_string(),
            backup_message_id: 1,
            owner_id: 7,
            password: None,
            caption: None,
            album_id: None,
            album_order: None,
            downloads: 0,
            created_at: String::new(),
        }
    }

    #[test]
    fn idle_user_has_no_state() {
        let store = StateStore::new();
        assert_eq!(store.state(1), None);
        assert_eq!(store.context(1).map(|r| r.code), None);
    }

    #[test]
    fn set_replaces_state_and_drops_stale_context() {
        let store = StateStore::new();
        store.set_with_context(1, ConversationState::GetFileAwaitPassword, record("abc"));
        assert_eq!(store.state(1), Some(ConversationState::GetFileAwaitPassword));
        assert_eq!(store.context(1).map(|r| r.code), Some("abc".to_string()));

        // A plain set must not leak the previous flow's context.
        store.set(1, ConversationState::DeleteFile);
        assert_eq!(store.state(1), Some(ConversationState::DeleteFile));
        assert_eq!(store.context(1).map(|r| r.code), None);
    }

    #[test]
    fn clear_drops_state_and_context() {
        let store = StateStore::new();
        store.set_with_context(1, ConversationState::CaptionAwaitText, record("xyz"));
        store.clear(1);
        assert_eq!(store.state(1), None);
        assert!(store.context(1).is_none());
    }

    #[test]
    fn users_do_not_share_state() {
        let store = StateStore::new();
        store.set(1, ConversationState::UploadCollect);
        store.set(2, ConversationState::AdminPanel);
        assert_eq!(store.state(1), Some(ConversationState::UploadCollect));
        assert_eq!(store.state(2), Some(ConversationState::AdminPanel));
        store.clear(1);
        assert_eq!(store.state(2), Some(ConversationState::AdminPanel));
    }
}
