//! Handler dependencies and the normalized event type.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{ChatKind, Message};

use crate::core::config;
use crate::core::error::AppResult;
use crate::core::session::SessionStore;
use crate::core::state::StateStore;
use crate::storage::repository::Repository;
use crate::telegram::cleanup::CleanupQueue;
use crate::telegram::keyboards;
use crate::telegram::membership::{check_membership, GateOutcome};

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub repo: Repository,
    pub states: Arc<StateStore>,
    pub sessions: Arc<SessionStore>,
    pub cleanup: Arc<CleanupQueue>,
    pub bot_username: Option<String>,
    /// Private channel every upload is copied into
    pub storage_channel: ChatId,
}

impl HandlerDeps {
    /// Whether the user is an admin: the configured master admin always
    /// is; everyone else is looked up through the cached admin list.
    pub async fn is_admin(&self, user_id: i64) -> bool {
        if user_id != 0 && user_id == *config::ADMIN_MASTER_ID {
            return true;
        }
        self.repo.is_admin(user_id).await.unwrap_or(false)
    }

    pub fn bot_username(&self) -> &str {
        self.bot_username.as_deref().unwrap_or("this_bot")
    }
}

/// Normalized view of an incoming message.
#[derive(Clone)]
pub struct Event {
    pub chat_id: ChatId,
    /// 0 when Telegram attached no sender (channel posts etc.)
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub is_private: bool,
    pub text: Option<String>,
    pub message: Message,
}

impl Event {
    pub fn from_message(msg: Message) -> Self {
        Self {
            chat_id: msg.chat.id,
            user_id: msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()).unwrap_or(0),
            username: msg.from.as_ref().and_then(|u| u.username.clone()),
            first_name: msg.from.as_ref().map(|u| u.first_name.clone()),
            is_private: matches!(msg.chat.kind, ChatKind::Private(_)),
            text: msg.text().map(str::to_string),
            message: msg,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// Upserts the sender and runs the membership gate.
///
/// Returns `true` when the user may proceed. On an unmet gate the join
/// panel is sent, carrying `pending_code` so the retry button can re-run
/// the interrupted retrieval.
pub async fn ensure_access(
    bot: &Bot,
    event: &Event,
    deps: &HandlerDeps,
    pending_code: Option<&str>,
) -> AppResult<bool> {
    deps.repo.ensure_user(event.user_id, event.username.as_deref()).await?;

    // Admins are never locked out of their own bot.
    if deps.is_admin(event.user_id).await {
        return Ok(true);
    }

    let channels = deps.repo.channels(bot).await?;
    match check_membership(bot, &channels, event.user_id).await {
        GateOutcome::Pass => Ok(true),
        GateOutcome::Missing(missing) => {
            bot.send_message(
                event.chat_id,
                "🔒 To use this bot, please join the channels below, then come back.",
            )
            .reply_markup(keyboards::membership_gate(&missing, deps.bot_username(), pending_code))
            .await?;
            Ok(false)
        }
    }
}
