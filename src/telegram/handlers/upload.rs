//! Upload flow: session start, media collection, finish and cancel.

use teloxide::prelude::*;
use teloxide::types::MessageId;

use crate::core::error::AppError;
use crate::core::session::UploadedItem;
use crate::core::state::ConversationState;
use crate::core::utils::share_link;
use crate::storage::db::NewFile;
use crate::telegram::handlers::types::{ensure_access, Event, HandlerDeps};
use crate::telegram::keyboards;
use crate::telegram::media::extract_media;
use crate::telegram::router::{Flow, HandlerFuture};

/// Upload button: opens a session and enters the collect state.
pub fn upload_start(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        if !ensure_access(&bot, &event, &deps, None).await? {
            return Ok(Flow::Stop);
        }
        if deps.storage_channel.0 == 0 {
            bot.send_message(event.chat_id, "⚠️ Uploads are not configured on this bot.").await?;
            return Ok(Flow::Stop);
        }
        deps.sessions.start(event.user_id);
        deps.states.set(event.user_id, ConversationState::UploadCollect);
        bot.send_message(
            event.chat_id,
            "📤 Send me photos, videos, audio, voice messages or documents — \
             as many as you like. Press “✅ Finish upload” when you're done.",
        )
        .reply_markup(keyboards::upload_menu())
        .await?;
        Ok(Flow::Stop)
    })
}

/// Collects one media message into the session. The copy into the storage
/// channel happens first; only a backed-up item is added.
pub fn upload_collect(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let Some(media) = extract_media(&event.message) else {
            bot.send_message(event.chat_id, "🤷 That's not a file I can store. Send a photo, video, audio or document.")
                .await?;
            return Ok(Flow::Stop);
        };

        let backup: MessageId =
            bot.copy_message(deps.storage_channel, event.chat_id, event.message.id).await?;

        let count = deps.sessions.add_item(
            event.user_id,
            UploadedItem {
                kind: media.kind,
                size: media.size,
                file_id: media.file_id,
                unique_id: media.unique_id,
                backup_message_id: backup.0,
            },
        )?;
        bot.send_message(event.chat_id, format!("✅ Added ({count} in this upload).")).await?;
        Ok(Flow::Stop)
    })
}

/// Finish button: persists the batch and reports the share code.
pub fn upload_finish(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let summary = deps.sessions.summary(event.user_id)?;
        if summary.total == 0 {
            bot.send_message(event.chat_id, "📭 Nothing to save yet — send some files first.").await?;
            return Ok(Flow::Stop);
        }

        let finalized = deps.sessions.finalize(event.user_id)?;
        let rows: Vec<NewFile<'_>> = finalized
            .entries
            .iter()
            .map(|entry| NewFile {
                code: &entry.code,
                kind: entry.item.kind.as_str(),
                size: entry.item.size,
                file_id: &entry.item.file_id,
                unique_id: &entry.item.unique_id,
                backup_message_id: entry.item.backup_message_id,
                owner_id: event.user_id,
                album_id: finalized.album_id.as_deref(),
                album_order: entry.album_order,
            })
            .collect();

        if let Err(e) = deps.repo.save_files(&rows) {
            // Abort: the session is gone either way, so a retry starts clean.
            deps.sessions.clear(event.user_id);
            deps.states.clear(event.user_id);
            return Err(e);
        }

        deps.sessions.clear(event.user_id);
        deps.states.clear(event.user_id);

        let kinds = summary
            .kinds
            .iter()
            .map(|(kind, n)| format!("{} × {}", n, kind.label()))
            .collect::<Vec<_>>()
            .join(", ");
        bot.send_message(
            event.chat_id,
            format!(
                "🎉 Saved! {kinds} — {:.2} MB total.\n\n\
                 Share code: {}\nShare link: {}",
                summary.total_mb,
                finalized.share_code,
                share_link(deps.bot_username(), &finalized.share_code)
            ),
        )
        .reply_markup(keyboards::main_menu(deps.is_admin(event.user_id).await))
        .await?;
        Ok(Flow::Stop)
    })
}

/// Cancel button: drops the session and the backup copies already made.
pub fn upload_cancel(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let backups = match deps.sessions.cancel(event.user_id) {
            Ok(ids) => ids,
            Err(AppError::NoActiveSession) => Vec::new(),
            Err(e) => return Err(e),
        };
        for message_id in backups {
            if let Err(e) = bot.delete_message(deps.storage_channel, MessageId(message_id)).await {
                log::debug!("Backup delete failed during cancel: {}", e);
            }
        }
        deps.states.clear(event.user_id);
        bot.send_message(event.chat_id, "❌ Upload cancelled.")
            .reply_markup(keyboards::main_menu(deps.is_admin(event.user_id).await))
            .await?;
        Ok(Flow::Stop)
    })
}
