//! Stored-file flows: retrieval, deletion, captions, passwords and
//! tracking info.
//!
//! Each flow is a prompt route (a menu button that enters a state) plus a
//! receive route (the stateful text handler). Receive handlers decline
//! menu presses with `Flow::Continue` so the global routes stay reachable
//! mid-flow.

use teloxide::prelude::*;
use teloxide::types::InputFile;

use crate::core::error::AppError;
use crate::core::session::MediaKind;
use crate::core::state::ConversationState;
use crate::core::utils::{format_file_size, is_plausible_code, share_link};
use crate::storage::db::FileRecord;
use crate::telegram::handlers::types::{Event, HandlerDeps};
use crate::telegram::keyboards::{self, is_menu_command};
use crate::telegram::media::deliver_batch;
use crate::telegram::router::{Flow, HandlerFuture};

/// Sends the stored batch to the requester with the delivery footer and
/// bumps the download counter.
pub async fn deliver_stored_file(
    bot: &Bot,
    event: &Event,
    deps: &HandlerDeps,
    record: &FileRecord,
) -> crate::core::error::AppResult<()> {
    let batch = deps.repo.resolve_batch(record)?;

    let mut caption = String::new();
    if let Some(text) = record.caption.as_deref() {
        caption.push_str(text);
        caption.push_str("\n\n");
    }
    caption.push_str(&format!(
        "⬇️ Downloads: {}\n⏳ Deleted in ~30 seconds — save it now!\n🤖 @{}",
        record.downloads + 1,
        deps.bot_username()
    ));

    deliver_batch(bot, event.chat_id, &batch, Some(&caption), &deps.cleanup).await?;
    deps.repo.increment_downloads(&record.code)?;
    Ok(())
}

/// Looks up a code typed by the current user and checks ownership.
/// Admins may manage anyone's files; everyone else only their own, and a
/// foreign code reads as not found rather than as a permission error.
async fn find_owned(deps: &HandlerDeps, user_id: i64, code: &str) -> Result<FileRecord, AppError> {
    if !is_plausible_code(code) {
        return Err(AppError::InvalidInput(format!("implausible code {code:?}")));
    }
    let record = deps.repo.find_file(code)?;
    if record.owner_id != user_id && !deps.is_admin(user_id).await {
        return Err(AppError::NotFound(code.to_string()));
    }
    Ok(record)
}

fn prompt(state: ConversationState, text: &'static str) -> impl Fn(Bot, Event, HandlerDeps) -> HandlerFuture {
    move |bot: Bot, event: Event, deps: HandlerDeps| {
        let fut: HandlerFuture = Box::pin(async move {
            deps.states.set(event.user_id, state);
            bot.send_message(event.chat_id, text).reply_markup(keyboards::back_menu()).await?;
            Ok(Flow::Stop)
        });
        fut
    }
}

// Prompt routes. Each enters its state and asks for a code.

pub fn delete_prompt(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    prompt(ConversationState::DeleteFile, "🗑 Send the code of the file to delete:")(bot, event, deps)
}

pub fn caption_set_prompt(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    prompt(ConversationState::CaptionAwaitCode, "📝 Send the code of the file to caption:")(bot, event, deps)
}

pub fn caption_unset_prompt(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    prompt(ConversationState::CaptionUnsetAwaitCode, "🚫 Send the code of the file to remove the caption from:")(
        bot, event, deps,
    )
}

pub fn password_set_prompt(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    prompt(ConversationState::PasswordAwaitCode, "🔒 Send the code of the file to protect:")(bot, event, deps)
}

pub fn password_unset_prompt(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    prompt(ConversationState::PasswordUnsetAwaitCode, "🔓 Send the code of the file to unprotect:")(
        bot, event, deps,
    )
}

pub fn tracking_prompt(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    prompt(ConversationState::TrackingAwaitCode, "📊 Send the code of the file to inspect:")(bot, event, deps)
}

/// Shared decline: menu presses and non-text fall through to the global
/// routes below the stateful one.
fn flow_text(event: &Event) -> Option<String> {
    match event.text() {
        Some(text) if !is_menu_command(text) => Some(text.to_string()),
        _ => None,
    }
}

// Receive routes.

pub fn delete_receive(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let Some(code) = flow_text(&event) else { return Ok(Flow::Continue) };
        let record = find_owned(&deps, event.user_id, &code).await?;
        let removed = deps.repo.delete_file(&record)?;

        // Drop the backup copies too; a missing copy is not an error.
        for gone in &removed {
            let backup = teloxide::types::MessageId(gone.backup_message_id);
            if let Err(e) = bot.delete_message(deps.storage_channel, backup).await {
                log::debug!("Backup delete for {} failed: {}", gone.code, e);
            }
        }

        deps.states.clear(event.user_id);
        bot.send_message(event.chat_id, format!("🗑 Deleted ({} file(s)).", removed.len()))
            .reply_markup(keyboards::main_menu(deps.is_admin(event.user_id).await))
            .await?;
        Ok(Flow::Stop)
    })
}

pub fn caption_code_receive(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let Some(code) = flow_text(&event) else { return Ok(Flow::Continue) };
        let record = find_owned(&deps, event.user_id, &code).await?;
        deps.states.set_with_context(event.user_id, ConversationState::CaptionAwaitText, record);
        bot.send_message(event.chat_id, "📝 Now send the caption text:")
            .reply_markup(keyboards::back_menu())
            .await?;
        Ok(Flow::Stop)
    })
}

pub fn caption_text_receive(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let Some(text) = flow_text(&event) else { return Ok(Flow::Continue) };
        let record = deps
            .states
            .context(event.user_id)
            .ok_or_else(|| AppError::InvalidInput("caption flow lost its file".to_string()))?;
        deps.repo.set_caption(&record.code, Some(&text))?;
        deps.states.clear(event.user_id);
        bot.send_message(event.chat_id, "📝 Caption saved.")
            .reply_markup(keyboards::main_menu(deps.is_admin(event.user_id).await))
            .await?;
        Ok(Flow::Stop)
    })
}

pub fn caption_unset_receive(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let Some(code) = flow_text(&event) else { return Ok(Flow::Continue) };
        let record = find_owned(&deps, event.user_id, &code).await?;
        deps.repo.set_caption(&record.code, None)?;
        deps.states.clear(event.user_id);
        bot.send_message(event.chat_id, "🚫 Caption removed.")
            .reply_markup(keyboards::main_menu(deps.is_admin(event.user_id).await))
            .await?;
        Ok(Flow::Stop)
    })
}

pub fn password_code_receive(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let Some(code) = flow_text(&event) else { return Ok(Flow::Continue) };
        let record = find_owned(&deps, event.user_id, &code).await?;
        deps.states.set_with_context(event.user_id, ConversationState::PasswordAwaitText, record);
        bot.send_message(event.chat_id, "🔒 Now send the password:")
            .reply_markup(keyboards::back_menu())
            .await?;
        Ok(Flow::Stop)
    })
}

pub fn password_text_receive(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let Some(password) = flow_text(&event) else { return Ok(Flow::Continue) };
        let record = deps
            .states
            .context(event.user_id)
            .ok_or_else(|| AppError::InvalidInput("password flow lost its file".to_string()))?;
        deps.repo.set_password(&record.code, Some(&password))?;
        deps.states.clear(event.user_id);
        bot.send_message(event.chat_id, "🔒 Password set. Recipients now need it to fetch the file.")
            .reply_markup(keyboards::main_menu(deps.is_admin(event.user_id).await))
            .await?;
        Ok(Flow::Stop)
    })
}

pub fn password_unset_receive(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let Some(code) = flow_text(&event) else { return Ok(Flow::Continue) };
        let record = find_owned(&deps, event.user_id, &code).await?;
        deps.repo.set_password(&record.code, None)?;
        deps.states.clear(event.user_id);
        bot.send_message(event.chat_id, "🔓 Password removed.")
            .reply_markup(keyboards::main_menu(deps.is_admin(event.user_id).await))
            .await?;
        Ok(Flow::Stop)
    })
}

/// Password entry during retrieval. Wrong guesses keep the state so the
/// user can try again or press back.
pub fn get_password_receive(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let Some(attempt) = flow_text(&event) else { return Ok(Flow::Continue) };
        let record = deps
            .states
            .context(event.user_id)
            .ok_or_else(|| AppError::InvalidInput("retrieval flow lost its file".to_string()))?;
        if record.password.as_deref() != Some(attempt.as_str()) {
            bot.send_message(event.chat_id, "❌ Wrong password, try again:").await?;
            return Ok(Flow::Stop);
        }
        deliver_stored_file(&bot, &event, &deps, &record).await?;
        deps.states.clear(event.user_id);
        Ok(Flow::Stop)
    })
}

pub fn tracking_receive(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let Some(code) = flow_text(&event) else { return Ok(Flow::Continue) };
        let record = find_owned(&deps, event.user_id, &code).await?;
        let batch = deps.repo.resolve_batch(&record)?;

        let what = if batch.len() > 1 {
            format!("Album of {} items", batch.len())
        } else {
            MediaKind::from_str(&record.kind).map(|k| k.label()).unwrap_or("File").to_string()
        };
        let total: i64 = batch.iter().map(|f| f.size).sum();
        bot.send_message(
            event.chat_id,
            format!(
                "📊 {what}\n💾 {}\n📅 {}\n📝 Caption: {}\n🔒 Password: {}\n⬇️ {} downloads\n🔗 {}",
                format_file_size(total),
                record.created_at,
                if record.caption.is_some() { "yes" } else { "no" },
                if record.password.is_some() { "yes" } else { "no" },
                record.downloads,
                share_link(deps.bot_username(), &record.code)
            ),
        )
        .await?;
        deps.states.clear(event.user_id);
        Ok(Flow::Stop)
    })
}

/// Admin backup button helper, kept here with the other file plumbing.
pub async fn send_database_backup(
    bot: &Bot,
    chat_id: ChatId,
    deps: &HandlerDeps,
) -> crate::core::error::AppResult<()> {
    let path = crate::storage::backup::create_backup(deps.repo.pool())?;
    bot.send_document(chat_id, InputFile::file(path.clone())).await?;
    if let Err(e) = std::fs::remove_file(&path) {
        log::warn!("Could not remove backup file {}: {}", path.display(), e);
    }
    Ok(())
}
