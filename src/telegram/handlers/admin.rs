//! Admin panel: stats, admin management, broadcasts, forced-join
//! channels and database backup.

use teloxide::prelude::*;

use crate::core::error::AppError;
use crate::core::state::ConversationState;
use crate::telegram::broadcast;
use crate::telegram::handlers::files::send_database_backup;
use crate::telegram::handlers::types::{Event, HandlerDeps};
use crate::telegram::keyboards::{self, is_menu_command};
use crate::telegram::router::{Flow, HandlerFuture};

/// Opens the admin panel.
pub fn admin_panel(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        deps.states.set(event.user_id, ConversationState::AdminPanel);
        bot.send_message(event.chat_id, "🛠 Admin panel:")
            .reply_markup(keyboards::admin_menu())
            .await?;
        Ok(Flow::Stop)
    })
}

pub fn stats(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let users = deps.repo.count_users()?;
        let files = deps.repo.count_files()?;
        bot.send_message(event.chat_id, format!("📈 Users: {users}\n📦 Stored files: {files}")).await?;
        Ok(Flow::Stop)
    })
}

pub fn admin_list(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let ids = deps.repo.admin_ids().await?;
        let body = if ids.is_empty() {
            "👥 No appointed admins.".to_string()
        } else {
            let lines: Vec<String> = ids.iter().map(|id| format!("• {id}")).collect();
            format!("👥 Admins:\n{}", lines.join("\n"))
        };
        bot.send_message(event.chat_id, body).await?;
        Ok(Flow::Stop)
    })
}

fn enter(
    state: ConversationState,
    text: &'static str,
) -> impl Fn(Bot, Event, HandlerDeps) -> HandlerFuture {
    move |bot: Bot, event: Event, deps: HandlerDeps| {
        let fut: HandlerFuture = Box::pin(async move {
            deps.states.set(event.user_id, state);
            bot.send_message(event.chat_id, text).reply_markup(keyboards::back_menu()).await?;
            Ok(Flow::Stop)
        });
        fut
    }
}

pub fn set_admin_prompt(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    enter(ConversationState::AdminSetAdmin, "➕ Send the numeric user id to promote:")(bot, event, deps)
}

pub fn unset_admin_prompt(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    enter(ConversationState::AdminUnsetAdmin, "➖ Send the numeric user id to demote:")(bot, event, deps)
}

pub fn broadcast_forward_prompt(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    enter(
        ConversationState::AdminForwardBroadcast,
        "📣 Send the message to forward to every user (forward header stays visible):",
    )(bot, event, deps)
}

pub fn broadcast_copy_prompt(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    enter(ConversationState::AdminTextBroadcast, "✉️ Send the text to deliver to every user:")(
        bot, event, deps,
    )
}

pub fn join_panel(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        deps.states.set(event.user_id, ConversationState::JoinPanel);
        bot.send_message(event.chat_id, "📢 Required channels:")
            .reply_markup(keyboards::join_admin_menu())
            .await?;
        Ok(Flow::Stop)
    })
}

pub fn backup(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        bot.send_message(event.chat_id, "💾 Preparing backup…").await?;
        send_database_backup(&bot, event.chat_id, &deps).await?;
        Ok(Flow::Stop)
    })
}

fn parse_user_id(text: &str) -> Result<i64, AppError> {
    text.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::InvalidInput(format!("not a user id: {text:?}")))
}

pub fn set_admin_receive(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let Some(text) = event.text().filter(|t| !is_menu_command(t)) else {
            return Ok(Flow::Continue);
        };
        let user_id = parse_user_id(text)?;
        let changed = deps.repo.set_admin(user_id, true).await?;
        deps.states.set(event.user_id, ConversationState::AdminPanel);
        let body = if changed {
            format!("✅ {user_id} is now an admin.")
        } else {
            format!("ℹ️ {user_id} already was an admin.")
        };
        bot.send_message(event.chat_id, body).reply_markup(keyboards::admin_menu()).await?;
        Ok(Flow::Stop)
    })
}

pub fn unset_admin_receive(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let Some(text) = event.text().filter(|t| !is_menu_command(t)) else {
            return Ok(Flow::Continue);
        };
        let user_id = parse_user_id(text)?;
        let changed = deps.repo.set_admin(user_id, false).await?;
        deps.states.set(event.user_id, ConversationState::AdminPanel);
        let body = if changed {
            format!("✅ {user_id} is no longer an admin.")
        } else {
            format!("ℹ️ {user_id} was not an admin.")
        };
        bot.send_message(event.chat_id, body).reply_markup(keyboards::admin_menu()).await?;
        Ok(Flow::Stop)
    })
}

/// Forward broadcast: any message works, so only menu presses decline.
pub fn broadcast_forward_receive(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        if event.text().is_some_and(is_menu_command) {
            return Ok(Flow::Continue);
        }
        let users = deps.repo.user_ids().await?;
        bot.send_message(event.chat_id, format!("📣 Broadcasting to {} users…", users.len())).await?;
        let report =
            broadcast::forward_to_all(&bot, &users, event.chat_id, event.message.id).await;
        deps.states.set(event.user_id, ConversationState::AdminPanel);
        bot.send_message(
            event.chat_id,
            format!("📣 Done. Delivered: {}, failed: {}.", report.succeeded, report.failed),
        )
        .reply_markup(keyboards::admin_menu())
        .await?;
        Ok(Flow::Stop)
    })
}

pub fn broadcast_copy_receive(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let Some(text) = event.text().filter(|t| !is_menu_command(t)) else {
            return Ok(Flow::Continue);
        };
        let users = deps.repo.user_ids().await?;
        bot.send_message(event.chat_id, format!("✉️ Broadcasting to {} users…", users.len())).await?;
        let report = broadcast::text_to_all(&bot, &users, text).await;
        deps.states.set(event.user_id, ConversationState::AdminPanel);
        bot.send_message(
            event.chat_id,
            format!("✉️ Done. Delivered: {}, failed: {}.", report.succeeded, report.failed),
        )
        .reply_markup(keyboards::admin_menu())
        .await?;
        Ok(Flow::Stop)
    })
}

pub fn channel_list(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let channels = deps.repo.channels(&bot).await?;
        let body = if channels.is_empty() {
            "📋 No required channels configured.".to_string()
        } else {
            let lines: Vec<String> = channels
                .iter()
                .map(|(id, info)| format!("• {} ({})\n  {}", info.title, id, info.link))
                .collect();
            format!("📋 Required channels:\n{}", lines.join("\n"))
        };
        bot.send_message(event.chat_id, body).await?;
        Ok(Flow::Stop)
    })
}

pub fn add_channel_prompt(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    enter(
        ConversationState::JoinAddChannel,
        "➕ Send the channel as `@username`, or as `<invite link> <-100…id>` for private channels:",
    )(bot, event, deps)
}

pub fn remove_channel_prompt(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    enter(ConversationState::JoinRemoveChannel, "➖ Send the channel id to remove:")(bot, event, deps)
}

/// `@username` (link derived) or `<link> <id>` pair.
fn parse_channel_payload(text: &str) -> Result<(String, String), AppError> {
    let text = text.trim();
    if let Some(username) = text.strip_prefix('@') {
        if username.is_empty() || username.contains(char::is_whitespace) {
            return Err(AppError::InvalidInput(format!("bad channel username {text:?}")));
        }
        return Ok((text.to_string(), format!("https://t.me/{username}")));
    }
    let mut parts = text.split_whitespace();
    let (Some(link), Some(id), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AppError::InvalidInput(format!("bad channel payload {text:?}")));
    };
    url::Url::parse(link)?;
    if id.parse::<i64>().is_err() {
        return Err(AppError::InvalidInput(format!("bad channel id {id:?}")));
    }
    Ok((id.to_string(), link.to_string()))
}

pub fn add_channel_receive(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let Some(text) = event.text().filter(|t| !is_menu_command(t)) else {
            return Ok(Flow::Continue);
        };
        let (channel_id, link) = parse_channel_payload(text)?;
        let added = deps.repo.add_channel(&channel_id, &link).await?;
        deps.states.set(event.user_id, ConversationState::JoinPanel);
        let body = if added {
            format!("✅ Channel {channel_id} added.")
        } else {
            format!("ℹ️ Channel {channel_id} is already registered.")
        };
        bot.send_message(event.chat_id, body).reply_markup(keyboards::join_admin_menu()).await?;
        Ok(Flow::Stop)
    })
}

pub fn remove_channel_receive(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let Some(text) = event.text().filter(|t| !is_menu_command(t)) else {
            return Ok(Flow::Continue);
        };
        let removed = deps.repo.remove_channel(text.trim()).await?;
        deps.states.set(event.user_id, ConversationState::JoinPanel);
        let body = if removed {
            format!("✅ Channel {} removed.", text.trim())
        } else {
            format!("ℹ️ No channel {} is registered.", text.trim())
        };
        bot.send_message(event.chat_id, body).reply_markup(keyboards::join_admin_menu()).await?;
        Ok(Flow::Stop)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_payload_accepts_username_form() {
        let (id, link) = parse_channel_payload("@news").unwrap();
        assert_eq!(id, "@news");
        assert_eq!(link, "https://t.me/news");
    }

    #[test]
    fn channel_payload_accepts_link_id_pair() {
        let (id, link) = parse_channel_payload("https://t.me/+abc123 -1001234567890").unwrap();
        assert_eq!(id, "-1001234567890");
        assert_eq!(link, "https://t.me/+abc123");
    }

    #[test]
    fn channel_payload_rejects_garbage() {
        assert!(parse_channel_payload("@").is_err());
        assert!(parse_channel_payload("just words").is_err());
        assert!(parse_channel_payload("not-a-url -100123").is_err());
        assert!(parse_channel_payload("https://t.me/x notanid").is_err());
    }

    #[test]
    fn user_ids_must_be_positive_integers() {
        assert_eq!(parse_user_id("  42 ").unwrap(), 42);
        assert!(parse_user_id("-5").is_err());
        assert!(parse_user_id("bob").is_err());
    }
}
