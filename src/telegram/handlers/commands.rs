//! Global commands and menu buttons: /start, deep-link retrieval, back,
//! account, creator and the file listing.

use lazy_regex::regex_captures;
use teloxide::prelude::*;

use crate::core::config;
use crate::core::state::ConversationState;
use crate::core::utils::share_link;
use crate::telegram::handlers::files::deliver_stored_file;
use crate::telegram::handlers::types::{ensure_access, Event, HandlerDeps};
use crate::telegram::keyboards::{self, labels};
use crate::telegram::router::{Flow, HandlerFuture};

/// `/start get_<code>` — deep-link retrieval.
pub fn start_with_code(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let code = event
            .text()
            .and_then(|t| regex_captures!(r"^/start\s+get_([A-Za-z0-9_]{1,32})\s*$", t))
            .map(|(_, code)| code.to_string());
        let Some(code) = code else {
            bot.send_message(event.chat_id, "That link looks broken. Ask the sender for a fresh one.")
                .await?;
            return Ok(Flow::Stop);
        };

        if !ensure_access(&bot, &event, &deps, Some(&code)).await? {
            return Ok(Flow::Stop);
        }

        let record = match deps.repo.find_file(&code) {
            Ok(record) => record,
            Err(_) => {
                bot.send_message(event.chat_id, "Nothing found for that code.").await?;
                return Ok(Flow::Stop);
            }
        };

        if record.password.is_some() {
            deps.states.set_with_context(
                event.user_id,
                ConversationState::GetFileAwaitPassword,
                record,
            );
            bot.send_message(event.chat_id, "🔒 This file is protected. Send the password:")
                .reply_markup(keyboards::back_menu())
                .await?;
            return Ok(Flow::Stop);
        }

        deliver_stored_file(&bot, &event, &deps, &record).await?;
        Ok(Flow::Stop)
    })
}

/// Plain `/start` — greeting and main menu.
pub fn start(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        if !ensure_access(&bot, &event, &deps, None).await? {
            return Ok(Flow::Stop);
        }
        deps.states.clear(event.user_id);
        deps.sessions.clear(event.user_id);
        let name = event.first_name.clone().unwrap_or_else(|| "there".to_string());
        bot.send_message(
            event.chat_id,
            format!(
                "👋 Hi {name}!\n\n\
                 Send me files and I'll keep them safe in my storage. \
                 You get a share code for every upload — anyone with the \
                 code (and the password, if you set one) can fetch the files.\n\n\
                 Pick an action below:"
            ),
        )
        .reply_markup(keyboards::main_menu(deps.is_admin(event.user_id).await))
        .await?;
        Ok(Flow::Stop)
    })
}

/// Back button. Where it leads depends on the flow it interrupts.
pub fn back(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        use ConversationState as S;
        match deps.states.state(event.user_id) {
            // Channel management steps fall back to the join panel.
            Some(S::JoinAddChannel | S::JoinRemoveChannel) => {
                deps.states.set(event.user_id, S::JoinPanel);
                bot.send_message(event.chat_id, "📢 Required channels:")
                    .reply_markup(keyboards::join_admin_menu())
                    .await?;
            }
            // Admin sub-flows fall back to the admin panel.
            Some(
                S::JoinPanel
                | S::AdminSetAdmin
                | S::AdminUnsetAdmin
                | S::AdminForwardBroadcast
                | S::AdminTextBroadcast,
            ) => {
                deps.states.set(event.user_id, S::AdminPanel);
                bot.send_message(event.chat_id, "🛠 Admin panel:")
                    .reply_markup(keyboards::admin_menu())
                    .await?;
            }
            // Everything else resets to the main menu.
            _ => {
                deps.states.clear(event.user_id);
                deps.sessions.clear(event.user_id);
                bot.send_message(event.chat_id, "🏠 Main menu:")
                    .reply_markup(keyboards::main_menu(deps.is_admin(event.user_id).await))
                    .await?;
            }
        }
        Ok(Flow::Stop)
    })
}

/// Account summary button.
pub fn account(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let files = deps.repo.count_user_files(event.user_id)?;
        let name = event.first_name.clone().unwrap_or_else(|| "—".to_string());
        bot.send_message(
            event.chat_id,
            format!(
                "👤 {name}\n🆔 {}\n📦 Stored files: {files}\n\n\
                 Share the bot: https://t.me/{}",
                event.user_id,
                deps.bot_username()
            ),
        )
        .await?;
        Ok(Flow::Stop)
    })
}

/// Creator button.
pub fn creator(bot: Bot, event: Event, _deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        bot.send_message(event.chat_id, format!("👨‍💻 Made by {}", *config::CREATOR_HANDLE)).await?;
        Ok(Flow::Stop)
    })
}

/// "My files" — the owner's shareable files, five per message.
pub fn my_files(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        let files = deps.repo.user_files(event.user_id)?;
        if files.is_empty() {
            bot.send_message(event.chat_id, format!("📭 You have no stored files yet. Press “{}” to add some.", labels::UPLOAD))
                .await?;
            return Ok(Flow::Stop);
        }

        for chunk in files.chunks(5) {
            let blocks: Vec<String> = chunk
                .iter()
                .map(|f| {
                    let kind = crate::core::session::MediaKind::from_str(&f.kind)
                        .map(|k| k.label())
                        .unwrap_or("File");
                    let what = if f.album_id.is_some() { "Album" } else { kind };
                    format!(
                        "📄 {what} — {}\n📅 {}\n⬇️ {} downloads\n🔗 {}",
                        crate::core::utils::format_file_size(f.size),
                        f.created_at,
                        f.downloads,
                        share_link(deps.bot_username(), &f.code)
                    )
                })
                .collect();
            bot.send_message(event.chat_id, blocks.join("\n\n")).await?;
        }
        Ok(Flow::Stop)
    })
}

/// Fallback for idle users: anything unrouted lands here.
pub fn idle(bot: Bot, event: Event, deps: HandlerDeps) -> HandlerFuture {
    Box::pin(async move {
        deps.repo.ensure_user(event.user_id, event.username.as_deref()).await?;
        bot.send_message(event.chat_id, "🤔 I didn't get that. Use the menu below:")
            .reply_markup(keyboards::main_menu(deps.is_admin(event.user_id).await))
            .await?;
        Ok(Flow::Stop)
    })
}
