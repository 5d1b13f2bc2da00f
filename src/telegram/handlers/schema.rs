//! The routing table and the teloxide bridge.
//!
//! Order matters: global commands and menu buttons sit above the
//! stateful receive routes, panel buttons are scoped to their panel
//! state, and the idle fallback closes the table.

use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use crate::core::state::ConversationState as S;
use crate::telegram::guard::Guard::{Admin, Pattern, Prefix, Private, State};
use crate::telegram::handlers::types::{Event, HandlerDeps};
use crate::telegram::handlers::{admin, commands, files, upload};
use crate::telegram::keyboards::labels;
use crate::telegram::router::{Route, Router};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

macro_rules! route {
    ($name:literal, [$($guard:expr),* $(,)?], $handler:expr) => {
        Route { name: $name, guards: &[$($guard),*], handler: $handler }
    };
}

/// The full ordered routing table.
pub fn routes() -> Vec<Route> {
    let mut table = vec![
        // Deep links and global commands come first: they win over any flow.
        route!("start_get", [Private, Prefix("/start get_")], commands::start_with_code),
        route!("start", [Private, Pattern("/start")], commands::start),
        route!("back", [Private, Pattern(labels::BACK)], commands::back),
        // Main menu buttons.
        route!("upload_start", [Private, Pattern(labels::UPLOAD)], upload::upload_start),
        route!("my_files", [Private, Pattern(labels::MY_FILES)], commands::my_files),
        route!("delete_prompt", [Private, Pattern(labels::DELETE)], files::delete_prompt),
        route!("caption_set_prompt", [Private, Pattern(labels::SET_CAPTION)], files::caption_set_prompt),
        route!("caption_unset_prompt", [Private, Pattern(labels::UNSET_CAPTION)], files::caption_unset_prompt),
        route!("password_set_prompt", [Private, Pattern(labels::SET_PASSWORD)], files::password_set_prompt),
        route!("password_unset_prompt", [Private, Pattern(labels::UNSET_PASSWORD)], files::password_unset_prompt),
        route!("tracking_prompt", [Private, Pattern(labels::FILE_INFO)], files::tracking_prompt),
        route!("account", [Private, Pattern(labels::ACCOUNT)], commands::account),
        route!("creator", [Private, Pattern(labels::CREATOR)], commands::creator),
        // Admin entry and panel buttons, scoped to their panel state.
        route!("admin_panel", [Private, Admin, Pattern(labels::ADMIN_PANEL)], admin::admin_panel),
    ];

    table.extend([
        route!("admin_stats", [Private, Admin, State(Some(S::AdminPanel)), Pattern(labels::STATS)], admin::stats),
        route!("admin_list", [Private, Admin, State(Some(S::AdminPanel)), Pattern(labels::ADMIN_LIST)], admin::admin_list),
        route!("set_admin_prompt", [Private, Admin, State(Some(S::AdminPanel)), Pattern(labels::SET_ADMIN)], admin::set_admin_prompt),
        route!("unset_admin_prompt", [Private, Admin, State(Some(S::AdminPanel)), Pattern(labels::UNSET_ADMIN)], admin::unset_admin_prompt),
        route!("broadcast_forward_prompt", [Private, Admin, State(Some(S::AdminPanel)), Pattern(labels::BROADCAST_FORWARD)], admin::broadcast_forward_prompt),
        route!("broadcast_copy_prompt", [Private, Admin, State(Some(S::AdminPanel)), Pattern(labels::BROADCAST_COPY)], admin::broadcast_copy_prompt),
        route!("join_panel", [Private, Admin, State(Some(S::AdminPanel)), Pattern(labels::JOIN_PANEL)], admin::join_panel),
        route!("backup", [Private, Admin, State(Some(S::AdminPanel)), Pattern(labels::BACKUP)], admin::backup),
        // Join-panel buttons.
        route!("channel_list", [Private, Admin, State(Some(S::JoinPanel)), Pattern(labels::CHANNEL_LIST)], admin::channel_list),
        route!("add_channel_prompt", [Private, Admin, State(Some(S::JoinPanel)), Pattern(labels::ADD_CHANNEL)], admin::add_channel_prompt),
        route!("remove_channel_prompt", [Private, Admin, State(Some(S::JoinPanel)), Pattern(labels::REMOVE_CHANNEL)], admin::remove_channel_prompt),
        // Upload session buttons.
        route!("upload_finish", [Private, Pattern(labels::FINISH_UPLOAD), State(Some(S::UploadCollect))], upload::upload_finish),
        route!("upload_cancel", [Private, Pattern(labels::CANCEL_UPLOAD), State(Some(S::UploadCollect))], upload::upload_cancel),
        // Stateful receive routes. Each declines menu presses.
        route!("delete_receive", [Private, State(Some(S::DeleteFile))], files::delete_receive),
        route!("caption_code_receive", [Private, State(Some(S::CaptionAwaitCode))], files::caption_code_receive),
        route!("caption_text_receive", [Private, State(Some(S::CaptionAwaitText))], files::caption_text_receive),
        route!("caption_unset_receive", [Private, State(Some(S::CaptionUnsetAwaitCode))], files::caption_unset_receive),
        route!("password_code_receive", [Private, State(Some(S::PasswordAwaitCode))], files::password_code_receive),
        route!("password_text_receive", [Private, State(Some(S::PasswordAwaitText))], files::password_text_receive),
        route!("password_unset_receive", [Private, State(Some(S::PasswordUnsetAwaitCode))], files::password_unset_receive),
        route!("get_password_receive", [Private, State(Some(S::GetFileAwaitPassword))], files::get_password_receive),
        route!("tracking_receive", [Private, State(Some(S::TrackingAwaitCode))], files::tracking_receive),
        route!("set_admin_receive", [Private, Admin, State(Some(S::AdminSetAdmin))], admin::set_admin_receive),
        route!("unset_admin_receive", [Private, Admin, State(Some(S::AdminUnsetAdmin))], admin::unset_admin_receive),
        route!("broadcast_forward_receive", [Private, Admin, State(Some(S::AdminForwardBroadcast))], admin::broadcast_forward_receive),
        route!("broadcast_copy_receive", [Private, Admin, State(Some(S::AdminTextBroadcast))], admin::broadcast_copy_receive),
        route!("add_channel_receive", [Private, Admin, State(Some(S::JoinAddChannel))], admin::add_channel_receive),
        route!("remove_channel_receive", [Private, Admin, State(Some(S::JoinRemoveChannel))], admin::remove_channel_receive),
        // Media collection while an upload session is open.
        route!("upload_collect", [Private, State(Some(S::UploadCollect))], upload::upload_collect),
        // Idle fallback.
        route!("idle", [Private, State(None)], commands::idle),
    ]);
    table
}

pub fn build_router() -> Router {
    Router::new(routes())
}

/// Message-update schema plugged into the teloxide dispatcher.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let router = Arc::new(build_router());
    Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let deps = deps.clone();
        let router = Arc::clone(&router);
        async move {
            let event = Event::from_message(msg);
            router.dispatch(bot, event, deps).await;
            Ok::<(), HandlerError>(())
        }
    })
}
