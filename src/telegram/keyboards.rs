//! Reply keyboards and the button vocabulary.
//!
//! Every multi-step flow declines these labels: a user who presses a menu
//! button mid-flow is routed by the global routes, never swallowed as
//! flow input.

use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};

use crate::core::utils::share_link;
use crate::storage::repository::ChannelMap;

/// Button labels, grouped by panel.
pub mod labels {
    // main menu
    pub const UPLOAD: &str = "📤 Upload file";
    pub const MY_FILES: &str = "📁 My files";
    pub const DELETE: &str = "🗑 Delete file";
    pub const SET_CAPTION: &str = "📝 Set caption";
    pub const UNSET_CAPTION: &str = "🚫 Remove caption";
    pub const SET_PASSWORD: &str = "🔒 Set password";
    pub const UNSET_PASSWORD: &str = "🔓 Remove password";
    pub const FILE_INFO: &str = "📊 File info";
    pub const ACCOUNT: &str = "👤 My account";
    pub const CREATOR: &str = "👨‍💻 Creator";
    pub const ADMIN_PANEL: &str = "🛠 Admin panel";
    pub const BACK: &str = "🔙 Back";

    // upload session
    pub const FINISH_UPLOAD: &str = "✅ Finish upload";
    pub const CANCEL_UPLOAD: &str = "❌ Cancel upload";

    // admin panel
    pub const STATS: &str = "📈 Stats";
    pub const ADMIN_LIST: &str = "👥 Admins";
    pub const SET_ADMIN: &str = "➕ Add admin";
    pub const UNSET_ADMIN: &str = "➖ Remove admin";
    pub const BROADCAST_FORWARD: &str = "📣 Forward to all";
    pub const BROADCAST_COPY: &str = "✉️ Message to all";
    pub const JOIN_PANEL: &str = "📢 Required channels";
    pub const BACKUP: &str = "💾 Backup";

    // join panel
    pub const CHANNEL_LIST: &str = "📋 Channel list";
    pub const ADD_CHANNEL: &str = "➕ Add channel";
    pub const REMOVE_CHANNEL: &str = "➖ Remove channel";

    // membership gate
    pub const I_HAVE_JOINED: &str = "✅ I have joined";
}

/// Labels that always belong to the menus. Stateful free-text handlers
/// decline these so the global routes keep working mid-flow.
const MENU_LABELS: &[&str] = &[
    labels::UPLOAD,
    labels::MY_FILES,
    labels::DELETE,
    labels::SET_CAPTION,
    labels::UNSET_CAPTION,
    labels::SET_PASSWORD,
    labels::UNSET_PASSWORD,
    labels::FILE_INFO,
    labels::ACCOUNT,
    labels::CREATOR,
    labels::ADMIN_PANEL,
    labels::BACK,
    labels::FINISH_UPLOAD,
    labels::CANCEL_UPLOAD,
    labels::STATS,
    labels::ADMIN_LIST,
    labels::SET_ADMIN,
    labels::UNSET_ADMIN,
    labels::BROADCAST_FORWARD,
    labels::BROADCAST_COPY,
    labels::JOIN_PANEL,
    labels::BACKUP,
    labels::CHANNEL_LIST,
    labels::ADD_CHANNEL,
    labels::REMOVE_CHANNEL,
];

/// True when the text is a menu button or a slash command.
pub fn is_menu_command(text: &str) -> bool {
    text.starts_with('/') || MENU_LABELS.contains(&text)
}

fn rows(labels: &[&[&str]]) -> KeyboardMarkup {
    KeyboardMarkup::new(
        labels.iter().map(|row| row.iter().map(|l| KeyboardButton::new(l.to_string())).collect::<Vec<_>>()),
    )
    .resize_keyboard()
}

/// Main menu. Admins get the extra panel row.
pub fn main_menu(is_admin: bool) -> KeyboardMarkup {
    let mut layout: Vec<&[&str]> = vec![
        &[labels::UPLOAD, labels::MY_FILES],
        &[labels::SET_CAPTION, labels::UNSET_CAPTION],
        &[labels::SET_PASSWORD, labels::UNSET_PASSWORD],
        &[labels::FILE_INFO, labels::DELETE],
        &[labels::ACCOUNT, labels::CREATOR],
    ];
    if is_admin {
        layout.push(&[labels::ADMIN_PANEL]);
    }
    rows(&layout)
}

/// Shown while an upload session is open.
pub fn upload_menu() -> KeyboardMarkup {
    rows(&[&[labels::FINISH_UPLOAD, labels::CANCEL_UPLOAD], &[labels::BACK]])
}

/// A lone back button, shown inside single-prompt flows.
pub fn back_menu() -> KeyboardMarkup {
    rows(&[&[labels::BACK]])
}

pub fn admin_menu() -> KeyboardMarkup {
    rows(&[
        &[labels::STATS, labels::ADMIN_LIST],
        &[labels::SET_ADMIN, labels::UNSET_ADMIN],
        &[labels::BROADCAST_FORWARD, labels::BROADCAST_COPY],
        &[labels::JOIN_PANEL, labels::BACKUP],
        &[labels::BACK],
    ])
}

pub fn join_admin_menu() -> KeyboardMarkup {
    rows(&[&[labels::CHANNEL_LIST], &[labels::ADD_CHANNEL, labels::REMOVE_CHANNEL], &[labels::BACK]])
}

/// Inline keyboard for the membership gate: one button per unmet channel
/// plus a retry button that re-runs the pending retrieval.
pub fn membership_gate(
    unmet: &ChannelMap,
    bot_username: &str,
    pending_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    for info in unmet.values() {
        if let Ok(link) = url::Url::parse(&info.link) {
            rows.push(vec![InlineKeyboardButton::url(info.title.clone(), link)]);
        }
    }
    if let Some(code) = pending_code {
        if let Ok(retry) = url::Url::parse(&share_link(bot_username, code)) {
            rows.push(vec![InlineKeyboardButton::url(labels::I_HAVE_JOINED.to_string(), retry)]);
        }
    }
    InlineKeyboardMarkup::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_labels_are_commands() {
        assert!(is_menu_command(labels::UPLOAD));
        assert!(is_menu_command(labels::BACK));
        assert!(is_menu_command("/start"));
        assert!(!is_menu_command("my vacation photos"));
        assert!(!is_menu_command("Abc123xyz456789"));
    }

    #[test]
    fn gate_keyboard_lists_unmet_channels_and_retry() {
        let mut unmet = ChannelMap::new();
        unmet.insert(
            "@news".to_string(),
            crate::storage::repository::ChannelInfo {
                title: "News".to_string(),
                link: "https://t.me/news".to_string(),
            },
        );
        let kb = membership_gate(&unmet, "sharebot", Some("abc"));
        assert_eq!(kb.inline_keyboard.len(), 2);
        assert_eq!(kb.inline_keyboard[0][0].text, "News");
        assert_eq!(kb.inline_keyboard[1][0].text, labels::I_HAVE_JOINED);
    }
}
