//! Bot construction and Telegram-side lookups.

use async_trait::async_trait;
use teloxide::prelude::*;

use crate::storage::repository::ChannelTitleResolver;
use crate::telegram::membership::parse_recipient;

/// Creates the Bot from the `TELOXIDE_TOKEN` environment variable.
pub fn create_bot() -> Bot {
    Bot::from_env()
}

#[async_trait]
impl ChannelTitleResolver for Bot {
    async fn resolve_title(&self, channel_id: &str) -> Option<String> {
        let recipient = parse_recipient(channel_id)?;
        match self.get_chat(recipient).await {
            Ok(chat) => chat.title().map(str::to_string),
            Err(e) => {
                log::debug!("Title lookup for {} failed: {}", channel_id, e);
                None
            }
        }
    }
}
