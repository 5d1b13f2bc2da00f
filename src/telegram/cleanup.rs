//! Janitor for ephemeral delivered messages.
//!
//! Files delivered to a recipient are only meant to stay on screen for a
//! short while (the delivery footer announces this). Every delivered
//! message is registered here; a background task sweeps the queue on a
//! fixed interval and deletes everything that has sat through a full
//! cooldown. Deletion failures are dropped — the message may already be
//! gone or the bot may have lost the chat.

use std::sync::Mutex;
use std::time::Instant;

use futures_util::future::join_all;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tokio::task::JoinHandle;

use crate::core::config;

#[derive(Debug, Clone, Copy)]
struct PendingDelete {
    chat_id: ChatId,
    message_id: MessageId,
    registered_at: Instant,
}

/// Messages awaiting deletion.
#[derive(Debug, Default)]
pub struct CleanupQueue {
    pending: Mutex<Vec<PendingDelete>>,
}

impl CleanupQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a message for deletion after the cooldown.
    pub fn register(&self, chat_id: ChatId, message_id: MessageId) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.push(PendingDelete { chat_id, message_id, registered_at: Instant::now() });
        }
    }

    /// Removes and returns the entries whose cooldown has elapsed.
    fn take_expired(&self) -> Vec<PendingDelete> {
        let Ok(mut pending) = self.pending.lock() else { return Vec::new() };
        let cooldown = config::cleanup::interval();
        let (expired, keep) =
            pending.drain(..).partition(|p| p.registered_at.elapsed() >= cooldown);
        *pending = keep;
        expired
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

/// Spawns the periodic sweep. Aborted on shutdown.
pub fn spawn_janitor(bot: Bot, queue: std::sync::Arc<CleanupQueue>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config::cleanup::interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let expired = queue.take_expired();
            if expired.is_empty() {
                continue;
            }
            log::debug!("🧹 Deleting {} expired delivery messages", expired.len());
            let deletions = expired.into_iter().map(|p| {
                let bot = bot.clone();
                async move {
                    if let Err(e) = bot.delete_message(p.chat_id, p.message_id).await {
                        log::debug!("Delete {}:{} failed: {}", p.chat_id, p.message_id.0, e);
                    }
                }
            });
            join_all(deletions).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entries_survive_a_sweep() {
        let queue = CleanupQueue::new();
        queue.register(ChatId(1), MessageId(10));
        assert!(queue.take_expired().is_empty());
        assert_eq!(queue.len(), 1);
    }
}
