//! Broadcast fan-out.
//!
//! Sends to every recipient with bounded concurrency and a short pause
//! after each successful send to stay under the Bot API flood limits. A
//! failing recipient (blocked bot, deleted account) only bumps the
//! failure tally; there are no retries within one broadcast.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tokio::sync::Semaphore;

use crate::core::config;
use crate::core::error::AppResult;

/// Tally of one broadcast run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Runs `send` once per recipient, at most
/// [`config::broadcast::MAX_CONCURRENT`] in flight.
pub async fn run<F, Fut>(user_ids: &[i64], send: F) -> BroadcastReport
where
    F: Fn(i64) -> Fut + Send + Sync,
    Fut: Future<Output = AppResult<()>> + Send,
{
    let semaphore = Arc::new(Semaphore::new(config::broadcast::MAX_CONCURRENT));
    let succeeded = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let sends = user_ids.iter().map(|&user_id| {
        let semaphore = Arc::clone(&semaphore);
        let send = &send;
        let succeeded = &succeeded;
        let failed = &failed;
        async move {
            // Closed only on drop, which cannot happen while we hold it.
            let Ok(_permit) = semaphore.acquire().await else { return };
            match send(user_id).await {
                Ok(()) => {
                    succeeded.fetch_add(1, Ordering::Relaxed);
                    // The flood limit only charges delivered messages.
                    tokio::time::sleep(config::broadcast::send_delay()).await;
                }
                Err(e) => {
                    log::debug!("Broadcast to {} failed: {}", user_id, e);
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    });
    join_all(sends).await;

    BroadcastReport {
        succeeded: succeeded.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
    }
}

/// Forwards one message (with its forward header) to every user.
pub async fn forward_to_all(
    bot: &Bot,
    user_ids: &[i64],
    from_chat: ChatId,
    message_id: MessageId,
) -> BroadcastReport {
    run(user_ids, |user_id| async move {
        bot.forward_message(ChatId(user_id), from_chat, message_id).await?;
        Ok(())
    })
    .await
}

/// Sends a plain text copy to every user.
pub async fn text_to_all(bot: &Bot, user_ids: &[i64], text: &str) -> BroadcastReport {
    run(user_ids, |user_id| async move {
        bot.send_message(ChatId(user_id), text).await?;
        Ok(())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppError;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicIsize;

    #[tokio::test]
    async fn tallies_successes_and_failures() {
        let users: Vec<i64> = (1..=10).collect();
        let report = run(&users, |user_id| async move {
            if user_id % 3 == 0 {
                Err(AppError::InvalidInput("blocked".to_string()))
            } else {
                Ok(())
            }
        })
        .await;
        assert_eq!(report, BroadcastReport { succeeded: 7, failed: 3 });
    }

    #[tokio::test]
    async fn failures_do_not_abort_the_run() {
        let sent = AtomicUsize::new(0);
        let users: Vec<i64> = (1..=5).collect();
        let report = run(&users, |_| {
            sent.fetch_add(1, Ordering::Relaxed);
            async { Err(AppError::InvalidInput("always".to_string())) }
        })
        .await;
        assert_eq!(sent.load(Ordering::Relaxed), 5);
        assert_eq!(report, BroadcastReport { succeeded: 0, failed: 5 });
    }

    #[tokio::test(start_paused = true)]
    async fn failed_sends_skip_the_rate_limit_pause() {
        let start = tokio::time::Instant::now();
        let users: Vec<i64> = (1..=30).collect();
        let report = run(&users, |_| async {
            Err(AppError::InvalidInput("blocked".to_string()))
        })
        .await;
        assert_eq!(report.failed, 30);
        // With a paused clock, time only advances through sleeps; an
        // all-failure run must not schedule any.
        assert_eq!(start.elapsed(), std::time::Duration::ZERO);
    }

    #[tokio::test]
    async fn in_flight_sends_stay_bounded() {
        let in_flight = Arc::new(AtomicIsize::new(0));
        let peak = Arc::new(AtomicIsize::new(0));
        let users: Vec<i64> = (1..=100).collect();
        let report = run(&users, |_| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;
        assert_eq!(report.succeeded, 100);
        assert!(peak.load(Ordering::SeqCst) as usize <= config::broadcast::MAX_CONCURRENT);
    }
}
