use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tokio::time::sleep;

use sharebox::core::session::SessionStore;
use sharebox::core::state::StateStore;
use sharebox::core::{config, logging};
use sharebox::storage::cache::RedisCache;
use sharebox::storage::create_pool;
use sharebox::storage::repository::Repository;
use sharebox::telegram::cleanup::{spawn_janitor, CleanupQueue};
use sharebox::telegram::handlers::{schema, HandlerDeps};
use sharebox::telegram::create_bot;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    logging::init_logger();
    logging::log_configuration();

    run_bot().await
}

async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");

    // Durable store first: without it nothing works.
    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH)
            .map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );

    // Cache is best-effort; a dead Redis only costs us read latency.
    let cache = RedisCache::connect(&config::REDIS_URL).await;
    let repo = Repository::new(Arc::clone(&db_pool), cache);

    let bot = create_bot();

    // Retry get_me: the Bot API may still be warming up when we start.
    let bot_info = {
        let max_retries = 12;
        let mut retry = 0;
        loop {
            match bot.get_me().await {
                Ok(info) => break info,
                Err(e) => {
                    retry += 1;
                    if retry >= max_retries {
                        return Err(anyhow::anyhow!(
                            "Failed to connect to Bot API after {} retries: {}",
                            retry,
                            e
                        ));
                    }
                    log::warn!("Bot API not ready (attempt {}/{}): {}. Retrying in 5 seconds...", retry, max_retries, e);
                    sleep(Duration::from_secs(5)).await;
                }
            }
        }
    };
    let bot_username = bot_info.username.clone();
    log::info!("Bot username: {:?}, Bot ID: {}", bot_username, bot_info.id);

    // Warm the hot collections so the first user doesn't pay for it.
    match repo.user_ids().await {
        Ok(ids) => log::info!("🔥 Warmed user id cache ({} users)", ids.len()),
        Err(e) => log::warn!("Could not warm user id cache: {}", e),
    }
    match repo.admin_ids().await {
        Ok(ids) => log::info!("🔥 Warmed admin cache ({} admins)", ids.len()),
        Err(e) => log::warn!("Could not warm admin cache: {}", e),
    }
    match repo.channels(&bot).await {
        Ok(map) => log::info!("🔥 Warmed channel cache ({} channels)", map.len()),
        Err(e) => log::warn!("Could not warm channel cache: {}", e),
    }

    let cleanup = Arc::new(CleanupQueue::new());
    let janitor = spawn_janitor(bot.clone(), Arc::clone(&cleanup));

    let handler_deps = HandlerDeps {
        repo,
        states: Arc::new(StateStore::new()),
        sessions: Arc::new(SessionStore::new()),
        cleanup,
        bot_username,
        storage_channel: ChatId(*config::STORAGE_CHANNEL_ID),
    };

    log::info!("================================================");
    log::info!("🎉 Bot initialization complete");
    log::info!("📡 Ready to receive updates!");
    log::info!("================================================");

    Dispatcher::builder(bot, schema(handler_deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    // Shutdown: janitor first, then the cache and pool drop with us.
    log::info!("Shutting down gracefully...");
    janitor.abort();
    Ok(())
}
