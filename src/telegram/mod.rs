//! Telegram-facing layer: routing, guards, keyboards, delivery and the
//! background janitor.

pub mod bot;
pub mod broadcast;
pub mod cleanup;
pub mod guard;
pub mod handlers;
pub mod keyboards;
pub mod media;
pub mod membership;
pub mod router;

pub use bot::create_bot;
