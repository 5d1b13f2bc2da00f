//! sharebox — a Telegram bot that stores user media in a private backup
//! channel and shares it through retrieval codes.

pub mod core;
pub mod storage;
pub mod telegram;

pub use crate::core::error::{AppError, AppResult};
