//! Core building blocks: configuration, errors, logging, conversation
//! state and upload sessions.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod state;
pub mod utils;
