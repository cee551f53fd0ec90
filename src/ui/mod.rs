//! Terminal user interface

pub mod console_chat;

pub use console_chat::{ConsoleChat, HttpChatBackend};
