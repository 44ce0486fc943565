//! Group-chat commands: tag everyone, reminders and roasts.

pub mod auth;
pub mod broadcast;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod reminder;
pub mod roast;
pub mod roster;
pub mod telegram;
pub mod timespan;


pub use client::ChatClient;
pub use dispatcher::CommandDispatcher;
pub use roster::Roster;
pub use telegram::TelegramClient;
