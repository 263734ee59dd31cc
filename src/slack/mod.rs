//! All Slack-specific functionality

pub mod blocks;
pub mod bot;
pub mod client;
pub mod command_parser;
pub mod history;
pub mod response_builder;

// Re-export main types for convenience
pub use bot::SlackBot;
pub use client::SlackClient;
pub use command_parser::{BotCommand, SlackCommandEvent, parse_form_data};
pub use history::fetch_chat_log;
