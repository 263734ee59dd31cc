//! Degul - a Slack bot that analyses how a team talks in a channel.
//!
//! This crate implements a two-Lambda architecture:
//! 1. An API Lambda that verifies Slack requests, answers the greeting and
//!    queues analysis commands
//! 2. A Worker Lambda that reads the channel history, runs the analysis and
//!    posts blocks and charts back to the channel
//!
//! # Architecture
//!
//! The system uses:
//! - AWS Lambda for serverless execution
//! - SQS for task queuing between Lambdas
//! - The Slack Web API for history, users, messages and file uploads
//! - IBM watsonx.ai for topic extraction, contribution rating and embeddings
//! - plotters for PNG charts
//!
//! # Example
//!
//! ```no_run
//! use degul::analysis::{ParticipationMetric, analyze_participation};
//! use degul::core::config::AppConfig;
//! use degul::slack::SlackBot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     degul::setup_logging();
//!
//!     let config = AppConfig::from_env()?;
//!     let bot = SlackBot::new(&config);
//!
//!     let logs = bot.chat_log("C12345678").await?;
//!     let report = analyze_participation(&logs, ParticipationMetric::MessageCount);
//!     if let Some(mvp) = report.mvp() {
//!         println!("MVP: {} with {} messages", mvp.username, mvp.value);
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod ai;
pub mod analysis;
pub mod api;
pub mod charts;
pub mod core;
pub mod errors;
pub mod slack;
pub mod worker;

pub use errors::BotError;

/// Configure structured logging with JSON format for AWS Lambda environments.
///
/// Sets up tracing-subscriber with a JSON formatter suitable for `CloudWatch`
/// Logs. The level comes from `RUST_LOG` and defaults to `info`. Calling it
/// more than once is harmless.
///
/// # Example
///
/// ```
/// degul::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
