//! Telegram transport
//!
//! This module provides:
//! - Construction of the teloxide `Bot` from the `[telegram]` config section
//! - `TelegramDispatcher`, which delivers reminders with answer buttons
//! - The long-polling conversation loop (`/start`, `/list`, word intake, answers)

use std::time::Duration;

use teloxide::Bot;
use thiserror::Error;

use crate::config::TelegramConfig;

pub mod dispatcher;
pub mod frontend;

pub use dispatcher::TelegramDispatcher;
pub use frontend::{start_bot, BotHandle};

/// Extra time the HTTP client allows on top of the long-poll timeout
const HTTP_TIMEOUT_MARGIN_SECS: u64 = 15;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid Bot API url {url}: {reason}")]
    InvalidApiUrl { url: String, reason: String },
}

/// Build a bot whose HTTP timeout outlasts the configured long poll
pub fn build_bot(config: &TelegramConfig, token: &str) -> Result<Bot, TelegramError> {
    let api_url = reqwest::Url::parse(&config.api_url).map_err(|e| TelegramError::InvalidApiUrl {
        url: config.api_url.clone(),
        reason: e.to_string(),
    })?;

    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(
            config.poll_timeout_secs + HTTP_TIMEOUT_MARGIN_SECS,
        ))
        .build()?;

    Ok(Bot::with_client(token, client).set_api_url(api_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_bot_uses_configured_api_url() {
        let config = TelegramConfig {
            api_url: "http://localhost:8081".to_string(),
            ..TelegramConfig::default()
        };

        let bot = build_bot(&config, "123:abc").unwrap();
        assert_eq!(bot.api_url().as_str(), "http://localhost:8081/");
    }

    #[test]
    fn test_build_bot_rejects_bad_api_url() {
        let config = TelegramConfig {
            api_url: "not a url".to_string(),
            ..TelegramConfig::default()
        };

        assert!(matches!(
            build_bot(&config, "123:abc"),
            Err(TelegramError::InvalidApiUrl { .. })
        ));
    }
}
