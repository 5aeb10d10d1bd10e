use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use wordloop_lib::config::TOKEN_ENV;
use wordloop_lib::telegram::{build_bot, start_bot, TelegramDispatcher};

use crate::app::App;

/// Fire reminders and serve the bot until Ctrl-C.
///
/// Pending jobs stay on disk across restarts; anything that came due while the
/// bot was down fires right after start.
pub async fn run(app: &App) -> Result<()> {
    let telegram = &app.config.telegram;
    let token = telegram.token.as_deref().with_context(|| {
        format!(
            "No Telegram bot token configured (set telegram.token or {})",
            TOKEN_ENV
        )
    })?;

    let bot = build_bot(telegram, token).context("Failed to create Telegram bot")?;

    let engine = app.engine(Arc::new(TelegramDispatcher::new(bot.clone())));
    app.scheduler
        .start(Arc::new(engine.clone()))
        .context("Failed to start scheduler")?;

    let bot = start_bot(
        bot,
        engine,
        Duration::from_secs(telegram.poll_timeout_secs),
    );
    log::info!("wordloop running, data in {}", app.data_dir.display());

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
    }

    log::info!("Shutting down");
    bot.shutdown().await;
    app.scheduler.stop().await;

    Ok(())
}
