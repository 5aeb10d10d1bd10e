//! Conversation loop of the bot
//!
//! A teloxide dispatcher long-polls for updates and routes them: messages go
//! through `respond_to_text`, button presses through `respond_to_answer`.
//! Both are plain functions over the engine so the conversation rules can be
//! exercised without a network. The stores do blocking file I/O, so the
//! handlers run them on the blocking pool.

use std::time::Duration;

use teloxide::dispatching::ShutdownToken;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use tokio::task::JoinHandle;

use crate::messages;
use crate::reminders::{ReminderEngine, ReminderError, ReminderResponse};
use crate::vocabulary::{parse_submission, OwnerId};

/// Initial backoff delay after a failed poll
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Maximum backoff delay
const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Handle for a running bot
pub struct BotHandle {
    shutdown: ShutdownToken,
    task: JoinHandle<()>,
}

impl BotHandle {
    /// Stop polling, let in-progress handlers finish, and wait for the dispatcher
    pub async fn shutdown(self) {
        match self.shutdown.shutdown() {
            Ok(stopped) => stopped.await,
            Err(_) => {
                log::debug!("Telegram: dispatcher not running yet, aborting");
                self.task.abort();
            }
        }

        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                log::error!("Telegram: dispatcher task ended abnormally: {}", e);
            }
        }
    }
}

/// Delay before the next `getUpdates` after `error_count` consecutive failures
pub fn poll_backoff(error_count: u32) -> Duration {
    INITIAL_BACKOFF
        .saturating_mul(1 << error_count.min(16))
        .min(MAX_BACKOFF)
}

/// Start polling for updates in a background task
pub fn start_bot(bot: Bot, engine: ReminderEngine, poll_timeout: Duration) -> BotHandle {
    let listener = Polling::builder(bot.clone())
        .timeout(poll_timeout)
        .backoff_strategy(poll_backoff)
        .build();

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine])
        .default_handler(|update| async move {
            log::debug!("Telegram: ignoring update {:?}", update.id);
        })
        .build();
    let shutdown = dispatcher.shutdown_token();

    let task = tokio::spawn(async move {
        log::info!("Telegram: polling for updates");
        dispatcher
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("Telegram: update listener error"),
            )
            .await;
        log::info!("Telegram: dispatcher stopped");
    });

    BotHandle { shutdown, task }
}

/// Run store work off the async workers. `None` when the task panicked.
async fn blocking<T, F>(work: F) -> Option<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(value) => Some(value),
        Err(e) => {
            log::error!("Telegram: store task failed: {}", e);
            None
        }
    }
}

async fn on_message(bot: Bot, msg: Message, engine: ReminderEngine) -> ResponseResult<()> {
    let Some(text) = msg.text().map(str::to_owned) else {
        return Ok(());
    };

    let chat_id = msg.chat.id;
    let owner = OwnerId::from(chat_id.0);
    let reply = blocking(move || respond_to_text(&engine, &owner, &text))
        .await
        .unwrap_or_else(|| messages::GENERIC_FAILURE.to_string());

    bot.send_message(chat_id, reply).await?;
    Ok(())
}

async fn on_callback(bot: Bot, query: CallbackQuery, engine: ReminderEngine) -> ResponseResult<()> {
    if let Err(e) = bot.answer_callback_query(query.id.clone()).await {
        log::warn!("Telegram: failed to answer callback {}: {}", query.id, e);
    }

    let Some(data) = query.data.clone() else {
        return Ok(());
    };

    let chat_id = query
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or_else(|| ChatId::from(query.from.id));
    let owner = OwnerId::from(chat_id.0);

    let answer = data.clone();
    let reply = match blocking(move || respond_to_answer(&engine, &owner, &answer)).await {
        Some(Some(reply)) => reply,
        Some(None) => {
            log::warn!("Telegram: ignoring unrecognised callback data {:?}", data);
            return Ok(());
        }
        None => messages::GENERIC_FAILURE.to_string(),
    };

    if let Some(message) = &query.message {
        match bot.edit_message_text(chat_id, message.id(), reply.clone()).await {
            Ok(_) => return Ok(()),
            Err(e) => log::warn!("Telegram: failed to edit reminder in chat {}: {}", chat_id, e),
        }
    }

    bot.send_message(chat_id, reply).await?;
    Ok(())
}

/// Reply to a text message: a command or a word submission
pub fn respond_to_text(engine: &ReminderEngine, owner_id: &OwnerId, text: &str) -> String {
    let text = text.trim();

    if text.starts_with('/') {
        let command = text
            .split_whitespace()
            .next()
            .and_then(|c| c.split('@').next())
            .unwrap_or_default();

        return match command {
            "/start" | "/help" => messages::WELCOME.to_string(),
            "/list" => match engine.list(owner_id) {
                Ok(entries) => messages::listing(&entries),
                Err(e) => {
                    log::error!("Telegram: failed to list words for {}: {}", owner_id, e);
                    e.user_message()
                }
            },
            _ => messages::FORMAT_PROMPT.to_string(),
        };
    }

    let Some(submission) = parse_submission(text) else {
        return messages::FORMAT_PROMPT.to_string();
    };

    match engine.enroll(owner_id, &submission.word, &submission.definition) {
        Ok(_) => messages::saved(&submission.word),
        Err(e @ ReminderError::Validation(_)) => {
            log::debug!("Telegram: rejected submission from {}: {}", owner_id, e);
            e.user_message()
        }
        Err(e) => {
            log::error!("Telegram: enrollment failed for {}: {}", owner_id, e);
            e.user_message()
        }
    }
}

/// Acknowledgement for a pressed reminder button, or `None` for foreign callback data
pub fn respond_to_answer(engine: &ReminderEngine, owner_id: &OwnerId, data: &str) -> Option<String> {
    let response = ReminderResponse::parse(data)?;

    let reply = match engine.on_outcome(owner_id, &response.word, response.outcome) {
        Ok(report) => report.acknowledgement,
        Err(e) => {
            log::error!(
                "Telegram: failed to handle '{}' answer for '{}' ({}): {}",
                response.outcome.token(),
                response.word,
                owner_id,
                e
            );
            e.user_message()
        }
    };

    Some(reply)
}
