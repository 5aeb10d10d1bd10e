use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::markdown::escape;

use crate::reminders::{DispatchError, NotificationDispatcher, ReminderNotice};
use crate::vocabulary::OwnerId;

/// Delivers reminders as Telegram messages with inline answer buttons
pub struct TelegramDispatcher {
    bot: Bot,
}

impl TelegramDispatcher {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Owners are Telegram chat ids
pub fn chat_id(owner_id: &OwnerId) -> Result<ChatId, DispatchError> {
    owner_id
        .as_str()
        .parse()
        .map(ChatId)
        .map_err(|_| DispatchError::InvalidRecipient(owner_id.to_string()))
}

/// MarkdownV2 body of a reminder.
///
/// The definition goes in a spoiler so the learner can try to recall it first.
pub fn reminder_text(notice: &ReminderNotice) -> String {
    let definition = escape(&notice.definition);
    let definition = if notice.definition_obscured {
        format!("||{}||", definition)
    } else {
        definition
    };

    format!(
        "*{}*\n\n📘 *Word:* {}\n📖 *Definition:* {}",
        escape(&notice.title),
        escape(&notice.word),
        definition
    )
}

/// One row holding the reminder's answer buttons
pub fn reminder_keyboard(notice: &ReminderNotice) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = notice
        .actions
        .iter()
        .map(|action| InlineKeyboardButton::callback(action.label.clone(), action.callback_data()))
        .collect();

    InlineKeyboardMarkup::new(vec![buttons])
}

#[async_trait]
impl NotificationDispatcher for TelegramDispatcher {
    async fn send(&self, owner_id: &OwnerId, notice: &ReminderNotice) -> Result<(), DispatchError> {
        let chat_id = chat_id(owner_id)?;

        self.bot
            .send_message(chat_id, reminder_text(notice))
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(reminder_keyboard(notice))
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminders::{render_reminder, ReminderPayload, ReminderStage};
    use teloxide::types::InlineKeyboardButtonKind;
    use uuid::Uuid;

    fn notice() -> ReminderNotice {
        render_reminder(&ReminderPayload {
            owner_id: OwnerId::from(42_i64),
            word: "well-being".to_string(),
            definition: "state of being happy.".to_string(),
            stage: ReminderStage::After3Days,
            burst_id: Uuid::new_v4(),
        })
    }

    #[test]
    fn test_reminder_text_hides_definition() {
        let text = reminder_text(&notice());

        assert!(text.contains("well\\-being"));
        assert!(text.contains("||state of being happy\\.||"));
    }

    #[test]
    fn test_reminder_keyboard_buttons() {
        let keyboard = reminder_keyboard(&notice());

        assert_eq!(keyboard.inline_keyboard.len(), 1);
        let row = &keyboard.inline_keyboard[0];
        assert_eq!(row.len(), 2);

        assert_eq!(row[0].text, "✅ I remember");
        assert!(matches!(
            &row[0].kind,
            InlineKeyboardButtonKind::CallbackData(data) if data == "remember|well-being"
        ));
        assert_eq!(row[1].text, "❌ I forgot");
        assert!(matches!(
            &row[1].kind,
            InlineKeyboardButtonKind::CallbackData(data) if data == "forgot|well-being"
        ));
    }

    #[test]
    fn test_visible_definition_has_no_spoiler() {
        let mut notice = notice();
        notice.definition_obscured = false;

        assert!(!reminder_text(&notice).contains("||"));
    }

    #[test]
    fn test_chat_id_parsing() {
        assert_eq!(chat_id(&OwnerId::from(-100123_i64)).unwrap(), ChatId(-100123));
        assert!(matches!(
            chat_id(&OwnerId::from("alice")),
            Err(DispatchError::InvalidRecipient(_))
        ));
    }
}
