use super::dispatch::{ReminderNotice, ResponseAction};
use super::models::{RecallOutcome, ReminderPayload, ReminderResponse};

pub const REMINDER_TITLE: &str = "🔔 Review your word!";
pub const REMEMBERED_LABEL: &str = "✅ I remember";
pub const FORGOTTEN_LABEL: &str = "❌ I forgot";

/// Render a fired reminder: the word in plain view, the definition hidden, and
/// exactly two response actions.
pub fn render_reminder(payload: &ReminderPayload) -> ReminderNotice {
    ReminderNotice {
        title: REMINDER_TITLE.to_string(),
        word: payload.word.clone(),
        definition: payload.definition.clone(),
        definition_obscured: true,
        actions: vec![
            ResponseAction {
                label: REMEMBERED_LABEL.to_string(),
                response: ReminderResponse::new(RecallOutcome::Remembered, payload.word.clone()),
            },
            ResponseAction {
                label: FORGOTTEN_LABEL.to_string(),
                response: ReminderResponse::new(RecallOutcome::Forgotten, payload.word.clone()),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminders::models::ReminderStage;
    use crate::vocabulary::OwnerId;
    use uuid::Uuid;

    #[test]
    fn test_render_hides_definition_and_offers_two_outcomes() {
        let payload = ReminderPayload {
            owner_id: OwnerId::from("u1"),
            word: "exhilarate".to_string(),
            definition: "to make very happy".to_string(),
            stage: ReminderStage::After24Hours,
            burst_id: Uuid::new_v4(),
        };

        let notice = render_reminder(&payload);
        assert!(notice.definition_obscured);
        assert_eq!(notice.word, "exhilarate");
        assert_eq!(notice.definition, "to make very happy");

        let outcomes: Vec<RecallOutcome> = notice.actions.iter().map(|a| a.outcome()).collect();
        assert_eq!(outcomes, vec![RecallOutcome::Remembered, RecallOutcome::Forgotten]);
        assert_eq!(notice.actions[1].callback_data(), "forgot|exhilarate");
    }
}
