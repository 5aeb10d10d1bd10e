//! User-facing message texts shared by every frontend

use crate::reminders::RecallOutcome;
use crate::vocabulary::VocabularyEntry;

pub const WELCOME: &str = "Hello! Send me English vocabulary like this:\n\n\
word: exhilarate\n\
definition: to make someone feel very happy\n\n\
I will remind you in 24h, 3 days, and 1 week!";

pub const FORMAT_PROMPT: &str = "Please send in format:\nword: ...\ndefinition: ...";

pub const EMPTY_LISTING: &str = "You haven't saved any words yet.";

pub const GENERIC_FAILURE: &str = "Something went wrong, please retry.";

pub fn saved(word: &str) -> String {
    format!("Saved! I'll remind you about {} soon.", word)
}

/// Bulleted listing of saved words, or the empty notice
pub fn listing(entries: &[VocabularyEntry]) -> String {
    if entries.is_empty() {
        return EMPTY_LISTING.to_string();
    }

    let mut lines = vec!["📚 Your words:".to_string()];
    lines.extend(
        entries
            .iter()
            .map(|e| format!("• {} \u{2014} {}", e.word, e.definition)),
    );
    lines.join("\n")
}

/// Reply shown after the learner answers a reminder
pub fn acknowledgement(outcome: RecallOutcome, word: &str) -> String {
    match outcome {
        RecallOutcome::Remembered => format!("Great! You remembered {} 🎉", word),
        RecallOutcome::Forgotten => "Don't worry, I'll remind you again later 💪".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::OwnerId;

    #[test]
    fn test_listing_empty_notice() {
        assert_eq!(listing(&[]), EMPTY_LISTING);
    }

    #[test]
    fn test_listing_bullets_in_order() {
        let owner = OwnerId::from("u1");
        let entries = vec![
            VocabularyEntry::new(owner.clone(), "exhilarate".to_string(), "to make very happy".to_string()),
            VocabularyEntry::new(owner, "laconic".to_string(), "terse".to_string()),
        ];

        let text = listing(&entries);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "• exhilarate \u{2014} to make very happy");
        assert_eq!(lines[2], "• laconic \u{2014} terse");
    }
}
