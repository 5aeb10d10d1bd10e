//! Parsing of free-form vocabulary submissions
//!
//! Accepted shape (keys are case-insensitive, lines may come in either order):
//! ```text
//! word: exhilarate
//! definition: to make someone feel very happy
//! ```

const WORD_KEY: &str = "word:";
const DEFINITION_KEY: &str = "definition:";

/// A word/definition pair extracted from a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub word: String,
    pub definition: String,
}

/// Extract a submission from message text.
///
/// Returns `None` when either key is missing. Values are trimmed but may be
/// empty; rejecting empty values is the reminder engine's job.
pub fn parse_submission(text: &str) -> Option<Submission> {
    let mut word = None;
    let mut definition = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(value) = strip_key(trimmed, WORD_KEY) {
            word.get_or_insert_with(|| value.to_string());
        } else if let Some(value) = strip_key(trimmed, DEFINITION_KEY) {
            definition.get_or_insert_with(|| value.to_string());
        }
    }

    Some(Submission {
        word: word?,
        definition: definition?,
    })
}

fn strip_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let head = line.get(..key.len())?;
    if head.eq_ignore_ascii_case(key) {
        Some(line[key.len()..].trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_format() {
        let parsed = parse_submission("word: exhilarate\ndefinition: to make someone feel very happy");
        assert_eq!(
            parsed,
            Some(Submission {
                word: "exhilarate".to_string(),
                definition: "to make someone feel very happy".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_tolerates_case_order_and_whitespace() {
        let parsed = parse_submission("  Definition:   using very few words \r\nWORD:laconic\n").unwrap();
        assert_eq!(parsed.word, "laconic");
        assert_eq!(parsed.definition, "using very few words");
    }

    #[test]
    fn test_parse_requires_both_keys() {
        assert_eq!(parse_submission("word: laconic"), None);
        assert_eq!(parse_submission("laconic - using very few words"), None);
        assert_eq!(parse_submission(""), None);
    }

    #[test]
    fn test_parse_keeps_empty_values_for_validation() {
        let parsed = parse_submission("word: laconic\ndefinition:").unwrap();
        assert_eq!(parsed.definition, "");
    }

    #[test]
    fn test_parse_ignores_non_ascii_prefix_without_panicking() {
        assert_eq!(parse_submission("wörd: x\ndéfinition: y"), None);
    }
}
