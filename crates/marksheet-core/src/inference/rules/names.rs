//! Person-name mentions.

use super::patterns::{CAPITALISED_SEQUENCE, DOCUMENT_VOCABULARY, NAME_LABEL, RELATION_LINE};

/// Finds person-type entity mentions in text.
pub trait EntityRecognizer: Send + Sync {
    /// Person mentions, deduplicated, in first-seen order.
    fn person_mentions(&self, text: &str) -> Vec<String>;
}

/// Rule-based person recognizer tuned for marksheets.
///
/// Per line, a labelled name ("Name:", "Candidate's Name -", ...) wins;
/// otherwise every run of two to four capitalised words that contains no
/// document vocabulary counts as a mention. Lines about parents, guardians
/// or signatories are skipped.
#[derive(Debug, Clone, Default)]
pub struct PersonNameRecognizer;

impl PersonNameRecognizer {
    pub fn new() -> Self {
        Self
    }

    fn line_mentions(line: &str) -> Vec<String> {
        if RELATION_LINE.is_match(line) {
            return Vec::new();
        }

        if let Some(caps) = NAME_LABEL.captures(line) {
            return vec![normalize(&caps[1])];
        }

        CAPITALISED_SEQUENCE
            .find_iter(line)
            .map(|m| m.as_str())
            .filter(|candidate| {
                !candidate
                    .split_whitespace()
                    .any(|word| DOCUMENT_VOCABULARY.contains(&word))
            })
            .map(normalize)
            .collect()
    }
}

impl EntityRecognizer for PersonNameRecognizer {
    fn person_mentions(&self, text: &str) -> Vec<String> {
        let mut mentions: Vec<String> = Vec::new();

        for mention in text.lines().flat_map(Self::line_mentions) {
            if !mention.is_empty() && !mentions.contains(&mention) {
                mentions.push(mention);
            }
        }

        mentions
    }
}

/// Collapse internal whitespace and trim trailing punctuation.
fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', '-', '\''])
        .to_string()
}
