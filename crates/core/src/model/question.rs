use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of options every question carries.
pub const OPTION_COUNT: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question must have exactly {OPTION_COUNT} options, found {found}")]
    OptionCount { found: usize },

    #[error("option index must be in 0..{OPTION_COUNT}, got {0}")]
    InvalidOption(u8),
}

//
// ─── OPTION INDEX ──────────────────────────────────────────────────────────────
//

/// Position of an option within a question, always in `0..4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8")]
pub struct OptionIndex(u8);

impl OptionIndex {
    pub const A: Self = Self(0);
    pub const B: Self = Self(1);
    pub const C: Self = Self(2);
    pub const D: Self = Self(3);

    /// Builds an option index from its numeric position.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidOption` when `value >= 4`.
    pub fn new(value: u8) -> Result<Self, QuestionError> {
        if usize::from(value) < OPTION_COUNT {
            Ok(Self(value))
        } else {
            Err(QuestionError::InvalidOption(value))
        }
    }

    /// Parses an answer letter (`A`..`D`, case-insensitive).
    #[must_use]
    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            _ => None,
        }
    }

    #[must_use]
    pub fn letter(self) -> char {
        char::from(b'A' + self.0)
    }

    #[must_use]
    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// All four positions in order.
    pub fn all() -> impl Iterator<Item = OptionIndex> {
        (0..OPTION_COUNT as u8).map(Self)
    }
}

impl TryFrom<u8> for OptionIndex {
    type Error = QuestionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for OptionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Unvalidated question as read from a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionDraft {
    pub text: Option<String>,
    pub options: Vec<String>,
    pub answer: Option<OptionIndex>,
    pub clue: Option<String>,
}

impl QuestionDraft {
    /// Validates the draft. A missing answer key falls back to option A.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` when the text is missing or blank and
    /// `QuestionError::OptionCount` unless exactly four options were given.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let text = self
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or(QuestionError::EmptyText)?;

        let found = self.options.len();
        let options: [String; OPTION_COUNT] = self
            .options
            .try_into()
            .map_err(|_| QuestionError::OptionCount { found })?;

        Ok(Question {
            text,
            options,
            answer: self.answer.unwrap_or(OptionIndex::A),
            clue: self.clue.filter(|c| !c.trim().is_empty()),
        })
    }
}

/// A single multiple-choice question. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    text: String,
    options: [String; OPTION_COUNT],
    answer: OptionIndex,
    clue: Option<String>,
}

impl Question {
    /// Creates a question from already-checked parts.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if `text` is blank.
    pub fn new(
        text: impl Into<String>,
        options: [String; OPTION_COUNT],
        answer: OptionIndex,
        clue: Option<String>,
    ) -> Result<Self, QuestionError> {
        QuestionDraft {
            text: Some(text.into()),
            options: options.into(),
            answer: Some(answer),
            clue,
        }
        .validate()
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    #[must_use]
    pub fn option(&self, index: OptionIndex) -> &str {
        &self.options[index.as_usize()]
    }

    #[must_use]
    pub fn answer(&self) -> OptionIndex {
        self.answer
    }

    #[must_use]
    pub fn clue(&self) -> Option<&str> {
        self.clue.as_deref()
    }

    #[must_use]
    pub fn is_correct(&self, choice: OptionIndex) -> bool {
        self.answer == choice
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> QuestionDraft {
        QuestionDraft {
            text: Some("2 + 2 = ?".into()),
            options: vec!["3".into(), "4".into(), "5".into(), "22".into()],
            answer: Some(OptionIndex::B),
            clue: Some("even".into()),
        }
    }

    #[test]
    fn valid_draft_builds_question() {
        let q = draft().validate().unwrap();
        assert_eq!(q.text(), "2 + 2 = ?");
        assert_eq!(q.option(OptionIndex::B), "4");
        assert!(q.is_correct(OptionIndex::B));
        assert_eq!(q.clue(), Some("even"));
    }

    #[test]
    fn blank_text_is_rejected() {
        let mut d = draft();
        d.text = Some("   ".into());
        assert_eq!(d.validate().unwrap_err(), QuestionError::EmptyText);
    }

    #[test]
    fn three_options_are_rejected() {
        let mut d = draft();
        d.options.pop();
        assert_eq!(
            d.validate().unwrap_err(),
            QuestionError::OptionCount { found: 3 }
        );
    }

    #[test]
    fn missing_answer_defaults_to_a() {
        let mut d = draft();
        d.answer = None;
        assert_eq!(d.validate().unwrap().answer(), OptionIndex::A);
    }

    #[test]
    fn option_index_bounds_and_letters() {
        assert_eq!(OptionIndex::new(3).unwrap().letter(), 'D');
        assert_eq!(
            OptionIndex::new(4).unwrap_err(),
            QuestionError::InvalidOption(4)
        );
        assert_eq!(OptionIndex::from_letter(" c "), Some(OptionIndex::C));
        assert_eq!(OptionIndex::from_letter("E"), None);
    }

    #[test]
    fn deserializing_checks_option_bounds() {
        let index: OptionIndex = serde_json::from_str("2").unwrap();
        assert_eq!(index, OptionIndex::C);
        assert_eq!(serde_json::to_string(&index).unwrap(), "2");
        assert!(serde_json::from_str::<OptionIndex>("4").is_err());
    }
}
