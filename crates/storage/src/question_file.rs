//! Plain-text question file format.
//!
//! ```text
//! [SOAL]
//! text: What is 2 + 2?
//! option_A: 3
//! option_B: 4
//! option_C: 5
//! option_D: 22
//! answer: B
//! clue: It is even.
//! ```
//!
//! Options are kept in the order they appear. An unrecognized answer letter
//! means `A`. Records without text or without exactly four options are skipped.

use quiz_core::model::{OptionIndex, Question, QuestionDraft, QuestionError};
use std::fmt::Write as _;

pub const RECORD_MARKER: &str = "[SOAL]";

const OPTION_PREFIXES: [&str; 4] = ["option_A:", "option_B:", "option_C:", "option_D:"];

/// A record that failed validation, with its 1-based position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub position: usize,
    pub reason: QuestionError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuestions {
    pub questions: Vec<Question>,
    pub skipped: Vec<SkippedRecord>,
}

fn parse_record(block: &str) -> QuestionDraft {
    let mut draft = QuestionDraft::default();
    for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(rest) = line.strip_prefix("text:") {
            draft.text = Some(rest.trim().to_owned());
        } else if let Some(rest) = OPTION_PREFIXES
            .iter()
            .find_map(|prefix| line.strip_prefix(prefix))
        {
            draft.options.push(rest.trim().to_owned());
        } else if let Some(rest) = line.strip_prefix("answer:") {
            draft.answer = Some(OptionIndex::from_letter(rest).unwrap_or(OptionIndex::A));
        } else if let Some(rest) = line.strip_prefix("clue:") {
            draft.clue = Some(rest.trim().to_owned());
        }
    }
    draft
}

/// Parses every `[SOAL]` record in `content`.
#[must_use]
pub fn parse(content: &str) -> ParsedQuestions {
    let mut parsed = ParsedQuestions::default();
    let blocks = content
        .trim()
        .split(RECORD_MARKER)
        .filter(|b| !b.trim().is_empty());

    for (i, block) in blocks.enumerate() {
        match parse_record(block).validate() {
            Ok(question) => parsed.questions.push(question),
            Err(reason) => parsed.skipped.push(SkippedRecord {
                position: i + 1,
                reason,
            }),
        }
    }
    parsed
}

/// Writes questions back in the same format `parse` reads.
#[must_use]
pub fn render(questions: &[Question]) -> String {
    let mut out = String::new();
    for q in questions {
        let _ = writeln!(out, "{RECORD_MARKER}");
        let _ = writeln!(out, "text: {}", q.text());
        for (prefix, option) in OPTION_PREFIXES.iter().zip(q.options()) {
            let _ = writeln!(out, "{prefix} {option}");
        }
        let _ = writeln!(out, "answer: {}", q.answer().letter());
        if let Some(clue) = q.clue() {
            let _ = writeln!(out, "clue: {clue}");
        }
        out.push('\n');
    }
    out
}
