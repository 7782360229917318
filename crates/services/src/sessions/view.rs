use chrono::{DateTime, Utc};

use quiz_core::model::{ExamResult, ExamResultId, FinishReason, OptionIndex, Subject};
use quiz_core::progression::Remark;
use quiz_core::session::{ExamSession, SessionState};
use quiz_core::time::format_countdown;
use storage::repository::ExamResultRow;

use super::progress::ExamProgress;
use super::workflow::FinishedExam;

/// Navigation marker for one question of a running exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStatus {
    Current,
    Answered,
    Unanswered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub index: OptionIndex,
    pub text: String,
    pub enabled: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    /// 1-based.
    pub number: usize,
    pub total: usize,
    pub text: String,
    pub options: Vec<OptionView>,
    /// Correct option, once a Reveal was bought for this question.
    pub revealed: Option<OptionIndex>,
}

/// Read-only snapshot of a running exam for the presentation layer.
///
/// Holds owned data only, so the caller cannot mutate the session through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamView {
    pub subject: Subject,
    pub question: QuestionView,
    pub navigation: Vec<NavStatus>,
    pub progress: ExamProgress,
    pub time_remaining_secs: u32,
    pub countdown: String,
    pub powerups_used: usize,
    pub state: SessionState,
}

impl ExamView {
    #[must_use]
    pub fn of(session: &ExamSession) -> Self {
        let current = session.current_index();
        let question = session.current_question();
        let selected = session.answer(current);

        let options = OptionIndex::all()
            .map(|index| OptionView {
                index,
                text: question.option(index).to_owned(),
                enabled: session.is_option_enabled(current, index),
                selected: selected == Some(index),
            })
            .collect();

        let navigation = session
            .answers()
            .iter()
            .enumerate()
            .map(|(i, answer)| {
                if i == current {
                    NavStatus::Current
                } else if answer.is_some() {
                    NavStatus::Answered
                } else {
                    NavStatus::Unanswered
                }
            })
            .collect();

        Self {
            subject: session.subject(),
            question: QuestionView {
                number: current + 1,
                total: session.question_count(),
                text: question.text().to_owned(),
                options,
                revealed: session.revealed_answer(current),
            },
            navigation,
            progress: ExamProgress::of(session),
            time_remaining_secs: session.time_remaining(),
            countdown: format_countdown(session.time_remaining()),
            powerups_used: session.used_powerups().len(),
            state: session.state(),
        }
    }
}

/// What the result screen shows after an exam.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub subject: Subject,
    pub score: u32,
    pub question_count: u32,
    pub percent: f64,
    pub time_left: String,
    pub xp_gained: u64,
    pub total_xp: u64,
    pub level: u32,
    pub leveled_up: bool,
    pub powerups_used: u32,
    pub finish_reason: FinishReason,
    pub remark: Remark,
}

impl ResultView {
    #[must_use]
    pub fn of(finished: &FinishedExam) -> Self {
        let result = &finished.result;
        Self {
            subject: result.subject(),
            score: result.score(),
            question_count: result.question_count(),
            percent: result.percent(),
            time_left: format_countdown(result.time_remaining_secs()),
            xp_gained: result.xp_earned(),
            total_xp: finished.user.xp,
            level: finished.user.level(),
            leveled_up: finished.leveled_up(),
            powerups_used: result.powerups_used(),
            finish_reason: result.finish_reason(),
            remark: result.remark(),
        }
    }
}

/// One line of a participant's exam history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub id: ExamResultId,
    pub subject: Subject,
    pub score: u32,
    pub question_count: u32,
    pub percent: f64,
    pub passed: bool,
    pub xp_earned: u64,
    pub finish_reason: FinishReason,
    pub completed_at: DateTime<Utc>,
}

impl HistoryItem {
    #[must_use]
    pub fn from_row(row: &ExamResultRow) -> Self {
        Self::from_result(row.id, &row.result)
    }

    #[must_use]
    pub fn from_result(id: ExamResultId, result: &ExamResult) -> Self {
        Self {
            id,
            subject: result.subject(),
            score: result.score(),
            question_count: result.question_count(),
            percent: result.percent(),
            passed: result.passed(),
            xp_earned: result.xp_earned(),
            finish_reason: result.finish_reason(),
            completed_at: result.completed_at(),
        }
    }
}
