//! Exam session state machine.
//!
//! An [`ExamSession`] is created from a subject's question pool, mutated by the
//! participant (answer, advance, jump, power-ups) and by a once-per-second
//! [`ExamSession::tick`], and ends in a terminal finished state.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::index;
use std::fmt;
use thiserror::Error;

use crate::model::{
    ExamResult, ExamResultDraft, ExamResultError, FinishReason, OPTION_COUNT, OptionIndex,
    PowerupKind, PowerupUse, Question, Subject, UserId,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RulesError {
    #[error("question count must be > 0")]
    InvalidQuestionCount,

    #[error("exam duration must be > 0")]
    InvalidDuration,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("only {available} questions available, at least {required} are needed")]
    InsufficientQuestions { available: usize, required: usize },

    #[error("choose an answer first")]
    NoAnswerSelected,

    #[error("question {index} does not exist (exam has {count})")]
    InvalidQuestionIndex { index: usize, count: usize },

    #[error("option {0} has been removed for this question")]
    OptionDisabled(OptionIndex),

    #[error("needs {required_secs}s of remaining time, only {remaining_secs}s left")]
    InsufficientTime {
        required_secs: u32,
        remaining_secs: u32,
    },

    #[error("exam already finished")]
    Finished,

    #[error("exam is still in progress")]
    NotFinished,

    #[error(transparent)]
    Result(#[from] ExamResultError),
}

//
// ─── RULES ─────────────────────────────────────────────────────────────────────
//

/// Exam-wide parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamRules {
    question_count: usize,
    duration_secs: u32,
    xp_per_correct: u64,
}

impl ExamRules {
    /// 20 questions, 90 minutes, 100 XP per correct answer.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            question_count: 20,
            duration_secs: 90 * 60,
            xp_per_correct: 100,
        }
    }

    /// # Errors
    ///
    /// Returns `RulesError` if the question count or duration is zero.
    pub fn new(
        question_count: usize,
        duration_secs: u32,
        xp_per_correct: u64,
    ) -> Result<Self, RulesError> {
        if question_count == 0 {
            return Err(RulesError::InvalidQuestionCount);
        }
        if duration_secs == 0 {
            return Err(RulesError::InvalidDuration);
        }
        Ok(Self {
            question_count,
            duration_secs,
            xp_per_correct,
        })
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.question_count
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn xp_per_correct(&self) -> u64 {
        self.xp_per_correct
    }
}

impl Default for ExamRules {
    fn default() -> Self {
        Self::standard()
    }
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    InProgress,
    Finished(FinishReason),
}

/// What a charged power-up did to the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerupEffect {
    /// Clue text, or `None` when the question has none.
    Clue(Option<String>),
    /// Two incorrect options that are no longer selectable.
    Eliminated([OptionIndex; 2]),
    /// The correct option; every other option is disabled.
    Revealed(OptionIndex),
}

impl PowerupEffect {
    pub const NO_CLUE: &'static str = "No clue is available for this question.";
}

#[derive(Clone)]
struct Slot {
    question: Question,
    answer: Option<OptionIndex>,
    scored: bool,
    disabled: [bool; OPTION_COUNT],
    revealed: bool,
}

impl Slot {
    fn new(question: Question) -> Self {
        Self {
            question,
            answer: None,
            scored: false,
            disabled: [false; OPTION_COUNT],
            revealed: false,
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at an exam for a single subject.
#[derive(Clone)]
pub struct ExamSession {
    subject: Subject,
    rules: ExamRules,
    slots: Vec<Slot>,
    current: usize,
    time_remaining: u32,
    score: u32,
    xp_earned: u64,
    used_powerups: Vec<PowerupUse>,
    state: SessionState,
    started_at: DateTime<Utc>,
}

impl ExamSession {
    /// Samples `rules.question_count()` questions without replacement from `pool`
    /// and starts the countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InsufficientQuestions` if the pool is too small.
    pub fn start<R: Rng + ?Sized>(
        subject: Subject,
        pool: Vec<Question>,
        rules: ExamRules,
        rng: &mut R,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let required = rules.question_count();
        if pool.len() < required {
            return Err(SessionError::InsufficientQuestions {
                available: pool.len(),
                required,
            });
        }

        let picks = index::sample(rng, pool.len(), required);
        let mut pool: Vec<Option<Question>> = pool.into_iter().map(Some).collect();
        let slots = picks
            .into_iter()
            .filter_map(|i| pool[i].take())
            .map(Slot::new)
            .collect();

        Ok(Self {
            subject,
            rules,
            slots,
            current: 0,
            time_remaining: rules.duration_secs(),
            score: 0,
            xp_earned: 0,
            used_powerups: Vec::new(),
            state: SessionState::InProgress,
            started_at,
        })
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn rules(&self) -> ExamRules {
        self.rules
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, SessionState::Finished(_))
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.slots[self.current].question
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.slots.get(index).map(|s| &s.question)
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<OptionIndex> {
        self.slots.get(index).and_then(|s| s.answer)
    }

    #[must_use]
    pub fn answers(&self) -> Vec<Option<OptionIndex>> {
        self.slots.iter().map(|s| s.answer).collect()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.slots.iter().filter(|s| s.answer.is_some()).count()
    }

    /// Whether the question has already been scored by a forward advance.
    #[must_use]
    pub fn is_scored(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|s| s.scored)
    }

    /// Whether `option` can still be chosen on question `index`.
    #[must_use]
    pub fn is_option_enabled(&self, index: usize, option: OptionIndex) -> bool {
        self.slots
            .get(index)
            .is_some_and(|s| !s.disabled[option.as_usize()])
    }

    /// The correct option of question `index` if a Reveal was bought for it.
    #[must_use]
    pub fn revealed_answer(&self, index: usize) -> Option<OptionIndex> {
        self.slots
            .get(index)
            .filter(|s| s.revealed)
            .map(|s| s.question.answer())
    }

    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn xp_earned(&self) -> u64 {
        self.xp_earned
    }

    #[must_use]
    pub fn used_powerups(&self) -> &[PowerupUse] {
        &self.used_powerups
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        if self.is_finished() {
            Err(SessionError::Finished)
        } else {
            Ok(())
        }
    }

    /// Records `option` as the answer to the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` after the exam ended and
    /// `SessionError::OptionDisabled` for an option removed by a power-up.
    pub fn select_answer(&mut self, option: OptionIndex) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        let slot = &mut self.slots[self.current];
        if slot.disabled[option.as_usize()] {
            return Err(SessionError::OptionDisabled(option));
        }
        slot.answer = Some(option);
        Ok(())
    }

    /// Moves past the current question, scoring it the first time it is left.
    ///
    /// Leaving the last question finishes the exam. Answers changed after a
    /// question was scored do not affect the score.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoAnswerSelected` if the current question is unanswered.
    pub fn advance(&mut self) -> Result<SessionState, SessionError> {
        self.ensure_in_progress()?;
        let xp_per_correct = self.rules.xp_per_correct();
        let slot = &mut self.slots[self.current];
        let Some(answer) = slot.answer else {
            return Err(SessionError::NoAnswerSelected);
        };

        if !slot.scored {
            slot.scored = true;
            if slot.question.is_correct(answer) {
                self.score += 1;
                self.xp_earned += xp_per_correct;
            }
        }

        if self.current + 1 >= self.slots.len() {
            self.state = SessionState::Finished(FinishReason::Completed);
        } else {
            self.current += 1;
        }
        Ok(self.state)
    }

    /// Jumps to any question without scoring anything.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidQuestionIndex` for an out-of-range index.
    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        if index >= self.slots.len() {
            return Err(SessionError::InvalidQuestionIndex {
                index,
                count: self.slots.len(),
            });
        }
        self.current = index;
        Ok(())
    }

    /// Buys a power-up for the current question.
    ///
    /// Returns `Ok(None)` without charging when no time is left at all.
    /// Power-ups can be bought repeatedly; each purchase is charged.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InsufficientTime` (nothing charged) when the cost
    /// exceeds the remaining time, and `SessionError::Finished` after the exam ended.
    pub fn use_powerup<R: Rng + ?Sized>(
        &mut self,
        kind: PowerupKind,
        rng: &mut R,
    ) -> Result<Option<PowerupEffect>, SessionError> {
        if self.time_remaining == 0 {
            return Ok(None);
        }
        self.ensure_in_progress()?;

        let cost = kind.cost_secs();
        if self.time_remaining < cost {
            return Err(SessionError::InsufficientTime {
                required_secs: cost,
                remaining_secs: self.time_remaining,
            });
        }
        self.time_remaining -= cost;
        self.used_powerups.push(PowerupUse {
            question_index: self.current,
            kind,
        });

        let slot = &mut self.slots[self.current];
        let correct = slot.question.answer();
        let effect = match kind {
            PowerupKind::Clue => PowerupEffect::Clue(slot.question.clue().map(str::to_owned)),
            PowerupKind::FiftyFifty => {
                let wrong: Vec<OptionIndex> =
                    OptionIndex::all().filter(|o| *o != correct).collect();
                let picks = index::sample(rng, wrong.len(), 2);
                let removed = [wrong[picks.index(0)], wrong[picks.index(1)]];
                for option in removed {
                    slot.disabled[option.as_usize()] = true;
                }
                PowerupEffect::Eliminated(removed)
            }
            PowerupKind::Reveal => {
                slot.revealed = true;
                for option in OptionIndex::all().filter(|o| *o != correct) {
                    slot.disabled[option.as_usize()] = true;
                }
                PowerupEffect::Revealed(correct)
            }
        };
        Ok(Some(effect))
    }

    /// One second of the countdown. Reaching zero finishes the exam; the
    /// question on screen is not scored. A finished exam ignores ticks.
    pub fn tick(&mut self) -> SessionState {
        if self.is_finished() {
            return self.state;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            self.state = SessionState::Finished(FinishReason::TimedOut);
        }
        self.state
    }

    /// Builds the persisted result of a finished exam.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFinished` while the exam is still running.
    pub fn result(
        &self,
        user_id: UserId,
        completed_at: DateTime<Utc>,
    ) -> Result<ExamResult, SessionError> {
        let SessionState::Finished(finish_reason) = self.state else {
            return Err(SessionError::NotFinished);
        };
        let question_count = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        let powerups_used = u32::try_from(self.used_powerups.len()).unwrap_or(u32::MAX);

        Ok(ExamResult::from_persisted(ExamResultDraft {
            user_id,
            subject: self.subject,
            score: self.score,
            question_count,
            xp_earned: self.xp_earned,
            time_remaining_secs: self.time_remaining,
            duration_secs: self.rules.duration_secs(),
            powerups_used,
            finish_reason,
            started_at: self.started_at,
            completed_at: completed_at.max(self.started_at),
        })?)
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("subject", &self.subject)
            .field("questions", &self.slots.len())
            .field("current", &self.current)
            .field("time_remaining", &self.time_remaining)
            .field("score", &self.score)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
