use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::{Subject, UserId};
use crate::progression::{Remark, passed, score_percent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamResultError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("score {score} exceeds question count {question_count}")]
    ScoreOutOfRange { score: u32, question_count: u32 },

    #[error("time remaining {remaining}s exceeds exam duration {duration}s")]
    TimeOutOfRange { remaining: u32, duration: u32 },

    #[error("invalid finish reason: {0}")]
    InvalidFinishReason(String),
}

/// How an exam reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinishReason {
    /// The participant advanced past the last question.
    Completed,
    /// The countdown reached zero.
    TimedOut,
}

impl FinishReason {
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            FinishReason::Completed => "completed",
            FinishReason::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FinishReason::Completed => "completed",
            FinishReason::TimedOut => "time is up",
        })
    }
}

impl FromStr for FinishReason {
    type Err = ExamResultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(FinishReason::Completed),
            "timed_out" => Ok(FinishReason::TimedOut),
            other => Err(ExamResultError::InvalidFinishReason(other.to_owned())),
        }
    }
}

/// Final, persisted snapshot of one finished exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamResult {
    user_id: UserId,
    subject: Subject,
    score: u32,
    question_count: u32,
    xp_earned: u64,
    time_remaining_secs: u32,
    duration_secs: u32,
    powerups_used: u32,
    finish_reason: FinishReason,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

/// Field bundle for `ExamResult::from_persisted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamResultDraft {
    pub user_id: UserId,
    pub subject: Subject,
    pub score: u32,
    pub question_count: u32,
    pub xp_earned: u64,
    pub time_remaining_secs: u32,
    pub duration_secs: u32,
    pub powerups_used: u32,
    pub finish_reason: FinishReason,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl ExamResult {
    /// Rehydrate a result, checking its internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `ExamResultError` when timestamps, score or remaining time are out of range.
    pub fn from_persisted(draft: ExamResultDraft) -> Result<Self, ExamResultError> {
        if draft.completed_at < draft.started_at {
            return Err(ExamResultError::InvalidTimeRange);
        }
        if draft.score > draft.question_count {
            return Err(ExamResultError::ScoreOutOfRange {
                score: draft.score,
                question_count: draft.question_count,
            });
        }
        if draft.time_remaining_secs > draft.duration_secs {
            return Err(ExamResultError::TimeOutOfRange {
                remaining: draft.time_remaining_secs,
                duration: draft.duration_secs,
            });
        }

        Ok(Self {
            user_id: draft.user_id,
            subject: draft.subject,
            score: draft.score,
            question_count: draft.question_count,
            xp_earned: draft.xp_earned,
            time_remaining_secs: draft.time_remaining_secs,
            duration_secs: draft.duration_secs,
            powerups_used: draft.powerups_used,
            finish_reason: draft.finish_reason,
            started_at: draft.started_at,
            completed_at: draft.completed_at,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn xp_earned(&self) -> u64 {
        self.xp_earned
    }

    #[must_use]
    pub fn time_remaining_secs(&self) -> u32 {
        self.time_remaining_secs
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Seconds spent, including time paid for power-ups.
    #[must_use]
    pub fn time_used_secs(&self) -> u32 {
        self.duration_secs - self.time_remaining_secs
    }

    #[must_use]
    pub fn powerups_used(&self) -> u32 {
        self.powerups_used
    }

    #[must_use]
    pub fn finish_reason(&self) -> FinishReason {
        self.finish_reason
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn percent(&self) -> f64 {
        score_percent(self.score, self.question_count)
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        passed(self.percent())
    }

    #[must_use]
    pub fn remark(&self) -> Remark {
        Remark::for_percent(self.percent())
    }
}
