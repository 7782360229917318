use thiserror::Error;

use crate::model::{ExamResultError, ProfileError, QuestionError, UserError};
use crate::session::{RulesError, SessionError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Rules(#[from] RulesError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Result(#[from] ExamResultError),
}
