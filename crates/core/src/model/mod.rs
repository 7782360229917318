mod ids;
mod powerup;
mod question;
mod result;
mod subject;
mod user;

pub use ids::{ExamResultId, ParseIdError, UserId};
pub use powerup::{PowerupKind, PowerupUse, UnknownPowerup};
pub use question::{OPTION_COUNT, OptionIndex, Question, QuestionDraft, QuestionError};
pub use result::{ExamResult, ExamResultDraft, ExamResultError, FinishReason};
pub use subject::{GradeClass, ProfileError, Religion, Subject};
pub use user::{
    MIN_PASSWORD_LEN, MIN_USERNAME_LEN, RegistrationDraft, User, UserError,
    ValidatedRegistration, is_username_char,
};
