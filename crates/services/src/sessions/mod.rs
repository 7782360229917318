mod progress;
mod view;
mod workflow;

// Public API of the exam subsystem.
pub use crate::error::ExamError;
pub use progress::ExamProgress;
pub use view::{ExamView, HistoryItem, NavStatus, OptionView, QuestionView, ResultView};
pub use workflow::{ExamService, FinishedExam};
