use quiz_core::session::ExamSession;

/// Aggregated view of exam progress, useful for a progress bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamProgress {
    pub total: usize,
    /// 1-based position of the question on screen.
    pub position: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_finished: bool,
}

impl ExamProgress {
    #[must_use]
    pub fn of(session: &ExamSession) -> Self {
        let total = session.question_count();
        let answered = session.answered_count();
        Self {
            total,
            position: session.current_index() + 1,
            answered,
            remaining: total - answered,
            is_finished: session.is_finished(),
        }
    }
}
