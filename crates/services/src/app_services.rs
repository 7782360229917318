use std::path::PathBuf;
use std::sync::Arc;

use quiz_core::model::User;
use quiz_core::session::ExamSession;
use storage::repository::Storage;
use storage::{FsQuestionBank, QuestionBank};

use crate::Clock;
use crate::auth_service::AuthService;
use crate::error::AppServicesError;
use crate::report::{ExamReport, ReportWriter};
use crate::sessions::{ExamService, FinishedExam};

/// A persisted exam together with its written report.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedExam {
    pub finished: FinishedExam,
    pub report_path: PathBuf,
}

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    auth: Arc<AuthService>,
    exams: Arc<ExamService>,
    reports: Arc<ReportWriter>,
}

impl AppServices {
    /// Build services backed by `SQLite` and question files on disk.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        questions_dir: impl Into<PathBuf>,
        reports_dir: impl Into<PathBuf>,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let bank: Arc<dyn QuestionBank> = Arc::new(FsQuestionBank::new(questions_dir));
        Ok(Self::from_parts(storage, bank, ReportWriter::new(reports_dir), clock))
    }

    #[must_use]
    pub fn from_parts(
        storage: Storage,
        bank: Arc<dyn QuestionBank>,
        reports: ReportWriter,
        clock: Clock,
    ) -> Self {
        let auth = Arc::new(AuthService::new(clock, Arc::clone(&storage.users)));
        let exams = Arc::new(ExamService::new(
            clock,
            bank,
            Arc::clone(&storage.users),
            Arc::clone(&storage.results),
        ));
        Self {
            clock,
            auth,
            exams,
            reports: Arc::new(reports),
        }
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn exams(&self) -> Arc<ExamService> {
        Arc::clone(&self.exams)
    }

    #[must_use]
    pub fn reports(&self) -> Arc<ReportWriter> {
        Arc::clone(&self.reports)
    }

    /// Persist a finished exam and write its report. Consumes the session.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Exam` if persisting fails and
    /// `AppServicesError::Report` if the report cannot be written; XP is
    /// already stored in the latter case.
    pub async fn complete_exam(
        &self,
        user: &User,
        session: ExamSession,
    ) -> Result<CompletedExam, AppServicesError> {
        let finished = self.exams.finish_exam(user, session).await?;
        let report = ExamReport::new(&finished.user, &finished.result, self.clock.now());
        let report_path = self.reports.write(&report).await?;
        Ok(CompletedExam {
            finished,
            report_path,
        })
    }
}
