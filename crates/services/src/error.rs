//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{Subject, UserError};
use quiz_core::session::SessionError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error("username {0} is already taken")]
    DuplicateUsername(String),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("password hashing task failed: {0}")]
    HashTask(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ExamService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamError {
    #[error("not enough questions for {subject}: {available} available, {required} required")]
    InsufficientQuestions {
        subject: Subject,
        available: usize,
        required: usize,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while writing exam reports.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportError {
    #[error("failed to write report {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Report(#[from] ReportError),
}
