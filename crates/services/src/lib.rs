#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth_service;
pub mod error;
pub mod report;
pub mod sessions;

pub use quiz_core::Clock;

pub use app_services::{AppServices, CompletedExam};
pub use auth_service::AuthService;
pub use error::{AppServicesError, AuthError, ExamError, ReportError};
pub use report::{ExamReport, ReportWriter};
pub use sessions::{
    ExamProgress, ExamService, ExamView, FinishedExam, HistoryItem, NavStatus, OptionView,
    QuestionView, ResultView,
};
