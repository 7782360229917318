//! Printable exam reports.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use quiz_core::model::{ExamResult, GradeClass, Religion, Subject, User, is_username_char};
use quiz_core::progression::{PASSING_PERCENT, Remark};
use tracing::info;

use crate::error::ReportError;

/// Everything printed on one exam report.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamReport {
    pub username: String,
    pub grade_class: GradeClass,
    pub religion: Religion,
    pub subject: Subject,
    pub score: u32,
    pub question_count: u32,
    pub percent: f64,
    pub minutes_used: u32,
    pub passing_percent: f64,
    pub passed: bool,
    pub remark: Remark,
    pub printed_at: DateTime<Utc>,
}

impl ExamReport {
    #[must_use]
    pub fn new(user: &User, result: &ExamResult, printed_at: DateTime<Utc>) -> Self {
        Self {
            username: user.username.clone(),
            grade_class: user.grade_class,
            religion: user.religion,
            subject: result.subject(),
            score: result.score(),
            question_count: result.question_count(),
            percent: result.percent(),
            minutes_used: result.time_used_secs() / 60,
            passing_percent: PASSING_PERCENT,
            passed: result.passed(),
            remark: result.remark(),
            printed_at,
        }
    }

    /// `result_<username>_<subject>_<YYYYmmdd_HHMMSS>.txt`
    ///
    /// Characters a username may not contain are replaced with `_`, so the
    /// name never leaves the report directory.
    #[must_use]
    pub fn file_name(&self) -> String {
        let username: String = self
            .username
            .chars()
            .map(|c| if is_username_char(c) { c } else { '_' })
            .collect();
        format!(
            "result_{}_{}_{}.txt",
            username,
            self.subject.key(),
            self.printed_at.format("%Y%m%d_%H%M%S")
        )
    }

    #[must_use]
    pub fn render(&self) -> String {
        let status = if self.passed { "PASSED" } else { "NOT PASSED" };
        let mut out = String::new();
        let _ = writeln!(out, "EXAM RESULT REPORT");
        let _ = writeln!(out, "{}", "=".repeat(40));
        let _ = writeln!(out);
        let _ = writeln!(out, "PARTICIPANT");
        let _ = writeln!(out, "  Name      : {}", self.username);
        let _ = writeln!(out, "  Class     : {}", self.grade_class);
        let _ = writeln!(out, "  Religion  : {}", self.religion);
        let _ = writeln!(out);
        let _ = writeln!(out, "EXAM");
        let _ = writeln!(out, "  Subject   : {}", self.subject);
        let _ = writeln!(
            out,
            "  Score     : {} / {} ({:.1}%)",
            self.score, self.question_count, self.percent
        );
        let _ = writeln!(out, "  Time used : {} minutes", self.minutes_used);
        let _ = writeln!(out);
        let _ = writeln!(out, "GRADE");
        let _ = writeln!(out, "  Final mark: {:.1}", self.percent);
        let _ = writeln!(out, "  KKM       : {:.0}", self.passing_percent);
        let _ = writeln!(out, "  Status    : {status}");
        let _ = writeln!(out);
        let _ = writeln!(out, "NOTE");
        let _ = writeln!(out, "  {}", self.remark.report_note());
        let _ = writeln!(out);
        let _ = writeln!(out, "Printed on: {}", self.printed_at.format("%d %B %Y"));
        out
    }
}

/// Writes reports as text files into one directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `report`, creating the directory if needed, and return its path.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Io` if the directory or file cannot be written.
    pub async fn write(&self, report: &ExamReport) -> Result<PathBuf, ReportError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ReportError::Io {
                path: self.dir.display().to_string(),
                source,
            })?;
        let path = self.dir.join(report.file_name());
        tokio::fs::write(&path, report.render())
            .await
            .map_err(|source| ReportError::Io {
                path: path.display().to_string(),
                source,
            })?;
        info!(path = %path.display(), "report written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{ExamResultDraft, FinishReason, UserId};
    use quiz_core::time::fixed_now;

    fn user() -> User {
        User {
            id: UserId::new(1),
            username: "victus".into(),
            xp: 250,
            grade_class: GradeClass::new(11, 5).unwrap(),
            religion: Religion::Islam,
            created_at: fixed_now(),
        }
    }

    fn result(score: u32, time_remaining_secs: u32) -> ExamResult {
        ExamResult::from_persisted(ExamResultDraft {
            user_id: UserId::new(1),
            subject: Subject::AdvancedMathematics,
            score,
            question_count: 20,
            xp_earned: u64::from(score) * 100,
            time_remaining_secs,
            duration_secs: 5400,
            powerups_used: 0,
            finish_reason: FinishReason::Completed,
            started_at: fixed_now(),
            completed_at: fixed_now(),
        })
        .unwrap()
    }

    #[test]
    fn passing_report_contents() {
        let report = ExamReport::new(&user(), &result(15, 3000), fixed_now());
        assert!(report.passed);
        assert_eq!(report.minutes_used, 40);
        assert_eq!(report.remark, Remark::Good);

        let text = report.render();
        assert!(text.contains("Name      : victus"));
        assert!(text.contains("Class     : 11.5"));
        assert!(text.contains("Score     : 15 / 20 (75.0%)"));
        assert!(text.contains("Status    : PASSED"));
        assert!(text.contains("KKM       : 75"));
        assert!(text.contains(Remark::Good.report_note()));
    }

    #[test]
    fn failing_report_status() {
        let report = ExamReport::new(&user(), &result(14, 0), fixed_now());
        assert!(!report.passed);
        assert_eq!(report.minutes_used, 90);
        assert!(report.render().contains("Status    : NOT PASSED"));
    }

    #[test]
    fn file_name_embeds_user_subject_and_timestamp() {
        let report = ExamReport::new(&user(), &result(20, 100), fixed_now());
        assert_eq!(
            report.file_name(),
            "result_victus_matematika_lanjut_20231114_221320.txt"
        );
    }

    #[tokio::test]
    async fn unsafe_username_stays_inside_report_dir() {
        let dir = std::env::temp_dir().join(format!("quiz-reports-esc-{}", std::process::id()));
        let writer = ReportWriter::new(&dir);
        let mut legacy = user();
        legacy.username = "../../ab/cd".into();
        let report = ExamReport::new(&legacy, &result(20, 100), fixed_now());

        assert_eq!(
            report.file_name(),
            "result_______ab_cd_matematika_lanjut_20231114_221320.txt"
        );
        let path = writer.write(&report).await.unwrap();
        assert_eq!(path.parent(), Some(dir.as_path()));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn writer_creates_directory() {
        let dir = std::env::temp_dir().join(format!("quiz-reports-{}", std::process::id()));
        let writer = ReportWriter::new(&dir);
        let report = ExamReport::new(&user(), &result(18, 600), fixed_now());

        let path = writer.write(&report).await.unwrap();
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, report.render());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
