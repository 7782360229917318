use quiz_core::model::{
    ExamResult, ExamResultDraft, ExamResultId, FinishReason, GradeClass, Religion, Subject, User,
    UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{ExamResultRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn result_id_from_i64(v: i64) -> Result<ExamResultId, StorageError> {
    Ok(ExamResultId::new(i64_to_u64("result_id", v)?))
}

/// True when `e` is a UNIQUE constraint failure.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    let grade_class: GradeClass = row
        .try_get::<String, _>("grade_class")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let religion: Religion = row
        .try_get::<String, _>("religion")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    Ok(User {
        id: user_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        username: row.try_get("username").map_err(ser)?,
        xp: i64_to_u64("xp", row.try_get::<i64, _>("xp").map_err(ser)?)?,
        grade_class,
        religion,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_result_row(row: &SqliteRow) -> Result<ExamResultRow, StorageError> {
    let subject: Subject = row
        .try_get::<String, _>("subject")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let finish_reason: FinishReason = row
        .try_get::<String, _>("finish_reason")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let int = |field: &'static str| -> Result<i64, StorageError> {
        row.try_get::<i64, _>(field).map_err(ser)
    };

    let result = ExamResult::from_persisted(ExamResultDraft {
        user_id: user_id_from_i64(int("user_id")?)?,
        subject,
        score: i64_to_u32("score", int("score")?)?,
        question_count: i64_to_u32("question_count", int("question_count")?)?,
        xp_earned: i64_to_u64("xp_earned", int("xp_earned")?)?,
        time_remaining_secs: i64_to_u32("time_remaining_secs", int("time_remaining_secs")?)?,
        duration_secs: i64_to_u32("duration_secs", int("duration_secs")?)?,
        powerups_used: i64_to_u32("powerups_used", int("powerups_used")?)?,
        finish_reason,
        started_at: row.try_get("started_at").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
    .map_err(ser)?;

    Ok(ExamResultRow::new(
        result_id_from_i64(int("id")?)?,
        result,
    ))
}
