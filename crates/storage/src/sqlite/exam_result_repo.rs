use quiz_core::model::{ExamResult, ExamResultId, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_result_row, result_id_from_i64, u64_to_i64};
use crate::repository::{ExamResultRepository, ExamResultRow, StorageError};

#[async_trait::async_trait]
impl ExamResultRepository for SqliteRepository {
    async fn append_result(&self, result: &ExamResult) -> Result<ExamResultId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO exam_results (
                    user_id, subject, score, question_count, xp_earned,
                    time_remaining_secs, duration_secs, powerups_used,
                    finish_reason, started_at, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(u64_to_i64("user_id", result.user_id().value())?)
        .bind(result.subject().key())
        .bind(i64::from(result.score()))
        .bind(i64::from(result.question_count()))
        .bind(u64_to_i64("xp_earned", result.xp_earned())?)
        .bind(i64::from(result.time_remaining_secs()))
        .bind(i64::from(result.duration_secs()))
        .bind(i64::from(result.powerups_used()))
        .bind(result.finish_reason().key())
        .bind(result.started_at())
        .bind(result.completed_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        result_id_from_i64(res.last_insert_rowid())
    }

    async fn get_result(&self, id: ExamResultId) -> Result<ExamResult, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, user_id, subject, score, question_count, xp_earned,
                       time_remaining_secs, duration_secs, powerups_used,
                       finish_reason, started_at, completed_at
                FROM exam_results
                WHERE id = ?1
            ",
        )
        .bind(u64_to_i64("result_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        Ok(map_result_row(&row)?.result)
    }

    async fn list_results(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<ExamResultRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, subject, score, question_count, xp_earned,
                       time_remaining_secs, duration_secs, powerups_used,
                       finish_reason, started_at, completed_at
                FROM exam_results
                WHERE user_id = ?1
                ORDER BY completed_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(u64_to_i64("user_id", user_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_result_row(&row)?);
        }
        Ok(out)
    }
}
