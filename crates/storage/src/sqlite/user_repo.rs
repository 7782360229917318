use quiz_core::model::{User, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, is_unique_violation, map_user_row, ser, u64_to_i64, user_id_from_i64};
use crate::repository::{NewUserRecord, StorageError, StoredCredentials, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_user(&self, record: NewUserRecord) -> Result<User, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO users (username, password_hash, xp, grade_class, religion, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(&record.username)
        .bind(&record.password_hash)
        .bind(u64_to_i64("xp", record.xp)?)
        .bind(record.grade_class.to_string())
        .bind(record.religion.key())
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                conn(e)
            }
        })?;

        Ok(User {
            id: user_id_from_i64(res.last_insert_rowid())?,
            username: record.username,
            xp: record.xp,
            grade_class: record.grade_class,
            religion: record.religion,
            created_at: record.created_at,
        })
    }

    async fn get_user(&self, id: UserId) -> Result<User, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, username, xp, grade_class, religion, created_at
            FROM users WHERE id = ?1
            ",
        )
        .bind(u64_to_i64("user_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_user_row(&row)
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<StoredCredentials>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, username, password_hash, xp, grade_class, religion, created_at
            FROM users WHERE username = ?1
            ",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => Ok(Some(StoredCredentials {
                user: map_user_row(&row)?,
                password_hash: row.try_get("password_hash").map_err(ser)?,
            })),
            None => Ok(None),
        }
    }

    async fn update_xp(&self, username: &str, xp: u64) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE users SET xp = ?1 WHERE username = ?2")
            .bind(u64_to_i64("xp", xp)?)
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
