use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{ExamResult, ExamResultId, GradeClass, Religion, User, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("question source error: {0}")]
    Source(String),
}

/// Fields for a user row that does not exist yet.
///
/// `password_hash` is a PHC string, never the raw password.
#[derive(Clone)]
pub struct NewUserRecord {
    pub username: String,
    pub password_hash: String,
    pub xp: u64,
    pub grade_class: GradeClass,
    pub religion: Religion,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for NewUserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUserRecord")
            .field("username", &self.username)
            .field("xp", &self.xp)
            .field("grade_class", &self.grade_class)
            .field("religion", &self.religion)
            .finish_non_exhaustive()
    }
}

/// A user together with the stored password hash, for credential checks.
#[derive(Clone)]
pub struct StoredCredentials {
    pub user: User,
    pub password_hash: String,
}

/// A persisted exam result with its row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamResultRow {
    pub id: ExamResultId,
    pub result: ExamResult,
}

impl ExamResultRow {
    #[must_use]
    pub fn new(id: ExamResultId, result: ExamResult) -> Self {
        Self { id, result }
    }
}

/// Repository contract for registered users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the username is taken.
    async fn insert_user(&self, record: NewUserRecord) -> Result<User, StorageError>;

    /// Fetch a user by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_user(&self, id: UserId) -> Result<User, StorageError>;

    /// Fetch a user and the password hash by username.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures. A missing user is `Ok(None)`.
    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<StoredCredentials>, StorageError>;

    /// Overwrite the total XP of a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no user has that name.
    async fn update_xp(&self, username: &str, xp: u64) -> Result<(), StorageError>;
}

/// Repository contract for finished exam results.
#[async_trait]
pub trait ExamResultRepository: Send + Sync {
    /// Append a finished exam and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, result: &ExamResult) -> Result<ExamResultId, StorageError>;

    /// Fetch one result by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: ExamResultId) -> Result<ExamResult, StorageError>;

    /// Most recent results for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_results(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<ExamResultRow>, StorageError>;
}

#[derive(Clone)]
struct UserEntry {
    user: User,
    password_hash: String,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    users: Arc<Mutex<Vec<UserEntry>>>,
    results: Arc<Mutex<HashMap<ExamResultId, ExamResult>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(&self, record: NewUserRecord) -> Result<User, StorageError> {
        let mut guard = self.users.lock().map_err(poisoned)?;
        if guard.iter().any(|e| e.user.username == record.username) {
            return Err(StorageError::Conflict);
        }
        let next_id = u64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("user id overflow".into()))?
            + 1;
        let user = User {
            id: UserId::new(next_id),
            username: record.username,
            xp: record.xp,
            grade_class: record.grade_class,
            religion: record.religion,
            created_at: record.created_at,
        };
        guard.push(UserEntry {
            user: user.clone(),
            password_hash: record.password_hash,
        });
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<User, StorageError> {
        let guard = self.users.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|e| e.user.id == id)
            .map(|e| e.user.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<StoredCredentials>, StorageError> {
        let guard = self.users.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .find(|e| e.user.username == username)
            .map(|e| StoredCredentials {
                user: e.user.clone(),
                password_hash: e.password_hash.clone(),
            }))
    }

    async fn update_xp(&self, username: &str, xp: u64) -> Result<(), StorageError> {
        let mut guard = self.users.lock().map_err(poisoned)?;
        let entry = guard
            .iter_mut()
            .find(|e| e.user.username == username)
            .ok_or(StorageError::NotFound)?;
        entry.user.xp = xp;
        Ok(())
    }
}

#[async_trait]
impl ExamResultRepository for InMemoryRepository {
    async fn append_result(&self, result: &ExamResult) -> Result<ExamResultId, StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        let next = u64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("result id overflow".into()))?
            + 1;
        let id = ExamResultId::new(next);
        guard.insert(id, result.clone());
        Ok(id)
    }

    async fn get_result(&self, id: ExamResultId) -> Result<ExamResult, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_results(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<ExamResultRow>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let mut rows: Vec<ExamResultRow> = guard
            .iter()
            .filter(|(_, r)| r.user_id() == user_id)
            .map(|(id, r)| ExamResultRow::new(*id, r.clone()))
            .collect();
        rows.sort_by(|a, b| {
            b.result
                .completed_at()
                .cmp(&a.result.completed_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub results: Arc<dyn ExamResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let users: Arc<dyn UserRepository> = Arc::new(repo.clone());
        let results: Arc<dyn ExamResultRepository> = Arc::new(repo);
        Self { users, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{ExamResultDraft, FinishReason, Subject};
    use quiz_core::time::fixed_now;

    fn record(username: &str) -> NewUserRecord {
        NewUserRecord {
            username: username.into(),
            password_hash: "$argon2id$placeholder".into(),
            xp: 0,
            grade_class: GradeClass::new(10, 2).unwrap(),
            religion: Religion::Christian,
            created_at: fixed_now(),
        }
    }

    fn result(user_id: UserId, minutes_later: i64) -> ExamResult {
        ExamResult::from_persisted(ExamResultDraft {
            user_id,
            subject: Subject::Biology,
            score: 12,
            question_count: 20,
            xp_earned: 1200,
            time_remaining_secs: 600,
            duration_secs: 5400,
            powerups_used: 0,
            finish_reason: FinishReason::Completed,
            started_at: fixed_now(),
            completed_at: fixed_now() + chrono::Duration::minutes(minutes_later),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let repo = InMemoryRepository::new();
        repo.insert_user(record("alice")).await.unwrap();
        let err = repo.insert_user(record("alice")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn xp_update_is_visible() {
        let repo = InMemoryRepository::new();
        let user = repo.insert_user(record("alice")).await.unwrap();
        repo.update_xp("alice", 400).await.unwrap();
        assert_eq!(repo.get_user(user.id).await.unwrap().xp, 400);
        assert!(matches!(
            repo.update_xp("nobody", 1).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn results_listed_newest_first() {
        let repo = InMemoryRepository::new();
        let user = repo.insert_user(record("alice")).await.unwrap();
        let first = repo.append_result(&result(user.id, 10)).await.unwrap();
        let second = repo.append_result(&result(user.id, 20)).await.unwrap();
        repo.append_result(&result(UserId::new(99), 30)).await.unwrap();

        let rows = repo.list_results(user.id, 10).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second, first]);
    }
}
