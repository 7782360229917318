use async_trait::async_trait;
use quiz_core::model::{GradeClass, Question, Religion, Subject};
use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::question_file;
use crate::repository::StorageError;

/// Identifies one question pool: a grade level and a subject file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuestionKey {
    pub grade: u8,
    pub stem: String,
}

impl QuestionKey {
    #[must_use]
    pub fn new(grade: u8, stem: impl Into<String>) -> Self {
        Self {
            grade,
            stem: stem.into(),
        }
    }

    /// Pool a participant sits for `subject`. Religious education resolves
    /// to the participant's own religion.
    #[must_use]
    pub fn for_exam(grade_class: GradeClass, subject: Subject, religion: Religion) -> Self {
        Self::new(grade_class.grade(), subject.file_stem(religion))
    }

    /// Location relative to a question root: `<grade>/<stem>.txt`.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.grade.to_string()).join(format!("{}.txt", self.stem))
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.grade, self.stem)
    }
}

/// Source of question pools.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Load every valid question in the pool. A missing pool is empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Source` when the pool exists but cannot be read.
    async fn load_questions(&self, key: &QuestionKey) -> Result<Vec<Question>, StorageError>;
}

/// Question files on disk under `<root>/<grade>/<stem>.txt`.
#[derive(Debug, Clone)]
pub struct FsQuestionBank {
    root: PathBuf,
}

impl FsQuestionBank {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, key: &QuestionKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Write `questions` to the pool file, creating directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Source` on I/O failures.
    pub async fn write_questions(
        &self,
        key: &QuestionKey,
        questions: &[Question],
    ) -> Result<PathBuf, StorageError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Source(format!("{}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, question_file::render(questions))
            .await
            .map_err(|e| StorageError::Source(format!("{}: {e}", path.display())))?;
        Ok(path)
    }
}

#[async_trait]
impl QuestionBank for FsQuestionBank {
    async fn load_questions(&self, key: &QuestionKey) -> Result<Vec<Question>, StorageError> {
        let path = self.path_for(key);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "question file not found");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StorageError::Source(format!("{}: {e}", path.display()))),
        };

        let parsed = question_file::parse(&content);
        for skipped in &parsed.skipped {
            warn!(
                path = %path.display(),
                record = skipped.position,
                reason = %skipped.reason,
                "skipping malformed question"
            );
        }
        debug!(pool = %key, loaded = parsed.questions.len(), "question pool loaded");
        Ok(parsed.questions)
    }
}

/// Question pools held in memory, for tests and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryQuestionBank {
    pools: Arc<Mutex<HashMap<QuestionKey, Vec<Question>>>>,
}

impl InMemoryQuestionBank {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pool stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert(&self, key: QuestionKey, questions: Vec<Question>) -> Result<(), StorageError> {
        let mut guard = self
            .pools
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key, questions);
        Ok(())
    }
}

#[async_trait]
impl QuestionBank for InMemoryQuestionBank {
    async fn load_questions(&self, key: &QuestionKey) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .pools
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::OptionIndex;

    fn question(n: usize) -> Question {
        Question::new(
            format!("Question {n}"),
            ["w".into(), "x".into(), "y".into(), "z".into()],
            OptionIndex::C,
            None,
        )
        .unwrap()
    }

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("quiz-bank-{name}-{}", std::process::id()))
    }

    #[test]
    fn key_resolves_religion_file() {
        let class = GradeClass::new(11, 5).unwrap();
        let key = QuestionKey::for_exam(class, Subject::Religion, Religion::Christian);
        assert_eq!(key.relative_path(), PathBuf::from("11").join("agama_kristen.txt"));

        let key = QuestionKey::for_exam(class, Subject::Mathematics, Religion::Christian);
        assert_eq!(key.to_string(), "11/matematika");
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_pool() {
        let bank = FsQuestionBank::new(scratch_dir("missing"));
        let loaded = bank
            .load_questions(&QuestionKey::new(12, "fisika"))
            .await
            .unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn written_pool_loads_back() {
        let root = scratch_dir("written");
        let bank = FsQuestionBank::new(&root);
        let key = QuestionKey::new(10, "kimia");
        let questions: Vec<_> = (0..3).map(question).collect();

        bank.write_questions(&key, &questions).await.unwrap();
        let loaded = bank.load_questions(&key).await.unwrap();
        assert_eq!(loaded, questions);

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn in_memory_bank_returns_inserted_pool() {
        let bank = InMemoryQuestionBank::new();
        let key = QuestionKey::new(10, "sejarah");
        bank.insert(key.clone(), vec![question(1)]).unwrap();

        assert_eq!(bank.load_questions(&key).await.unwrap().len(), 1);
        assert!(
            bank.load_questions(&QuestionKey::new(11, "sejarah"))
                .await
                .unwrap()
                .is_empty()
        );
    }
}
