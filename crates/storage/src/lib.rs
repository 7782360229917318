#![forbid(unsafe_code)]

pub mod credentials;
pub mod question_bank;
pub mod question_file;
pub mod repository;
pub mod sqlite;

pub use question_bank::{FsQuestionBank, InMemoryQuestionBank, QuestionBank, QuestionKey};
pub use repository::{InMemoryRepository, Storage, StorageError};
