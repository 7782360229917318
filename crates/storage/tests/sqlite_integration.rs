use chrono::Duration;
use quiz_core::model::{
    ExamResult, ExamResultDraft, FinishReason, GradeClass, Religion, Subject, UserId,
};
use quiz_core::time::fixed_now;
use storage::credentials::{hash_password, verify_password};
use storage::repository::{
    ExamResultRepository, NewUserRecord, Storage, StorageError, UserRepository,
};
use storage::sqlite::SqliteRepository;

fn new_user(username: &str) -> NewUserRecord {
    NewUserRecord {
        username: username.into(),
        password_hash: hash_password("password123").unwrap(),
        xp: 250,
        grade_class: GradeClass::new(11, 5).unwrap(),
        religion: Religion::Islam,
        created_at: fixed_now(),
    }
}

fn result_for(user_id: UserId, score: u32, minutes_later: i64) -> ExamResult {
    ExamResult::from_persisted(ExamResultDraft {
        user_id,
        subject: Subject::Religion,
        score,
        question_count: 20,
        xp_earned: u64::from(score) * 100,
        time_remaining_secs: 1200,
        duration_secs: 5400,
        powerups_used: 2,
        finish_reason: FinishReason::TimedOut,
        started_at: fixed_now(),
        completed_at: fixed_now() + Duration::minutes(minutes_later),
    })
    .unwrap()
}

#[tokio::test]
async fn sqlite_users_roundtrip_and_reject_duplicates() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_users?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let user = repo.insert_user(new_user("victus")).await.unwrap();
    assert_eq!(user.grade_class.to_string(), "11.5");

    let fetched = repo.get_user(user.id).await.unwrap();
    assert_eq!(fetched, user);
    assert_eq!(fetched.level(), 2);

    let creds = repo.find_credentials("victus").await.unwrap().unwrap();
    assert!(verify_password("password123", &creds.password_hash));
    assert!(repo.find_credentials("nobody").await.unwrap().is_none());

    let err = repo.insert_user(new_user("victus")).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_update_xp_persists() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_xp?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let user = repo.insert_user(new_user("alya")).await.unwrap();
    repo.update_xp("alya", 2250).await.unwrap();
    assert_eq!(repo.get_user(user.id).await.unwrap().xp, 2250);

    let err = repo.update_xp("ghost", 10).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_results_listed_newest_first() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_results?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let user = repo.insert_user(new_user("budi")).await.unwrap();
    let older = repo
        .append_result(&result_for(user.id, 12, 30))
        .await
        .unwrap();
    let newer = repo
        .append_result(&result_for(user.id, 18, 90))
        .await
        .unwrap();

    let rows = repo.list_results(user.id, 10).await.unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![newer, older]);
    assert_eq!(rows[0].result.score(), 18);
    assert_eq!(rows[0].result.finish_reason(), FinishReason::TimedOut);
    assert_eq!(rows[0].result.subject(), Subject::Religion);

    let limited = repo.list_results(user.id, 1).await.unwrap();
    assert_eq!(limited.len(), 1);

    let fetched = repo.get_result(older).await.unwrap();
    assert_eq!(fetched, result_for(user.id, 12, 30));
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn storage_sqlite_wires_both_repositories() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .expect("storage");

    let user = storage.users.insert_user(new_user("citra")).await.unwrap();
    storage
        .results
        .append_result(&result_for(user.id, 20, 5))
        .await
        .unwrap();
    assert_eq!(storage.results.list_results(user.id, 5).await.unwrap().len(), 1);
}
