use std::sync::Arc;

use quiz_core::model::{ExamResult, ExamResultId, PowerupKind, Question, Subject, User, UserId};
use quiz_core::session::{ExamRules, ExamSession, PowerupEffect, SessionError, SessionState};
use rand::Rng;
use storage::{QuestionBank, QuestionKey};
use storage::repository::{ExamResultRepository, UserRepository};
use tracing::{debug, info, warn};

use super::view::HistoryItem;
use crate::Clock;
use crate::error::ExamError;

/// Outcome of a finished exam after persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedExam {
    pub result_id: ExamResultId,
    pub result: ExamResult,
    /// The participant with the new XP total.
    pub user: User,
    pub previous_level: u32,
}

impl FinishedExam {
    #[must_use]
    pub fn leveled_up(&self) -> bool {
        self.user.level() > self.previous_level
    }
}

/// Orchestrates exam start, the in-exam actions that need randomness or
/// logging, and persisting finished exams.
#[derive(Clone)]
pub struct ExamService {
    clock: Clock,
    rules: ExamRules,
    bank: Arc<dyn QuestionBank>,
    users: Arc<dyn UserRepository>,
    results: Arc<dyn ExamResultRepository>,
}

impl ExamService {
    #[must_use]
    pub fn new(
        clock: Clock,
        bank: Arc<dyn QuestionBank>,
        users: Arc<dyn UserRepository>,
        results: Arc<dyn ExamResultRepository>,
    ) -> Self {
        Self {
            clock,
            rules: ExamRules::standard(),
            bank,
            users,
            results,
        }
    }

    #[must_use]
    pub fn with_rules(mut self, rules: ExamRules) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn rules(&self) -> ExamRules {
        self.rules
    }

    /// Load the participant's pool for `subject` and start an exam.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InsufficientQuestions` if the pool is too small
    /// (a missing question file counts as an empty pool), or
    /// `ExamError::Storage` if the pool cannot be read.
    pub async fn start_exam(
        &self,
        user: &User,
        subject: Subject,
    ) -> Result<ExamSession, ExamError> {
        let pool = self.load_pool(user, subject).await?;
        let mut rng = rand::rng();
        self.start_from_pool(subject, pool, &mut rng)
    }

    /// Same as `start_exam`, with a caller-provided random source.
    ///
    /// # Errors
    ///
    /// See `start_exam`.
    pub async fn start_exam_with_rng<R: Rng + ?Sized + Send>(
        &self,
        user: &User,
        subject: Subject,
        rng: &mut R,
    ) -> Result<ExamSession, ExamError> {
        let pool = self.load_pool(user, subject).await?;
        self.start_from_pool(subject, pool, rng)
    }

    async fn load_pool(
        &self,
        user: &User,
        subject: Subject,
    ) -> Result<Vec<Question>, ExamError> {
        let key = QuestionKey::for_exam(user.grade_class, subject, user.religion);
        let pool = self.bank.load_questions(&key).await?;
        debug!(pool = %key, available = pool.len(), "question pool ready");
        Ok(pool)
    }

    fn start_from_pool<R: Rng + ?Sized>(
        &self,
        subject: Subject,
        pool: Vec<Question>,
        rng: &mut R,
    ) -> Result<ExamSession, ExamError> {
        let session = ExamSession::start(subject, pool, self.rules, rng, self.clock.now())
            .map_err(|e| match e {
                SessionError::InsufficientQuestions {
                    available,
                    required,
                } => {
                    warn!(%subject, available, required, "not enough questions to start exam");
                    ExamError::InsufficientQuestions {
                        subject,
                        available,
                        required,
                    }
                }
                other => ExamError::Session(other),
            })?;
        info!(%subject, questions = session.question_count(), "exam started");
        Ok(session)
    }

    /// Buy a power-up for the current question of `session`.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Session` when the purchase is rejected; nothing is charged.
    pub fn use_powerup(
        &self,
        session: &mut ExamSession,
        kind: PowerupKind,
    ) -> Result<Option<PowerupEffect>, ExamError> {
        let mut rng = rand::rng();
        self.use_powerup_with_rng(session, kind, &mut rng)
    }

    /// Same as `use_powerup`, with a caller-provided random source.
    ///
    /// # Errors
    ///
    /// See `use_powerup`.
    pub fn use_powerup_with_rng<R: Rng + ?Sized>(
        &self,
        session: &mut ExamSession,
        kind: PowerupKind,
        rng: &mut R,
    ) -> Result<Option<PowerupEffect>, ExamError> {
        match session.use_powerup(kind, rng) {
            Ok(effect) => {
                if effect.is_some() {
                    info!(
                        powerup = %kind,
                        question = session.current_index() + 1,
                        remaining_secs = session.time_remaining(),
                        "power-up used"
                    );
                }
                Ok(effect)
            }
            Err(e) => {
                warn!(powerup = %kind, error = %e, "power-up rejected");
                Err(e.into())
            }
        }
    }

    /// Advance the countdown by one second.
    pub fn tick(&self, session: &mut ExamSession) -> SessionState {
        let was_running = !session.is_finished();
        let state = session.tick();
        if was_running && session.is_finished() {
            debug!(subject = %session.subject(), "countdown reached zero");
        }
        state
    }

    /// Persist a finished exam: add the earned XP to the participant's total
    /// and append the result to the history.
    ///
    /// The session is consumed, so it can be persisted only once. A session
    /// that is still running is discarded along with the error.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Session` if the exam is still running, or
    /// `ExamError::Storage` if persistence fails.
    pub async fn finish_exam(
        &self,
        user: &User,
        session: ExamSession,
    ) -> Result<FinishedExam, ExamError> {
        let result = session.result(user.id, self.clock.now())?;

        let current = self.users.get_user(user.id).await?;
        let previous_level = current.level();
        let updated = current.with_xp_added(result.xp_earned());
        self.users.update_xp(&updated.username, updated.xp).await?;
        let result_id = self.results.append_result(&result).await?;

        info!(
            username = %updated.username,
            subject = %result.subject(),
            score = result.score(),
            xp_earned = result.xp_earned(),
            total_xp = updated.xp,
            reason = %result.finish_reason(),
            "exam finished"
        );

        Ok(FinishedExam {
            result_id,
            result,
            user: updated,
            previous_level,
        })
    }

    /// Drop a running exam without persisting anything.
    pub fn abandon(&self, session: ExamSession) {
        info!(
            subject = %session.subject(),
            answered = session.answered_count(),
            "exam abandoned"
        );
        drop(session);
    }

    /// Most recent finished exams of a participant, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Storage` on repository failures.
    pub async fn history(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<HistoryItem>, ExamError> {
        let rows = self.results.list_results(user_id, limit).await?;
        Ok(rows.iter().map(HistoryItem::from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{GradeClass, OptionIndex, Religion};
    use quiz_core::time::{fixed_clock, fixed_now};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use storage::InMemoryQuestionBank;
    use storage::repository::{InMemoryRepository, NewUserRecord};

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| {
                Question::new(
                    format!("Q{i}"),
                    ["a".into(), "b".into(), "c".into(), "d".into()],
                    OptionIndex::B,
                    Some(format!("hint {i}")),
                )
                .unwrap()
            })
            .collect()
    }

    async fn setup(pool_size: usize) -> (ExamService, InMemoryRepository, User) {
        let repo = InMemoryRepository::new();
        let user = repo
            .insert_user(NewUserRecord {
                username: "dewi".into(),
                password_hash: "x".into(),
                xp: 50,
                grade_class: GradeClass::new(10, 4).unwrap(),
                religion: Religion::Islam,
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        let bank = InMemoryQuestionBank::new();
        bank.insert(QuestionKey::new(10, "agama_islam"), questions(pool_size))
            .unwrap();
        let service = ExamService::new(
            fixed_clock(),
            Arc::new(bank),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        (service, repo, user)
    }

    #[tokio::test]
    async fn small_pool_reports_subject() {
        let (service, _repo, user) = setup(19).await;
        let mut rng = StdRng::seed_from_u64(1);
        let err = service
            .start_exam_with_rng(&user, Subject::Religion, &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExamError::InsufficientQuestions {
                subject: Subject::Religion,
                available: 19,
                required: 20
            }
        ));
    }

    #[tokio::test]
    async fn missing_pool_cannot_start() {
        let (service, _repo, user) = setup(20).await;
        let err = service.start_exam(&user, Subject::Physics).await.unwrap_err();
        assert!(matches!(
            err,
            ExamError::InsufficientQuestions { available: 0, .. }
        ));
    }

    #[tokio::test]
    async fn finishing_adds_xp_and_records_history() {
        let (service, repo, user) = setup(25).await;
        let mut rng = StdRng::seed_from_u64(2);
        let mut session = service
            .start_exam_with_rng(&user, Subject::Religion, &mut rng)
            .await
            .unwrap();

        while !session.is_finished() {
            session.select_answer(OptionIndex::B).unwrap();
            session.advance().unwrap();
        }

        let finished = service.finish_exam(&user, session).await.unwrap();
        assert_eq!(finished.result.score(), 20);
        assert_eq!(finished.user.xp, 2050);
        assert_eq!(finished.previous_level, 1);
        assert!(finished.leveled_up());
        assert_eq!(repo.get_user(user.id).await.unwrap().xp, 2050);

        let history = service.history(user.id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, finished.result_id);
        assert!(history[0].passed);
    }

    #[tokio::test]
    async fn unfinished_exam_is_not_persisted() {
        let (service, _repo, user) = setup(20).await;
        let session = service.start_exam(&user, Subject::Religion).await.unwrap();
        let err = service.finish_exam(&user, session).await.unwrap_err();
        assert!(matches!(err, ExamError::Session(SessionError::NotFinished)));

        assert_eq!(service.users.get_user(user.id).await.unwrap().xp, 0);
        assert!(service.history(user.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_powerup_leaves_time_untouched() {
        let (service, _repo, user) = setup(20).await;
        let mut session = service.start_exam(&user, Subject::Religion).await.unwrap();
        let mut rng = StdRng::seed_from_u64(4);

        for _ in 0..(5400 - 1199) {
            service.tick(&mut session);
        }
        assert_eq!(session.time_remaining(), 1199);

        let err = service
            .use_powerup_with_rng(&mut session, PowerupKind::Reveal, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            ExamError::Session(SessionError::InsufficientTime { .. })
        ));
        assert_eq!(session.time_remaining(), 1199);

        let effect = service
            .use_powerup_with_rng(&mut session, PowerupKind::Clue, &mut rng)
            .unwrap();
        let clue = session.current_question().clue().map(str::to_owned);
        assert_eq!(effect, Some(PowerupEffect::Clue(clue)));
        assert_eq!(session.time_remaining(), 899);
    }
}
