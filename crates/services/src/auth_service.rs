use std::sync::Arc;

use quiz_core::model::{RegistrationDraft, User, UserId};
use storage::credentials::{hash_password, verify_password};
use storage::repository::{NewUserRecord, StorageError, UserRepository};
use tracing::{info, warn};

use crate::Clock;
use crate::error::AuthError;

/// Registration and login against the user store.
#[derive(Clone)]
pub struct AuthService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
}

impl AuthService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserRepository>) -> Self {
        Self { clock, users }
    }

    /// Validate the form, hash the password and create the account with 0 XP.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::User` for form validation failures,
    /// `AuthError::DuplicateUsername` if the name is taken, or
    /// `AuthError::Storage` if hashing or persistence fails.
    pub async fn register(&self, draft: RegistrationDraft) -> Result<User, AuthError> {
        let form = draft.validate()?;
        let password = form.password;
        let password_hash =
            tokio::task::spawn_blocking(move || hash_password(&password)).await??;
        let record = NewUserRecord {
            password_hash,
            username: form.username,
            xp: 0,
            grade_class: form.grade_class,
            religion: form.religion,
            created_at: self.clock.now(),
        };

        let username = record.username.clone();
        match self.users.insert_user(record).await {
            Ok(user) => {
                info!(username = %user.username, class = %user.grade_class, "user registered");
                Ok(user)
            }
            Err(StorageError::Conflict) => Err(AuthError::DuplicateUsername(username)),
            Err(e) => Err(e.into()),
        }
    }

    /// Check credentials. Unknown users and wrong passwords both yield `None`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the lookup fails, or
    /// `AuthError::HashTask` if the verification task dies.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        let Some(stored) = self.users.find_credentials(username.trim()).await? else {
            return Ok(None);
        };
        let password = password.to_owned();
        let hash = stored.password_hash;
        let matches =
            tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?;
        if matches {
            Ok(Some(stored.user))
        } else {
            Ok(None)
        }
    }

    /// Like `authenticate`, but a failed check is an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on a failed check.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        match self.authenticate(username, password).await? {
            Some(user) => {
                info!(username = %user.username, level = user.level(), "user logged in");
                Ok(user)
            }
            None => {
                warn!(username = %username.trim(), "login rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Reload a user, e.g. to pick up XP written after an exam.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the user is missing or the lookup fails.
    pub async fn refresh(&self, id: UserId) -> Result<User, AuthError> {
        Ok(self.users.get_user(id).await?)
    }

    /// Overwrite the stored total XP of `username`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the user is missing or the write fails.
    pub async fn update_xp(&self, username: &str, xp: u64) -> Result<(), AuthError> {
        Ok(self.users.update_xp(username, xp).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{GradeClass, Religion, UserError};
    use quiz_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn service() -> AuthService {
        AuthService::new(fixed_clock(), Arc::new(InMemoryRepository::new()))
    }

    fn draft(username: &str, password: &str, confirm: &str) -> RegistrationDraft {
        RegistrationDraft {
            username: username.into(),
            password: password.into(),
            confirm_password: confirm.into(),
            grade_class: GradeClass::new(12, 3).unwrap(),
            religion: Religion::Christian,
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let auth = service();
        let user = auth
            .register(draft("  rania ", "secret1", "secret1"))
            .await
            .unwrap();
        assert_eq!(user.username, "rania");
        assert_eq!(user.xp, 0);

        let logged_in = auth.login("rania", "secret1").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn wrong_password_or_unknown_user_is_rejected() {
        let auth = service();
        auth.register(draft("rania", "secret1", "secret1"))
            .await
            .unwrap();

        assert!(auth.authenticate("rania", "secret2").await.unwrap().is_none());
        assert!(auth.authenticate("nobody", "secret1").await.unwrap().is_none());
        assert!(matches!(
            auth.login("rania", "nope").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn duplicate_username_is_reported() {
        let auth = service();
        auth.register(draft("rania", "secret1", "secret1"))
            .await
            .unwrap();
        let err = auth
            .register(draft("rania", "other12", "other12"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUsername(name) if name == "rania"));
    }

    #[tokio::test]
    async fn concurrent_registrations_hash_off_the_runtime() {
        let auth = service();
        let (a, b) = tokio::join!(
            auth.register(draft("rania", "secret1", "secret1")),
            auth.register(draft("bagas", "secret2", "secret2")),
        );
        assert_ne!(a.unwrap().id, b.unwrap().id);
        assert!(auth.authenticate("bagas", "secret2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn path_like_usernames_are_rejected() {
        let auth = service();
        for bad in ["ab/cd", "../../escaped"] {
            let err = auth.register(draft(bad, "secret1", "secret1")).await.unwrap_err();
            assert!(matches!(
                err,
                AuthError::User(UserError::UsernameInvalidCharacters)
            ));
        }
    }

    #[tokio::test]
    async fn form_rules_apply_before_storage() {
        let auth = service();
        let err = auth.register(draft("abc", "secret1", "secret1")).await.unwrap_err();
        assert!(matches!(err, AuthError::User(UserError::UsernameTooShort)));
        let err = auth.register(draft("abcd", "12345", "12345")).await.unwrap_err();
        assert!(matches!(err, AuthError::User(UserError::PasswordTooShort)));
        let err = auth.register(draft("abcd", "123456", "654321")).await.unwrap_err();
        assert!(matches!(err, AuthError::User(UserError::PasswordMismatch)));
    }
}
