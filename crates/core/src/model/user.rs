use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::UserId;
use crate::model::subject::{GradeClass, Religion};
use crate::progression::level_for_xp;

pub const MIN_USERNAME_LEN: usize = 4;
pub const MIN_PASSWORD_LEN: usize = 6;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("username must be at least {MIN_USERNAME_LEN} characters")]
    UsernameTooShort,

    #[error("username may only contain letters, digits, `_` and `-`")]
    UsernameInvalidCharacters,

    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    PasswordTooShort,

    #[error("passwords do not match")]
    PasswordMismatch,
}

//
// ─── REGISTRATION ──────────────────────────────────────────────────────────────
//

/// Registration form input before validation.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistrationDraft {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub grade_class: GradeClass,
    pub religion: Religion,
}

impl std::fmt::Debug for RegistrationDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationDraft")
            .field("username", &self.username)
            .field("grade_class", &self.grade_class)
            .field("religion", &self.religion)
            .finish_non_exhaustive()
    }
}

impl RegistrationDraft {
    /// Checks the form and returns the trimmed username with the raw password.
    ///
    /// # Errors
    ///
    /// Returns a `UserError` describing the first failed rule.
    pub fn validate(self) -> Result<ValidatedRegistration, UserError> {
        let username = self.username.trim().to_owned();
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(UserError::UsernameTooShort);
        }
        if !username.chars().all(is_username_char) {
            return Err(UserError::UsernameInvalidCharacters);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(UserError::PasswordTooShort);
        }
        if self.password != self.confirm_password {
            return Err(UserError::PasswordMismatch);
        }
        Ok(ValidatedRegistration {
            username,
            password: self.password,
            grade_class: self.grade_class,
            religion: self.religion,
        })
    }
}

/// Usernames end up in report file names, so path separators and dots are out.
#[must_use]
pub fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedRegistration {
    pub username: String,
    pub password: String,
    pub grade_class: GradeClass,
    pub religion: Religion,
}

impl std::fmt::Debug for ValidatedRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedRegistration")
            .field("username", &self.username)
            .field("grade_class", &self.grade_class)
            .field("religion", &self.religion)
            .finish_non_exhaustive()
    }
}

//
// ─── USER ──────────────────────────────────────────────────────────────────────
//

/// A registered participant. The password hash never leaves storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub xp: u64,
    pub grade_class: GradeClass,
    pub religion: Religion,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn level(&self) -> u32 {
        level_for_xp(self.xp)
    }

    /// Returns a copy with `earned` XP added.
    #[must_use]
    pub fn with_xp_added(&self, earned: u64) -> Self {
        Self {
            xp: self.xp.saturating_add(earned),
            ..self.clone()
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn draft() -> RegistrationDraft {
        RegistrationDraft {
            username: "  alice ".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            grade_class: GradeClass::new(11, 1).unwrap(),
            religion: Religion::Islam,
        }
    }

    #[test]
    fn registration_trims_username() {
        let ok = draft().validate().unwrap();
        assert_eq!(ok.username, "alice");
    }

    #[test]
    fn registration_rules() {
        let mut d = draft();
        d.username = " abc ".into();
        assert_eq!(d.validate().unwrap_err(), UserError::UsernameTooShort);

        let mut d = draft();
        d.password = "12345".into();
        d.confirm_password = "12345".into();
        assert_eq!(d.validate().unwrap_err(), UserError::PasswordTooShort);

        let mut d = draft();
        d.confirm_password = "secret2".into();
        assert_eq!(d.validate().unwrap_err(), UserError::PasswordMismatch);
    }

    #[test]
    fn username_rejects_path_characters() {
        for bad in ["ab/cd", "../../escaped", "back\\slash", "dot.ted", "with space"] {
            let mut d = draft();
            d.username = bad.into();
            assert_eq!(
                d.validate().unwrap_err(),
                UserError::UsernameInvalidCharacters,
                "{bad}"
            );
        }

        let mut d = draft();
        d.username = "sekar_12-b".into();
        assert_eq!(d.validate().unwrap().username, "sekar_12-b");
    }

    #[test]
    fn debug_hides_password() {
        let rendered = format!("{:?}", draft());
        assert!(!rendered.contains("secret1"));
    }

    #[test]
    fn user_level_follows_xp() {
        let user = User {
            id: UserId::new(1),
            username: "victus".into(),
            xp: 250,
            grade_class: GradeClass::new(11, 5).unwrap(),
            religion: Religion::Islam,
            created_at: fixed_now(),
        };
        assert_eq!(user.level(), 2);
        assert_eq!(user.with_xp_added(50).level(), 3);
    }
}
