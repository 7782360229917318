use std::fmt;
use std::path::PathBuf;

use quiz_core::model::Subject;

use crate::config::Config;

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingSubject,
    UnknownArg(String),
    UnknownSubcommand(String),
    UnknownSubject { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingSubject => write!(f, "exam requires a subject"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownSubcommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::UnknownSubject { raw } => {
                write!(f, "unknown subject: {raw} (run `subjects` for the list)")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Register,
    Login,
    Exam(Subject),
    History,
    Subjects,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub command: Command,
    pub db_url: String,
    pub questions_dir: PathBuf,
    pub reports_dir: PathBuf,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app register          [options]   create an account");
    eprintln!("  app login             [options]   show profile and level");
    eprintln!("  app exam <subject>    [options]   sit a timed exam");
    eprintln!("  app history           [options]   list recent results");
    eprintln!("  app subjects                      list subject keys");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>       default: sqlite:quizquest.db");
    eprintln!("  --questions <dir>       default: questions");
    eprintln!("  --reports <dir>         default: reports");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_QUESTIONS_DIR, QUIZ_REPORTS_DIR, RUST_LOG");
}

impl Args {
    /// Parse `argv` (without the program name) on top of `config`.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown subcommands, flags or subjects.
    pub fn parse(
        argv: impl IntoIterator<Item = String>,
        config: &Config,
    ) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter();
        let command = match args.next().as_deref() {
            None | Some("--help" | "-h" | "help") => Command::Help,
            Some("register") => Command::Register,
            Some("login") => Command::Login,
            Some("history") => Command::History,
            Some("subjects") => Command::Subjects,
            Some("exam") => {
                let raw = args.next().ok_or(ArgsError::MissingSubject)?;
                let subject = raw
                    .parse::<Subject>()
                    .map_err(|_| ArgsError::UnknownSubject { raw: raw.clone() })?;
                Command::Exam(subject)
            }
            Some(other) => return Err(ArgsError::UnknownSubcommand(other.to_owned())),
        };

        let mut db_url = config.db_url.clone();
        let mut questions_dir = config.questions_dir.clone();
        let mut reports_dir = config.reports_dir.clone();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--questions" => {
                    questions_dir = PathBuf::from(require_value(&mut args, "--questions")?);
                }
                "--reports" => {
                    reports_dir = PathBuf::from(require_value(&mut args, "--reports")?);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            command,
            db_url: normalize_sqlite_url(db_url),
            questions_dir,
            reports_dir,
        })
    }
}

/// Turn `sqlite:relative.db` into an absolute `sqlite://` URL.
pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its directory so the pool can open it.
///
/// # Errors
///
/// Returns an I/O error or `ArgsError::InvalidDbUrl` for a URL without a path.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            db_url: "sqlite:///tmp/quiz.db".into(),
            questions_dir: PathBuf::from("questions"),
            reports_dir: PathBuf::from("reports"),
            log_filter: "info".into(),
        }
    }

    fn parse(argv: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(argv.iter().map(|s| (*s).to_owned()), &config())
    }

    #[test]
    fn exam_takes_subject_key_or_title() {
        assert_eq!(
            parse(&["exam", "fisika"]).unwrap().command,
            Command::Exam(Subject::Physics)
        );
        assert_eq!(
            parse(&["exam", "Physical Education"]).unwrap().command,
            Command::Exam(Subject::PhysicalEducation)
        );
        assert_eq!(parse(&["exam"]), Err(ArgsError::MissingSubject));
        assert!(matches!(
            parse(&["exam", "astrology"]),
            Err(ArgsError::UnknownSubject { .. })
        ));
    }

    #[test]
    fn flags_override_config() {
        let args = parse(&["history", "--reports", "out", "--db", "sqlite::memory:"]).unwrap();
        assert_eq!(args.command, Command::History);
        assert_eq!(args.reports_dir, PathBuf::from("out"));
        assert_eq!(args.questions_dir, PathBuf::from("questions"));
        assert_eq!(args.db_url, "sqlite::memory:");
    }

    #[test]
    fn bad_input_is_reported() {
        assert_eq!(parse(&[]).unwrap().command, Command::Help);
        assert_eq!(
            parse(&["play"]),
            Err(ArgsError::UnknownSubcommand("play".into()))
        );
        assert_eq!(
            parse(&["login", "--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        );
        assert_eq!(
            parse(&["login", "--verbose"]),
            Err(ArgsError::UnknownArg("--verbose".into()))
        );
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/quiz.db".into());
        assert!(url.starts_with("sqlite://"));
        assert!(url.ends_with("data/quiz.db"));
        assert_eq!(
            normalize_sqlite_url("sqlite:///abs/q.db".into()),
            "sqlite:///abs/q.db"
        );
    }
}
