use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use quiz_core::model::{GradeClass, OptionIndex, Question, Religion, Subject};
use storage::credentials::hash_password;
use storage::repository::{NewUserRecord, Storage};
use storage::{FsQuestionBank, QuestionKey};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    username: String,
    password: String,
    xp: u64,
    grade_class: GradeClass,
    religion: Religion,
    questions_dir: Option<PathBuf>,
    questions_per_subject: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidXp { raw: String },
    InvalidClass { raw: String },
    InvalidReligion { raw: String },
    InvalidCount { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidXp { raw } => write!(f, "invalid --xp value: {raw}"),
            ArgsError::InvalidClass { raw } => {
                write!(f, "invalid --class value (expected 10.1 to 12.9): {raw}")
            }
            ArgsError::InvalidReligion { raw } => write!(f, "invalid --religion value: {raw}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --count value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite:quizquest.db?mode=rwc".into());
        let mut username = "victus".to_owned();
        let mut password = "password123".to_owned();
        let mut xp: u64 = 250;
        let mut grade_class = GradeClass::new(11, 5).map_err(|_| ArgsError::InvalidClass {
            raw: "11.5".into(),
        })?;
        let mut religion = Religion::Islam;
        let mut questions_dir = std::env::var("QUIZ_QUESTIONS_DIR").ok().map(PathBuf::from);
        let mut questions_per_subject: u32 = 25;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--username" => username = require_value(&mut args, "--username")?,
                "--password" => password = require_value(&mut args, "--password")?,
                "--xp" => {
                    let value = require_value(&mut args, "--xp")?;
                    xp = value
                        .parse::<u64>()
                        .map_err(|_| ArgsError::InvalidXp { raw: value.clone() })?;
                }
                "--class" => {
                    let value = require_value(&mut args, "--class")?;
                    grade_class = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidClass { raw: value.clone() })?;
                }
                "--religion" => {
                    let value = require_value(&mut args, "--religion")?;
                    religion = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidReligion { raw: value.clone() })?;
                }
                "--questions" => {
                    questions_dir = Some(PathBuf::from(require_value(&mut args, "--questions")?));
                }
                "--count" => {
                    let value = require_value(&mut args, "--count")?;
                    questions_per_subject = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidCount { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            username,
            password,
            xp,
            grade_class,
            religion,
            questions_dir,
            questions_per_subject,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>      SQLite URL (default: sqlite:quizquest.db?mode=rwc)");
    eprintln!("  --username <name>      Demo account name (default: victus)");
    eprintln!("  --password <secret>    Demo account password (default: password123)");
    eprintln!("  --xp <n>               Starting XP (default: 250)");
    eprintln!("  --class <g.r>          Grade class (default: 11.5)");
    eprintln!("  --religion <name>      islam or kristen (default: islam)");
    eprintln!("  --questions <dir>      Also write sample question files under <dir>");
    eprintln!("  --count <n>            Sample questions per subject file (default: 25)");
    eprintln!("  --now <rfc3339>        Fixed current time for deterministic seeding");
    eprintln!("  -h, --help             Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_QUESTIONS_DIR");
}

/// Placeholder question whose correct option rotates with `n`.
fn sample_question(
    subject: Subject,
    grade: u8,
    n: u32,
) -> Result<Question, Box<dyn std::error::Error>> {
    let answer = OptionIndex::new(u8::try_from(n % 4)?)?;
    let options: [String; 4] = std::array::from_fn(|i| {
        if i == answer.as_usize() {
            format!("Correct answer {n}")
        } else {
            format!("Distractor {n}-{}", i + 1)
        }
    });
    Ok(Question::new(
        format!("{} grade {grade}, practice question {n}", subject.title()),
        options,
        answer,
        Some(format!("Look for the option numbered {n}.")),
    )?)
}

async fn write_sample_questions(
    root: PathBuf,
    count: u32,
) -> Result<usize, Box<dyn std::error::Error>> {
    let bank = FsQuestionBank::new(root);
    let mut files = 0;
    for grade in GradeClass::GRADES {
        for subject in Subject::ALL {
            let religions: &[Religion] = if subject == Subject::Religion {
                &[Religion::Islam, Religion::Christian]
            } else {
                &[Religion::Islam]
            };
            for &religion in religions {
                let key = QuestionKey::new(grade, subject.file_stem(religion));
                let questions = (1..=count)
                    .map(|n| sample_question(subject, grade, n))
                    .collect::<Result<Vec<_>, _>>()?;
                bank.write_questions(&key, &questions).await?;
                files += 1;
            }
        }
    }
    Ok(files)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    match storage.users.find_credentials(&args.username).await? {
        Some(existing) => {
            storage.users.update_xp(&existing.user.username, args.xp).await?;
            println!("Reset XP of {} to {}", existing.user.username, args.xp);
        }
        None => {
            let user = storage
                .users
                .insert_user(NewUserRecord {
                    username: args.username.clone(),
                    password_hash: hash_password(&args.password)?,
                    xp: args.xp,
                    grade_class: args.grade_class,
                    religion: args.religion,
                    created_at: now,
                })
                .await?;
            println!(
                "Seeded user {} (class {}, {}, {} XP) into {}",
                user.username, user.grade_class, user.religion, user.xp, args.db_url
            );
        }
    }

    if let Some(root) = args.questions_dir {
        let shown = root.display().to_string();
        let files = write_sample_questions(root, args.questions_per_subject).await?;
        println!("Wrote {files} sample question files under {shown}");
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
