mod cli;
mod config;
mod console;
mod exam;

use quiz_core::model::{GradeClass, RegistrationDraft, Religion, Subject, User};
use quiz_core::progression::xp_to_reach;
use services::{AppServices, Clock};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Args, Command, prepare_sqlite_file, print_usage};
use crate::config::Config;
use crate::console::Console;

const HISTORY_LIMIT: u32 = 10;

fn init_tracing(filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_subjects() {
    println!("{:<20} Subject", "Key");
    for subject in Subject::ALL {
        println!("{:<20} {}", subject.key(), subject.title());
    }
}

async fn register(
    app: &AppServices,
    console: &mut Console,
) -> Result<(), Box<dyn std::error::Error>> {
    let username = console.require("Username").await?;
    let password = console.require("Password").await?;
    let confirm_password = console.require("Confirm password").await?;
    let grade_class: GradeClass = console.require("Class (e.g. 10.1)").await?.parse()?;
    let religion: Religion = console.require("Religion (islam/kristen)").await?.parse()?;

    let user = app
        .auth()
        .register(RegistrationDraft {
            username,
            password,
            confirm_password,
            grade_class,
            religion,
        })
        .await?;
    println!(
        "Welcome, {}! Account created for class {}.",
        user.username, user.grade_class
    );
    Ok(())
}

async fn login(
    app: &AppServices,
    console: &mut Console,
) -> Result<User, Box<dyn std::error::Error>> {
    let username = console.require("Username").await?;
    let password = console.require("Password").await?;
    Ok(app.auth().login(&username, &password).await?)
}

fn print_profile(user: &User) {
    let level = user.level();
    println!("User     : {}", user.username);
    println!("Class    : {} ({})", user.grade_class, user.religion);
    println!("Level    : {level}");
    println!(
        "XP       : {} ({} to level {})",
        user.xp,
        xp_to_reach(level + 1).saturating_sub(user.xp),
        level + 1
    );
}

async fn history(app: &AppServices, user: &User) -> Result<(), Box<dyn std::error::Error>> {
    let items = app.exams().history(user.id, HISTORY_LIMIT).await?;
    if items.is_empty() {
        println!("No exams taken yet.");
        return Ok(());
    }
    for item in items {
        println!(
            "{}  {:<24} {:>2}/{:<2} {:>5.1}%  {:<10} +{} XP",
            item.completed_at.format("%Y-%m-%d %H:%M"),
            item.subject.title(),
            item.score,
            item.question_count,
            item.percent,
            if item.passed { "passed" } else { "not passed" },
            item.xp_earned
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_tracing(&config.log_filter);

    let args = Args::parse(std::env::args().skip(1), &config).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    match args.command {
        Command::Help => {
            print_usage();
            return Ok(());
        }
        Command::Subjects => {
            print_subjects();
            return Ok(());
        }
        Command::Register | Command::Login | Command::Exam(_) | Command::History => {}
    }

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&args.db_url)?;
    let app = AppServices::new_sqlite(
        &args.db_url,
        args.questions_dir,
        args.reports_dir,
        Clock::default_clock(),
    )
    .await?;
    info!(db = %args.db_url, "storage ready");
    let mut console = Console::new();

    match args.command {
        Command::Register => register(&app, &mut console).await,
        Command::Login => {
            let user = login(&app, &mut console).await?;
            print_profile(&user);
            Ok(())
        }
        Command::Exam(subject) => {
            let user = login(&app, &mut console).await?;
            exam::run(&app, &user, subject, &mut console).await
        }
        Command::History => {
            let user = login(&app, &mut console).await?;
            history(&app, &user).await
        }
        Command::Help | Command::Subjects => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
