//! Interactive exam loop for the terminal.
//!
//! Input lines and the one-second countdown race in a single `select!`, so the
//! clock keeps running while the participant is thinking.

use std::error::Error;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use quiz_core::model::{OptionIndex, PowerupKind, Subject, User};
use quiz_core::session::{ExamSession, PowerupEffect, SessionState};
use quiz_core::time::format_countdown;
use services::{
    AppServices, ExamError, ExamService, ExamView, NavStatus, OptionView, ResultView,
};
use tokio::time::MissedTickBehavior;

use crate::console::Console;

/// Countdown marks (seconds left) that print a warning.
const TIME_WARNINGS: [u32; 3] = [600, 300, 60];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamCommand {
    Choose(OptionIndex),
    Next,
    /// 0-based question index.
    GoTo(usize),
    Powerup(PowerupKind),
    Time,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("type a command, or `h` for help")]
    Empty,
    #[error("unknown command `{0}`, type `h` for help")]
    Unknown(String),
    #[error("`g` needs a question number from 1, got `{0}`")]
    BadQuestionNumber(String),
}

impl FromStr for ExamCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim().to_ascii_lowercase();
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Empty);
        };

        if let Some(option) = OptionIndex::from_letter(head) {
            return Ok(Self::Choose(option));
        }

        match head {
            "n" | "next" => Ok(Self::Next),
            "g" | "go" => {
                let raw = words.next().unwrap_or_default();
                match raw.parse::<usize>() {
                    Ok(number) if number >= 1 => Ok(Self::GoTo(number - 1)),
                    _ => Err(CommandError::BadQuestionNumber(raw.to_owned())),
                }
            }
            "t" | "time" => Ok(Self::Time),
            "h" | "help" | "?" => Ok(Self::Help),
            "q" | "quit" => Ok(Self::Quit),
            other => other
                .parse::<PowerupKind>()
                .map(Self::Powerup)
                .map_err(|_| CommandError::Unknown(other.to_owned())),
        }
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Sit one exam and, if it finishes, persist it and print the result.
pub async fn run(
    app: &AppServices,
    user: &User,
    subject: Subject,
    console: &mut Console,
) -> Result<(), Box<dyn Error>> {
    let exams = app.exams();
    let mut session = exams.start_exam(user, subject).await?;

    println!(
        "{} | {} questions | {} minutes",
        subject,
        session.question_count(),
        session.rules().duration_secs() / 60
    );
    print_help();
    render(&ExamView::of(&session));

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    while !session.is_finished() {
        tokio::select! {
            biased;
            _ = ticker.tick() => {
                if exams.tick(&mut session) == SessionState::InProgress {
                    let left = session.time_remaining();
                    if TIME_WARNINGS.contains(&left) {
                        println!("** {} left **", format_countdown(left));
                    }
                } else {
                    println!("Time is up.");
                }
            }
            line = console.next_line() => {
                let Some(line) = line? else {
                    exams.abandon(session);
                    println!("Input closed, exam abandoned.");
                    return Ok(());
                };
                let command = match line.parse::<ExamCommand>() {
                    Ok(command) => command,
                    Err(CommandError::Empty) => continue,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                if let Flow::Quit = apply(&exams, &mut session, command) {
                    exams.abandon(session);
                    println!("Exam abandoned, nothing was saved.");
                    return Ok(());
                }
            }
        }
    }

    let completed = app.complete_exam(user, session).await?;
    print_result(&ResultView::of(&completed.finished), &completed.report_path);
    Ok(())
}

fn apply(exams: &ExamService, session: &mut ExamSession, command: ExamCommand) -> Flow {
    let outcome: Result<(), ExamError> = match command {
        ExamCommand::Choose(option) => session.select_answer(option).map_err(Into::into),
        ExamCommand::Next => session.advance().map(|_| ()).map_err(Into::into),
        ExamCommand::GoTo(index) => session.go_to(index).map_err(Into::into),
        ExamCommand::Powerup(kind) => match exams.use_powerup(session, kind) {
            Ok(Some(effect)) => {
                print_effect(kind, &effect);
                Ok(())
            }
            Ok(None) => {
                println!("No time left to spend on power-ups.");
                return Flow::Continue;
            }
            Err(e) => Err(e),
        },
        ExamCommand::Time => {
            println!("{} left", format_countdown(session.time_remaining()));
            return Flow::Continue;
        }
        ExamCommand::Help => {
            print_help();
            return Flow::Continue;
        }
        ExamCommand::Quit => return Flow::Quit,
    };

    match outcome {
        Ok(()) if !session.is_finished() => render(&ExamView::of(session)),
        Ok(()) => {}
        Err(e) => println!("{e}"),
    }
    Flow::Continue
}

fn print_help() {
    println!("Commands:");
    println!("  a b c d     choose an answer");
    println!("  n           lock in and go to the next question");
    println!("  g <num>     jump to a question");
    for kind in PowerupKind::ALL {
        println!("  {:<11} {} (costs {} min)", kind.key(), kind, kind.cost_minutes());
    }
    println!("  t           time left");
    println!("  q           abandon the exam");
}

fn print_effect(kind: PowerupKind, effect: &PowerupEffect) {
    match effect {
        PowerupEffect::Clue(Some(clue)) => println!("{kind}: {clue}"),
        PowerupEffect::Clue(None) => println!("{kind}: {}", PowerupEffect::NO_CLUE),
        PowerupEffect::Eliminated([first, second]) => println!(
            "{kind}: options {} and {} removed",
            first.letter(),
            second.letter()
        ),
        PowerupEffect::Revealed(answer) => {
            println!("{kind}: the answer is {}", answer.letter());
        }
    }
}

fn option_line(option: &OptionView, revealed: Option<OptionIndex>) -> String {
    let marker = if option.selected { '*' } else { ' ' };
    let mut line = format!("{marker} {}) {}", option.index.letter(), option.text);
    if revealed == Some(option.index) {
        line.push_str("   <- answer");
    } else if !option.enabled {
        line.push_str("   (removed)");
    }
    line
}

/// One cell per question: `>` current, `#` answered, `.` open.
fn nav_line(navigation: &[NavStatus]) -> String {
    navigation
        .iter()
        .enumerate()
        .map(|(i, status)| {
            let mark = match status {
                NavStatus::Current => '>',
                NavStatus::Answered => '#',
                NavStatus::Unanswered => '.',
            };
            format!("{}{mark}", i + 1)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render(view: &ExamView) {
    let question = &view.question;
    println!();
    println!(
        "[{}] Question {}/{} | {} left | {} answered",
        view.subject, question.number, question.total, view.countdown, view.progress.answered
    );
    println!("{}", nav_line(&view.navigation));
    println!();
    println!("{}", question.text);
    for option in &question.options {
        println!("{}", option_line(option, question.revealed));
    }
}

fn print_result(view: &ResultView, report_path: &Path) {
    println!();
    println!("== {} ==", view.remark.headline());
    println!("Subject    : {}", view.subject);
    println!("Finished   : {}", view.finish_reason);
    println!(
        "Score      : {}/{} ({:.0}%)",
        view.score, view.question_count, view.percent
    );
    println!("Time left  : {}", view.time_left);
    println!("Power-ups  : {}", view.powerups_used);
    println!("XP gained  : {} (total {})", view.xp_gained, view.total_xp);
    if view.leveled_up {
        println!("Level up!  : now level {}", view.level);
    } else {
        println!("Level      : {}", view.level);
    }
    println!("Report     : {}", report_path.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_choose_options() {
        assert_eq!("b".parse::<ExamCommand>(), Ok(ExamCommand::Choose(OptionIndex::B)));
        assert_eq!(" D ".parse::<ExamCommand>(), Ok(ExamCommand::Choose(OptionIndex::D)));
    }

    #[test]
    fn navigation_commands_parse() {
        assert_eq!("n".parse::<ExamCommand>(), Ok(ExamCommand::Next));
        assert_eq!("next".parse::<ExamCommand>(), Ok(ExamCommand::Next));
        assert_eq!("g 5".parse::<ExamCommand>(), Ok(ExamCommand::GoTo(4)));
        assert_eq!(
            "g 0".parse::<ExamCommand>(),
            Err(CommandError::BadQuestionNumber("0".into()))
        );
        assert_eq!(
            "g".parse::<ExamCommand>(),
            Err(CommandError::BadQuestionNumber(String::new()))
        );
        assert_eq!("Q".parse::<ExamCommand>(), Ok(ExamCommand::Quit));
    }

    #[test]
    fn powerups_parse_by_name() {
        assert_eq!(
            "clue".parse::<ExamCommand>(),
            Ok(ExamCommand::Powerup(PowerupKind::Clue))
        );
        assert_eq!(
            "50:50".parse::<ExamCommand>(),
            Ok(ExamCommand::Powerup(PowerupKind::FiftyFifty))
        );
        assert_eq!(
            "reveal".parse::<ExamCommand>(),
            Ok(ExamCommand::Powerup(PowerupKind::Reveal))
        );
        assert_eq!(
            "skip".parse::<ExamCommand>(),
            Err(CommandError::Unknown("skip".into()))
        );
        assert_eq!("   ".parse::<ExamCommand>(), Err(CommandError::Empty));
    }

    #[test]
    fn option_lines_mark_state() {
        let option = OptionView {
            index: OptionIndex::C,
            text: "Jakarta".into(),
            enabled: true,
            selected: true,
        };
        assert_eq!(option_line(&option, None), "* C) Jakarta");
        assert_eq!(
            option_line(&option, Some(OptionIndex::C)),
            "* C) Jakarta   <- answer"
        );

        let removed = OptionView {
            enabled: false,
            selected: false,
            ..option
        };
        assert_eq!(option_line(&removed, None), "  C) Jakarta   (removed)");
    }

    #[test]
    fn nav_line_numbers_each_question() {
        let nav = [
            NavStatus::Answered,
            NavStatus::Current,
            NavStatus::Unanswered,
        ];
        assert_eq!(nav_line(&nav), "1# 2> 3.");
    }
}
