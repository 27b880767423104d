use std::fmt;

use chrono::{DateTime, Duration, Utc};
use quiz_core::model::{FinalScore, QuizSubmission, Score, UserId};
use storage::catalog::{builtin_catalog, ensure_catalog};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    replace: bool,
    user: Option<UserId>,
    results: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidUser { raw: String },
    InvalidResults { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw:?}"),
            ArgsError::InvalidResults { raw } => write!(f, "invalid --results value: {raw}"),
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
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite:quiz.sqlite3".into());
        let mut user = std::env::var("QUIZ_USER_ID")
            .ok()
            .and_then(|value| UserId::new(value).ok());
        let mut results = 0;
        let mut replace = false;
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
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    user = Some(
                        UserId::new(value.clone())
                            .map_err(|_| ArgsError::InvalidUser { raw: value })?,
                    );
                }
                "--results" => {
                    let value = require_value(&mut args, "--results")?;
                    results = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidResults { raw: value.clone() })?;
                }
                "--replace" => replace = true,
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
            replace,
            user,
            results,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:quiz.sqlite3)");
    eprintln!("  --replace                 Overwrite quizzes that already exist");
    eprintln!("  --user <id>               User to attach sample results to");
    eprintln!("  --results <n>             Number of sample results to append (default: 0)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_USER_ID");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);
    let entries = builtin_catalog()?;

    let written = if args.replace {
        for entry in &entries {
            storage
                .catalog_writer
                .upsert_quiz(&entry.quiz, &entry.questions)
                .await?;
        }
        entries.len()
    } else {
        ensure_catalog(
            storage.catalog.as_ref(),
            storage.catalog_writer.as_ref(),
            &entries,
        )
        .await?
    };

    let mut appended = 0;
    if let Some(user) = args.user.as_ref().filter(|_| args.results > 0) {
        for i in 0..args.results {
            let entry = &entries[(i as usize) % entries.len()];
            let total = entry.quiz.question_count();
            let correct = (i + 2) % (total + 1);
            let submission = QuizSubmission::new(
                user.clone(),
                FinalScore {
                    quiz_id: entry.quiz.id(),
                    quiz_title: entry.quiz.title().to_string(),
                    score: Score::new(correct, total)?,
                },
                now - Duration::days(i64::from(i)),
            );
            storage.results.append_result(&submission).await?;
            appended += 1;
        }
    }

    println!(
        "Seeded {written} of {} quizzes and {appended} results into {}",
        entries.len(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
