use std::fmt;

use quiz_core::model::{QuizId, UserId};
use services::{Clock, EngineConfig, HttpBackendConfig, QuizServices};
use storage::catalog::{builtin_catalog, ensure_catalog};
use storage::repository::Storage;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod play;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidQuizId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidUser { raw: String },
    MissingUser,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid --quiz value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw:?}"),
            ArgsError::MissingUser => {
                write!(f, "a user is required (pass --user or set QUIZ_USER_ID)")
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    List,
    History,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "list" => Some(Self::List),
            "history" => Some(Self::History),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }

    fn needs_user(self) -> bool {
        matches!(self, Self::Play | Self::History)
    }
}

struct Args {
    db_url: String,
    user: Option<UserId>,
    quiz_id: Option<QuizId>,
    shuffle: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = normalize_sqlite_url(
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite:quiz.sqlite3".into()),
        );
        let mut user = std::env::var("QUIZ_USER_ID")
            .ok()
            .and_then(|value| UserId::new(value).ok());
        let mut quiz_id = None;
        let mut shuffle = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(args, "--user")?;
                    user = Some(
                        UserId::new(value.clone())
                            .map_err(|_| ArgsError::InvalidUser { raw: value })?,
                    );
                }
                "--quiz" => {
                    let value = require_value(args, "--quiz")?;
                    let parsed: QuizId = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidQuizId { raw: value.clone() })?;
                    quiz_id = Some(parsed);
                }
                "--shuffle" => shuffle = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user,
            quiz_id,
            shuffle,
        })
    }

    fn require_user(&self) -> Result<UserId, ArgsError> {
        self.user.clone().ok_or(ArgsError::MissingUser)
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play    [--quiz <id>] [--user <id>] [--shuffle] [--db <url>]");
    eprintln!("  cargo run -p app -- list    [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- history [--user <id>] [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- seed    [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  command play, --db sqlite:quiz.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_USER_ID, QUIZ_API_BASE_URL,");
    eprintln!("  QUIZ_TICK_MS, QUIZ_GRACE_MS, QUIZ_HISTORY_LIMIT, RUST_LOG");
}

fn normalize_sqlite_url(raw: String) -> String {
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
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
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

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app=info,services=info,storage=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means play.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let user = if cmd.needs_user() {
        Some(parsed.require_user().map_err(|e| {
            eprintln!("{e}");
            e
        })?)
    } else {
        None
    };

    prepare_sqlite_file(&parsed.db_url)?;

    if cmd == Command::Seed {
        let storage = Storage::sqlite(&parsed.db_url).await?;
        let entries = builtin_catalog()?;
        let inserted = ensure_catalog(
            storage.catalog.as_ref(),
            storage.catalog_writer.as_ref(),
            &entries,
        )
        .await?;
        println!(
            "Seeded {inserted} of {} built-in quizzes into {}",
            entries.len(),
            parsed.db_url
        );
        return Ok(());
    }

    let services = QuizServices::new_sqlite(
        &parsed.db_url,
        Clock::default_clock(),
        EngineConfig::from_env(),
        HttpBackendConfig::from_env(),
    )
    .await?;

    match (cmd, user) {
        (Command::List, _) => {
            let quizzes = services.list_quizzes().await?;
            print!("{}", play::render_quiz_list(&quizzes));
            Ok(())
        }
        (Command::History, Some(user)) => {
            let items = services.recent_history(&user).await?;
            print!("{}", play::render_history(&items));
            Ok(())
        }
        (Command::Play, Some(user)) => {
            play::run(&services, user, parsed.quiz_id, parsed.shuffle).await
        }
        _ => Err(ArgsError::MissingUser.into()),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
