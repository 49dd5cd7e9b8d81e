use std::fmt;
use std::path::PathBuf;

use clap::{
    Arg, ArgAction, ArgGroup, ArgMatches, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};
use quiz_core::model::{Actor, ActorId, QuizId};

pub const DEFAULT_DB_URL: &str = "sqlite:quiz.sqlite3";
const DEFAULT_LIMIT: &str = "50";

#[derive(Debug)]
pub enum CliError {
    InvalidDbUrl { raw: String },
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            CliError::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("quiz")
        .about("Author quizzes, take them against the clock, review results")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("db")
                .long("db")
                .help("SQLite database URL or path")
                .default_value(DEFAULT_DB_URL)
                .env("QUIZ_DB_URL")
                .global(true),
        )
        .arg(
            Arg::new("actor-id")
                .long("actor-id")
                .help("Identity used for authoring and results; anonymous when absent")
                .env("QUIZ_ACTOR_ID")
                .value_parser(clap::value_parser!(u64))
                .global(true),
        )
        .arg(
            Arg::new("actor-name")
                .long("actor-name")
                .help("Display name for --actor-id")
                .env("QUIZ_ACTOR_NAME")
                .global(true),
        )
        .arg(
            Arg::new("actor-email")
                .long("actor-email")
                .help("Email for --actor-id")
                .env("QUIZ_ACTOR_EMAIL")
                .global(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level, repeat for more (-vvv)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("list")
                .about("List quizzes")
                .arg(
                    Arg::new("search")
                        .long("search")
                        .short('s')
                        .help("Case-insensitive title filter"),
                )
                .arg(limit_arg()),
        )
        .subcommand(
            Command::new("take").about("Take a quiz in the terminal").arg(
                Arg::new("quiz-id")
                    .help("Quiz to take")
                    .required(true)
                    .value_parser(clap::value_parser!(u64)),
            ),
        )
        .subcommand(
            Command::new("results")
                .about("Show recorded results, newest first")
                .arg(
                    Arg::new("quiz")
                        .long("quiz")
                        .help("Results for a quiz")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("actor")
                        .long("actor")
                        .help("Results recorded by an actor")
                        .value_parser(clap::value_parser!(u64)),
                )
                .group(
                    ArgGroup::new("filter")
                        .args(["quiz", "actor"])
                        .required(true),
                )
                .arg(limit_arg()),
        )
        .subcommand(
            Command::new("import")
                .about("Import quizzes from a JSON file")
                .arg(
                    Arg::new("file")
                        .help("JSON file holding one quiz or a list of quizzes")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(Command::new("seed").about("Insert the sample quizzes into an empty store"))
}

fn limit_arg() -> Arg {
    Arg::new("limit")
        .long("limit")
        .short('n')
        .help("Maximum rows to show")
        .default_value(DEFAULT_LIMIT)
        .value_parser(clap::value_parser!(u32))
}

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    List { search: Option<String>, limit: u32 },
    Take { quiz_id: QuizId },
    ResultsForQuiz { quiz_id: QuizId, limit: u32 },
    ResultsForActor { actor_id: ActorId, limit: u32 },
    Import { file: PathBuf },
    Seed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub db_url: String,
    pub actor: Option<Actor>,
    pub verbosity: u8,
    pub action: Action,
}

impl Args {
    /// Interpret parsed matches. Returns `None` for an unknown subcommand.
    #[must_use]
    pub fn from_matches(matches: &ArgMatches) -> Option<Self> {
        let db_url = normalize_sqlite_url(
            matches
                .get_one::<String>("db")
                .map_or(DEFAULT_DB_URL, String::as_str),
        );

        let actor = matches.get_one::<u64>("actor-id").map(|&id| {
            let name = matches
                .get_one::<String>("actor-name")
                .cloned()
                .unwrap_or_else(|| format!("user {id}"));
            let email = matches
                .get_one::<String>("actor-email")
                .cloned()
                .unwrap_or_default();
            Actor::new(ActorId::new(id), name, email)
        });

        let limit = |sub: &ArgMatches| sub.get_one::<u32>("limit").copied().unwrap_or(50);

        let action = match matches.subcommand()? {
            ("list", sub) => Action::List {
                search: sub.get_one::<String>("search").cloned(),
                limit: limit(sub),
            },
            ("take", sub) => Action::Take {
                quiz_id: QuizId::new(*sub.get_one::<u64>("quiz-id")?),
            },
            ("results", sub) => match (sub.get_one::<u64>("quiz"), sub.get_one::<u64>("actor")) {
                (Some(&quiz), _) => Action::ResultsForQuiz {
                    quiz_id: QuizId::new(quiz),
                    limit: limit(sub),
                },
                (None, Some(&actor)) => Action::ResultsForActor {
                    actor_id: ActorId::new(actor),
                    limit: limit(sub),
                },
                (None, None) => return None,
            },
            ("import", sub) => Action::Import {
                file: sub.get_one::<PathBuf>("file")?.clone(),
            },
            ("seed", _) => Action::Seed,
            _ => return None,
        };

        Some(Self {
            db_url,
            actor,
            verbosity: matches.get_count("verbosity"),
            action,
        })
    }
}

/// Turns `sqlite:relative.db` or a bare path into an absolute `sqlite://` URL.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:"
        || trimmed.starts_with("sqlite://")
        || trimmed.starts_with("sqlite:file:")
    {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its parent directory so `SQLite` can open it.
///
/// # Errors
///
/// Returns `CliError` for an unusable URL or filesystem failures.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), CliError> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| CliError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(CliError::InvalidDbUrl {
            raw: db_url.to_string(),
        });
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
