use std::sync::Arc;

use services::{AppServices, Clock, IdentityProvider, StaticIdentity};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

mod cli;
mod runner;

use cli::{Action, Args};
use runner::Outcome;

fn init_tracing(verbosity: u8) -> Result<(), Box<dyn std::error::Error>> {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // RUST_LOG=
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = Registry::default().with(fmt_layer).with(env_filter);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let matches = cli::new().get_matches();
    let Some(args) = Args::from_matches(&matches) else {
        cli::new().print_help()?;
        return Ok(());
    };
    init_tracing(args.verbosity)?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    cli::prepare_sqlite_file(&args.db_url)?;
    let identity: Arc<dyn IdentityProvider> = match args.actor.clone() {
        Some(actor) => Arc::new(StaticIdentity::signed_in(actor)),
        None => Arc::new(StaticIdentity::anonymous()),
    };
    let app = AppServices::new_sqlite(&args.db_url, Clock::default_clock(), identity).await?;

    match args.action {
        Action::List { search, limit } => {
            let quizzes = app.quiz_service();
            let found = match search.as_deref() {
                Some(term) => quizzes.search_quizzes(term, limit).await?,
                None => quizzes.list_quizzes(limit).await?,
            };
            if found.is_empty() {
                println!("no quizzes");
            }
            for quiz in found {
                let limit = quiz
                    .time_limit_secs()
                    .map_or_else(|| "untimed".to_string(), quiz_core::time::format_countdown);
                println!(
                    "{:>4}  {}  ({} questions, {})",
                    quiz.id().value(),
                    quiz.title(),
                    quiz.question_count(),
                    limit
                );
            }
        }
        Action::Take { quiz_id } => {
            let attempts = app.attempt_service();
            let attempt = attempts.start_attempt(quiz_id).await?;
            match runner::run_attempt(&attempts, attempt).await? {
                Outcome::Finished { result, review } => {
                    runner::print_result(&result);
                    runner::print_review(&review);
                }
                Outcome::Abandoned => println!("attempt abandoned, nothing recorded"),
            }
        }
        Action::ResultsForQuiz { quiz_id, limit } => {
            let results = app.result_service().results_for_quiz(quiz_id, limit).await?;
            print_results(&results);
        }
        Action::ResultsForActor { actor_id, limit } => {
            let results = app
                .result_service()
                .results_for_actor(actor_id, limit)
                .await?;
            print_results(&results);
        }
        Action::Import { file } => {
            let json = std::fs::read_to_string(&file)?;
            let imported = app.quiz_service().import_json(&json).await?;
            for quiz in &imported {
                println!("imported {}  {}", quiz.id(), quiz.title());
            }
        }
        Action::Seed => {
            if app.seeded() {
                println!("sample quizzes added");
            } else {
                match app.seed_samples().await? {
                    0 => println!("already seeded, the store holds quizzes"),
                    n => println!("{n} sample quizzes added"),
                }
            }
        }
    }

    Ok(())
}

fn print_results(results: &[quiz_core::model::QuizResult]) {
    if results.is_empty() {
        println!("no results");
    }
    for result in results {
        print!(
            "{:>4}  quiz {}  {}  ",
            result.id.value(),
            result.quiz_id,
            result.completed_at.format("%Y-%m-%d %H:%M")
        );
        runner::print_result(result);
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
