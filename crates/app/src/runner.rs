//! Terminal front end for a single attempt.

use quiz_core::model::{Question, QuizResult};
use quiz_core::session::{Direction, ReviewEntry, SessionStatus};
use quiz_core::time::format_countdown;
use services::{Attempt, AttemptError, AttemptService, AttemptSnapshot};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Option by 1-based number or by label.
    Choose(String),
    Next,
    Previous,
    /// 1-based question number.
    GoTo(usize),
    Flag,
    Submit,
    Quit,
    Help,
    Empty,
}

impl Input {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (None, _) => Input::Empty,
            (Some("n" | "next"), None) => Input::Next,
            (Some("p" | "prev"), None) => Input::Previous,
            (Some("f" | "flag"), None) => Input::Flag,
            (Some("s" | "submit"), None) => Input::Submit,
            (Some("q" | "quit"), None) => Input::Quit,
            (Some("?" | "h" | "help"), None) => Input::Help,
            (Some("g" | "goto"), Some(n)) => n
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map_or(Input::Help, Input::GoTo),
            (Some(choice), None) => Input::Choose(choice.to_string()),
            _ => Input::Help,
        }
    }

    /// Like [`Input::parse`], but an option label of `question` wins over a
    /// command letter. The long command names always stay reachable.
    #[must_use]
    pub fn resolve(line: &str, question: &Question) -> Self {
        let trimmed = line.trim();
        if question.option_index(trimmed).is_some() {
            return Input::Choose(trimmed.to_string());
        }
        Self::parse(line)
    }
}

/// How the attempt ended.
pub enum Outcome {
    Finished {
        result: QuizResult,
        review: Vec<ReviewEntry>,
    },
    Abandoned,
}

enum Event {
    Line(Option<String>),
    Expired(bool),
}

const HELP: &str = "commands: <number|label> answer, n/next, p/prev, g <N> go to, f/flag, s/submit, q/quit\n\
                    an option label takes precedence over a one-letter command";

/// Drive an attempt from stdin until it is submitted, expires or is abandoned.
///
/// # Errors
///
/// Returns attempt or I/O errors.
pub async fn run_attempt(
    attempts: &AttemptService,
    mut attempt: Attempt,
) -> Result<Outcome, Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut timer_live = attempt.quiz().time_limit_secs().is_some();

    println!("{}", attempt.quiz().title());
    if !attempt.quiz().description().is_empty() {
        println!("{}", attempt.quiz().description());
    }
    println!("{HELP}");

    loop {
        let snap = attempt.snapshot()?;
        render(&snap);
        prompt().await?;

        let event = tokio::select! {
            line = lines.next_line() => Event::Line(line?),
            fired = attempt.wait_for_expiry(), if timer_live => Event::Expired(fired),
        };

        let line = match event {
            Event::Expired(true) => {
                println!("\nTime's up!");
                let result = attempts.finalize(&mut attempt).await?;
                return Ok(finished(&attempt, result)?);
            }
            Event::Expired(false) => {
                timer_live = false;
                continue;
            }
            Event::Line(None) => return Ok(Outcome::Abandoned),
            Event::Line(Some(line)) => line,
        };

        match Input::resolve(&line, &snap.question) {
            Input::Choose(choice) => choose(&attempt, &choice)?,
            Input::Next => {
                attempt.advance(Direction::Next)?;
            }
            Input::Previous => {
                attempt.advance(Direction::Previous)?;
            }
            Input::GoTo(n) => {
                attempt.go_to(n - 1)?;
            }
            Input::Flag => {
                attempt.toggle_current_flag()?;
            }
            Input::Submit => match attempts.submit(&mut attempt).await {
                Ok(result) => return Ok(finished(&attempt, result)?),
                // Expired between the prompt and the submit.
                Err(AttemptError::Session(_)) if attempt.status()? == SessionStatus::Expired => {
                    println!("Time's up!");
                    let result = attempts.finalize(&mut attempt).await?;
                    return Ok(finished(&attempt, result)?);
                }
                Err(err) => return Err(err.into()),
            },
            Input::Quit => return Ok(Outcome::Abandoned),
            Input::Help => println!("{HELP}"),
            Input::Empty => {}
        }
    }
}

fn finished(attempt: &Attempt, result: QuizResult) -> Result<Outcome, AttemptError> {
    Ok(Outcome::Finished {
        review: attempt.review()?,
        result,
    })
}

fn choose(attempt: &Attempt, choice: &str) -> Result<(), AttemptError> {
    let snapshot = attempt.snapshot()?;
    let index = match choice.parse::<usize>() {
        Ok(n) if n > 0 => Some(n - 1),
        Ok(_) => None,
        Err(_) => snapshot.question.option_index(choice),
    };
    let Some(index) = index else {
        println!("no option {choice}");
        return Ok(());
    };
    match attempt.select_current(index) {
        Ok(()) => {
            debug!(question = %snapshot.question.id(), index, "answer recorded");
            Ok(())
        }
        Err(AttemptError::Session(err)) => {
            println!("{err}");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

async fn prompt() -> std::io::Result<()> {
    let mut out = tokio::io::stdout();
    out.write_all(b"> ").await?;
    out.flush().await
}

fn render(snap: &AttemptSnapshot) {
    let progress = &snap.progress;
    let clock = snap
        .remaining_secs
        .map(|s| format!("  [{}]", format_countdown(s)))
        .unwrap_or_default();
    println!();
    println!(
        "Question {}/{}  answered {}% ({}/{}){}{}",
        snap.current_index + 1,
        progress.total,
        progress.answered_percentage,
        progress.answered,
        progress.total,
        if snap.flagged { "  [flagged]" } else { "" },
        clock
    );
    println!("{}", snap.question.prompt());
    for (i, option) in snap.question.options().iter().enumerate() {
        let mark = if snap.selected == Some(i) { "x" } else { " " };
        println!("  [{mark}] {}. ({}) {}", i + 1, option.label(), option.text());
    }
}

pub fn print_result(result: &QuizResult) {
    let score = &result.score;
    println!(
        "Score: {}/{} correct ({}%), answered {}, time {}, {}",
        score.correct_answers,
        score.total_questions,
        score.percentage,
        score.total_answered,
        format_countdown(score.time_spent_secs),
        score.completion.as_str()
    );
}

pub fn print_review(review: &[ReviewEntry]) {
    println!();
    println!("Question Review");
    for (i, entry) in review.iter().enumerate() {
        let options = entry.question.options();
        println!("{}. {}", i + 1, entry.question.prompt());
        match entry.selected.and_then(|s| options.get(s)) {
            Some(option) => println!("   Your answer: ({}) {}", option.label(), option.text()),
            None => println!("   Not answered"),
        }
        if let Some(option) = options.get(entry.correct) {
            let mark = if entry.is_correct { "  ✓" } else { "" };
            println!("   Correct answer: ({}) {}{mark}", option.label(), option.text());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionId, QuizOption, option_label};

    #[test]
    fn parses_commands() {
        assert_eq!(Input::parse(" n "), Input::Next);
        assert_eq!(Input::parse("prev"), Input::Previous);
        assert_eq!(Input::parse("g 3"), Input::GoTo(3));
        assert_eq!(Input::parse("g 0"), Input::Help);
        assert_eq!(Input::parse("2"), Input::Choose("2".into()));
        assert_eq!(Input::parse("c"), Input::Choose("c".into()));
        assert_eq!(Input::parse(""), Input::Empty);
        assert_eq!(Input::parse("s"), Input::Submit);
        assert_eq!(Input::parse("a b"), Input::Help);
    }

    fn question_with(count: usize) -> Question {
        let options = (0..count)
            .map(|i| QuizOption::new(option_label(i), format!("option {i}")))
            .collect();
        Question::new(QuestionId::new(1), "Pick", options, 0).unwrap()
    }

    #[test]
    fn option_labels_win_over_command_letters() {
        let six = question_with(6);
        assert_eq!(Input::resolve("f", &six), Input::Choose("f".into()));
        assert_eq!(Input::resolve(" flag ", &six), Input::Flag);

        let four = question_with(4);
        assert_eq!(Input::resolve("f", &four), Input::Flag);
        assert_eq!(Input::resolve("c", &four), Input::Choose("c".into()));
        assert_eq!(Input::resolve("n", &four), Input::Next);
    }
}
