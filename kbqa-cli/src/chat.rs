//! Interactive question loop.

use anyhow::Result;
use kbqa_rag::{AnswerResult, FileFilter, RagPipeline};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, error, info};

use crate::output::format_answer;
use crate::review::{ReviewEntry, ReviewLog, UserFeedback};

const PROMPT: &str = "kbqa> ";

const HELP: &str = "\
Type a question, or one of:
  /helpful     mark the last answer as helpful
  /unhelpful   flag the last answer for review
  /clear       clear the screen and forget the last answer
  /help        show this message
  /quit        leave";

/// One line of chat input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Question(String),
    Feedback(UserFeedback),
    Clear,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_chat_input(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ChatInput::Question(line.to_string());
    };
    match command.to_ascii_lowercase().as_str() {
        "helpful" => ChatInput::Feedback(UserFeedback::Helpful),
        "unhelpful" | "not-helpful" | "report" => ChatInput::Feedback(UserFeedback::NotHelpful),
        "clear" => ChatInput::Clear,
        "help" | "?" => ChatInput::Help,
        "quit" | "exit" | "q" => ChatInput::Quit,
        _ => ChatInput::Unknown(line.to_string()),
    }
}

/// The most recent answer and whether it has been rated.
#[derive(Debug)]
pub struct LastAnswer {
    answer: AnswerResult,
    rated: bool,
}

impl LastAnswer {
    pub fn new(answer: AnswerResult) -> Self {
        Self { answer, rated: false }
    }
}

/// What happened to a `/helpful` or `/unhelpful` rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// Helpful answers are acknowledged and not logged.
    Thanked,
    /// The answer was appended to the review log.
    Flagged,
    AlreadyRated,
    NothingToRate,
}

/// Apply `feedback` to the last answer. Each answer can be rated once, and
/// only unhelpful answers are written to `review`.
///
/// # Errors
///
/// When the review log cannot be written; the answer stays unrated.
pub fn record_feedback(
    review: &ReviewLog,
    last: Option<&mut LastAnswer>,
    feedback: UserFeedback,
) -> Result<FeedbackOutcome> {
    let Some(last) = last else {
        return Ok(FeedbackOutcome::NothingToRate);
    };
    if last.rated {
        return Ok(FeedbackOutcome::AlreadyRated);
    }
    let outcome = match feedback {
        UserFeedback::NotHelpful => {
            review.log(&ReviewEntry::from_answer(&last.answer, feedback))?;
            FeedbackOutcome::Flagged
        }
        UserFeedback::Helpful | UserFeedback::None => FeedbackOutcome::Thanked,
    };
    last.rated = true;
    Ok(outcome)
}

/// Run the loop until `/quit`, Ctrl-C or end of input.
pub async fn run_chat(pipeline: &RagPipeline, filter: FileFilter, review: &ReviewLog) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut last_answer: Option<LastAnswer> = None;

    println!("Ask a question about the knowledge base. Type /help for commands.");
    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        match parse_chat_input(&line) {
            ChatInput::Empty => {}
            ChatInput::Quit => break,
            ChatInput::Help => println!("{HELP}"),
            ChatInput::Clear => {
                editor.clear_screen()?;
                last_answer = None;
            }
            ChatInput::Unknown(command) => println!("Unknown command {command}. Type /help."),
            ChatInput::Feedback(feedback) => {
                match record_feedback(review, last_answer.as_mut(), feedback) {
                    Ok(FeedbackOutcome::Thanked) => println!("Thanks for the feedback."),
                    Ok(FeedbackOutcome::Flagged) => {
                        println!("Thanks. The answer was logged for review.")
                    }
                    Ok(FeedbackOutcome::AlreadyRated) => println!("That answer was already rated."),
                    Ok(FeedbackOutcome::NothingToRate) => println!("No answer to rate yet."),
                    Err(e) => {
                        error!(error = %e, "failed to record feedback");
                        println!("Could not record feedback: {e}");
                    }
                }
            }
            ChatInput::Question(question) => {
                if let Err(e) = editor.add_history_entry(question.as_str()) {
                    debug!(error = %e, "failed to add history entry");
                }
                let answer = pipeline.answer(&question, filter.clone()).await;
                println!("\n{}\n", format_answer(&answer));
                last_answer = Some(LastAnswer::new(answer));
            }
        }
    }

    info!("chat session ended");
    Ok(())
}
