// src/poll.rs
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Choice, Question};
use crate::store::PollStore;

/// Maximum number of questions on the index page.
pub const LATEST_LIMIT: i64 = 5;

pub const EMPTY_INDEX_MESSAGE: &str = "No polls are available.";
pub const NO_CHOICE_MESSAGE: &str = "You didn't select a choice.";

/// Width of the "published recently" window.
pub fn recent_window() -> Duration {
    Duration::hours(24)
}

/// True when `pub_date` lies in `[now - 24h, now]`. Both bounds are checked so
/// future questions never count as recent. Near the start of the representable
/// range the lower bound is open.
pub fn was_published_recently(pub_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    if pub_date > now {
        return false;
    }
    match now.checked_sub_signed(recent_window()) {
        Some(earliest) => pub_date >= earliest,
        None => true,
    }
}

/// True once the publish date has been reached. Unrelated to the recency window.
pub fn is_published(pub_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    pub_date <= now
}

/// Loads a question for the detail and results views. Missing, unpublished and
/// choice-less questions are all reported as not found.
pub async fn visible_question(
    store: &dyn PollStore,
    question_id: i64,
    now: DateTime<Utc>,
) -> Result<(Question, Vec<Choice>)> {
    let question = store
        .question_by_id(question_id)
        .await?
        .filter(|q| q.is_published(now))
        .ok_or_else(|| not_found(question_id))?;

    let choices = store.choices_for_question(question.id).await?;
    if choices.is_empty() {
        return Err(not_found(question_id));
    }
    Ok((question, choices))
}

#[derive(Debug)]
pub enum VoteOutcome {
    Recorded(Choice),
    InvalidSelection {
        question: Question,
        choices: Vec<Choice>,
    },
}

/// Records one vote for `selection` on the given question.
///
/// The selection arrives as raw form text. Anything that does not name a
/// choice of this question yields [`VoteOutcome::InvalidSelection`] and leaves
/// every count untouched. The increment itself is a single store call, never
/// a read followed by a write.
pub async fn cast_vote(
    store: &dyn PollStore,
    question_id: i64,
    selection: Option<&str>,
    now: DateTime<Utc>,
) -> Result<VoteOutcome> {
    let question = store
        .question_by_id(question_id)
        .await?
        .filter(|q| q.is_published(now))
        .ok_or_else(|| not_found(question_id))?;

    let choice_id = selection.and_then(|s| s.trim().parse::<i64>().ok());
    let recorded = match choice_id {
        Some(choice_id) => store.increment_votes(question.id, choice_id).await?,
        None => None,
    };

    match recorded {
        Some(choice) => Ok(VoteOutcome::Recorded(choice)),
        None => {
            debug!(question_id, ?selection, "vote without a valid choice");
            let choices = store.choices_for_question(question.id).await?;
            Ok(VoteOutcome::InvalidSelection { question, choices })
        }
    }
}

fn not_found(question_id: i64) -> Error {
    Error::NotFound(format!("question {question_id} does not exist"))
}
