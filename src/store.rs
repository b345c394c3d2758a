// src/store.rs
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::{Choice, Question, MAX_TEXT_LEN};

/// Persistence contract for questions and their choices.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Published questions owning at least one choice, newest first.
    async fn latest_published(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Question>>;

    async fn question_by_id(&self, id: i64) -> Result<Option<Question>>;

    /// Choices of a question, ordered by id.
    async fn choices_for_question(&self, question_id: i64) -> Result<Vec<Choice>>;

    /// Adds one vote to `choice_id` if it belongs to `question_id`, as a single
    /// atomic update. Returns the updated choice.
    async fn increment_votes(&self, question_id: i64, choice_id: i64) -> Result<Option<Choice>>;

    async fn insert_question(&self, question_text: &str, pub_date: DateTime<Utc>)
        -> Result<Question>;

    async fn insert_choice(&self, question_id: i64, choice_text: &str) -> Result<Choice>;

    /// Removes a question together with all of its choices.
    async fn delete_question(&self, id: i64) -> Result<bool>;
}

pub(crate) fn validate_text(field: &str, text: &str) -> Result<()> {
    let len = text.chars().count();
    if len == 0 || len > MAX_TEXT_LEN {
        return Err(Error::Validation(format!(
            "{field} must be between 1 and {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(())
}

#[derive(Default)]
struct Tables {
    next_question_id: i64,
    next_choice_id: i64,
    questions: BTreeMap<i64, Question>,
    choices: BTreeMap<i64, Choice>,
}

/// In-process store. Every operation runs under one lock, so increments are
/// atomic with respect to each other.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn latest_published(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Question>> {
        let tables = self.tables.lock().await;
        let mut questions: Vec<Question> = tables
            .questions
            .values()
            .filter(|q| q.pub_date <= now)
            .filter(|q| tables.choices.values().any(|c| c.question_id == q.id))
            .cloned()
            .collect();
        questions.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        questions.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(questions)
    }

    async fn question_by_id(&self, id: i64) -> Result<Option<Question>> {
        Ok(self.tables.lock().await.questions.get(&id).cloned())
    }

    async fn choices_for_question(&self, question_id: i64) -> Result<Vec<Choice>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .choices
            .values()
            .filter(|c| c.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn increment_votes(&self, question_id: i64, choice_id: i64) -> Result<Option<Choice>> {
        let mut tables = self.tables.lock().await;
        let Some(choice) = tables
            .choices
            .get_mut(&choice_id)
            .filter(|c| c.question_id == question_id)
        else {
            return Ok(None);
        };
        choice.votes = choice.votes.checked_add(1).ok_or_else(|| {
            Error::Validation(format!("choice {choice_id} cannot take more votes"))
        })?;
        Ok(Some(choice.clone()))
    }

    async fn insert_question(
        &self,
        question_text: &str,
        pub_date: DateTime<Utc>,
    ) -> Result<Question> {
        validate_text("question_text", question_text)?;
        let mut tables = self.tables.lock().await;
        tables.next_question_id += 1;
        let question = Question {
            id: tables.next_question_id,
            question_text: question_text.to_owned(),
            pub_date,
        };
        tables.questions.insert(question.id, question.clone());
        Ok(question)
    }

    async fn insert_choice(&self, question_id: i64, choice_text: &str) -> Result<Choice> {
        validate_text("choice_text", choice_text)?;
        let mut tables = self.tables.lock().await;
        if !tables.questions.contains_key(&question_id) {
            return Err(Error::NotFound(format!(
                "question {question_id} does not exist"
            )));
        }
        tables.next_choice_id += 1;
        let choice = Choice {
            id: tables.next_choice_id,
            question_id,
            choice_text: choice_text.to_owned(),
            votes: 0,
        };
        tables.choices.insert(choice.id, choice.clone());
        Ok(choice)
    }

    async fn delete_question(&self, id: i64) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if tables.questions.remove(&id).is_none() {
            return Ok(false);
        }
        tables.choices.retain(|_, c| c.question_id != id);
        Ok(true)
    }
}
