// models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::poll;

/// Upper bound, in characters, for question and choice text.
pub const MAX_TEXT_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    pub id: i64,
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
}

impl Question {
    pub fn was_published_recently(&self, now: DateTime<Utc>) -> bool {
        poll::was_published_recently(self.pub_date, now)
    }

    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        poll::is_published(self.pub_date, now)
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.question_text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub choice_text: String,
    pub votes: i32,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.choice_text)
    }
}

/// Form body of a vote submission. The field is kept as raw text so a
/// missing or malformed selection can be answered with the detail view
/// instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct VoteForm {
    pub choice: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: i64,
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
    pub was_published_recently: bool,
}

impl QuestionView {
    pub fn new(question: &Question, now: DateTime<Utc>) -> Self {
        Self {
            id: question.id,
            question_text: question.question_text.clone(),
            pub_date: question.pub_date,
            was_published_recently: question.was_published_recently(now),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexView {
    pub latest_question_list: Vec<QuestionView>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChoiceView {
    pub id: i64,
    pub choice_text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetailView {
    pub question: QuestionView,
    pub choices: Vec<ChoiceView>,
    pub error_message: Option<String>,
}

impl DetailView {
    pub fn new(question: &Question, choices: &[Choice], now: DateTime<Utc>) -> Self {
        Self {
            question: QuestionView::new(question, now),
            choices: choices
                .iter()
                .map(|c| ChoiceView {
                    id: c.id,
                    choice_text: c.choice_text.clone(),
                })
                .collect(),
            error_message: None,
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChoiceResult {
    pub id: i64,
    pub choice_text: String,
    pub votes: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResultsView {
    pub question: QuestionView,
    pub choices: Vec<ChoiceResult>,
}

impl ResultsView {
    pub fn new(question: &Question, choices: &[Choice], now: DateTime<Utc>) -> Self {
        Self {
            question: QuestionView::new(question, now),
            choices: choices
                .iter()
                .map(|c| ChoiceResult {
                    id: c.id,
                    choice_text: c.choice_text.clone(),
                    votes: c.votes,
                })
                .collect(),
        }
    }
}
