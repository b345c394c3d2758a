// handlers.rs
use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::models::{DetailView, IndexView, QuestionView, ResultsView, VoteForm};
use crate::poll::{self, VoteOutcome};
use crate::state::AppState;

/// Path ids are taken as text so a non-numeric segment is a 404 rather than
/// an extractor rejection.
fn parse_question_id(raw: &str) -> Result<i64> {
    let not_found = || Error::NotFound(format!("question {raw} does not exist"));
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(not_found());
    }
    raw.parse().map_err(|_| not_found())
}

pub fn results_url(question_id: i64) -> String {
    format!("/{question_id}/results/")
}

/// The five most recently published questions that have choices.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<IndexView>> {
    let now = Utc::now();
    let questions = state.store.latest_published(now, poll::LATEST_LIMIT).await?;
    let message = questions
        .is_empty()
        .then(|| poll::EMPTY_INDEX_MESSAGE.to_string());

    Ok(Json(IndexView {
        latest_question_list: questions
            .iter()
            .map(|q| QuestionView::new(q, now))
            .collect(),
        message,
    }))
}

#[instrument(skip(state))]
pub async fn detail(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
) -> Result<Json<DetailView>> {
    let now = Utc::now();
    let question_id = parse_question_id(&question_id)?;
    let (question, choices) = poll::visible_question(state.store.as_ref(), question_id, now).await?;
    Ok(Json(DetailView::new(&question, &choices, now)))
}

#[instrument(skip(state))]
pub async fn results(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
) -> Result<Json<ResultsView>> {
    let now = Utc::now();
    let question_id = parse_question_id(&question_id)?;
    let (question, choices) = poll::visible_question(state.store.as_ref(), question_id, now).await?;
    Ok(Json(ResultsView::new(&question, &choices, now)))
}

/// Records a vote and redirects to the results page, so reloading the
/// response never submits the vote twice.
#[instrument(skip(state, form))]
pub async fn vote(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
    form: std::result::Result<Form<VoteForm>, FormRejection>,
) -> Result<Response> {
    let now = Utc::now();
    let question_id = parse_question_id(&question_id)?;
    // A body that is not a form carries no selection.
    let form = form.map(|Form(form)| form).unwrap_or_default();

    let outcome =
        poll::cast_vote(state.store.as_ref(), question_id, form.choice.as_deref(), now).await?;

    match outcome {
        VoteOutcome::Recorded(choice) => {
            info!(question_id, choice_id = choice.id, votes = choice.votes, "vote recorded");
            Ok((
                StatusCode::FOUND,
                [(header::LOCATION, results_url(question_id))],
            )
                .into_response())
        }
        VoteOutcome::InvalidSelection { question, choices } => {
            let view = DetailView::new(&question, &choices, now).with_error(poll::NO_CHOICE_MESSAGE);
            Ok((StatusCode::OK, Json(view)).into_response())
        }
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
