use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;

use polls::models::Question;
use polls::routes;
use polls::state::AppState;
use polls::store::{MemoryStore, PollStore};

struct TestApp {
    store: Arc<MemoryStore>,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let router = routes::create_routes(AppState::new(store.clone()));
        Self { store, router }
    }

    /// Question published `days` from now (negative for the past).
    async fn create_question(&self, text: &str, days: i64) -> Question {
        self.store
            .insert_question(text, Utc::now() + Duration::days(days))
            .await
            .unwrap()
    }

    async fn add_choice(&self, question: &Question, text: &str) -> i64 {
        self.store.insert_choice(question.id, text).await.unwrap().id
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn post_vote(&self, question_id: i64, body: &str) -> (StatusCode, Option<String>, Value) {
        let request = Request::post(format!("/{question_id}/vote/"))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_owned()))
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_owned());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, location, json)
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn votes(&self, question: &Question) -> Vec<i32> {
        self.store
            .choices_for_question(question.id)
            .await
            .unwrap()
            .iter()
            .map(|c| c.votes)
            .collect()
    }
}

fn listed_texts(body: &Value) -> Vec<String> {
    body["latest_question_list"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["question_text"].as_str().unwrap().to_owned())
        .collect()
}

// Index

#[tokio::test]
async fn index_without_questions_shows_message() {
    let app = TestApp::new();
    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No polls are available.");
    assert!(listed_texts(&body).is_empty());
}

#[tokio::test]
async fn index_lists_past_question() {
    let app = TestApp::new();
    let q = app.create_question("Past question.", -30).await;
    app.add_choice(&q, "choice1").await;

    let (_, body) = app.get("/").await;
    assert_eq!(listed_texts(&body), ["Past question."]);
    assert!(body["message"].is_null());
}

#[tokio::test]
async fn index_hides_future_question() {
    let app = TestApp::new();
    let q = app.create_question("Future question.", 30).await;
    app.add_choice(&q, "choice1").await;

    let (_, body) = app.get("/").await;
    assert_eq!(body["message"], "No polls are available.");
    assert!(listed_texts(&body).is_empty());
}

#[tokio::test]
async fn index_shows_only_past_when_both_exist() {
    let app = TestApp::new();
    let past = app.create_question("Past question.", -30).await;
    let future = app.create_question("Future question.", 30).await;
    app.add_choice(&past, "choice1").await;
    app.add_choice(&future, "choice1").await;

    let (_, body) = app.get("/").await;
    assert_eq!(listed_texts(&body), ["Past question."]);
}

#[tokio::test]
async fn index_orders_newest_first() {
    let app = TestApp::new();
    let q1 = app.create_question("Past question 1.", -30).await;
    let q2 = app.create_question("Past question 2.", -5).await;
    app.add_choice(&q1, "choice1").await;
    app.add_choice(&q2, "choice1").await;

    let (_, body) = app.get("/").await;
    assert_eq!(listed_texts(&body), ["Past question 2.", "Past question 1."]);
}

#[tokio::test]
async fn index_skips_questions_without_choices() {
    let app = TestApp::new();
    app.create_question("no choices", -30).await;
    let q = app.create_question("has choices", -30).await;
    app.add_choice(&q, "choice 1").await;

    let (_, body) = app.get("/").await;
    assert_eq!(listed_texts(&body), ["has choices"]);
}

#[tokio::test]
async fn index_caps_at_five() {
    let app = TestApp::new();
    for days in 1..=8 {
        let q = app.create_question(&format!("q{days}"), -days).await;
        app.add_choice(&q, "c").await;
    }

    let (_, body) = app.get("/").await;
    assert_eq!(listed_texts(&body), ["q1", "q2", "q3", "q4", "q5"]);
}

// Detail

#[tokio::test]
async fn detail_of_future_question_is_404() {
    let app = TestApp::new();
    let q = app.create_question("Future Question", 5).await;
    app.add_choice(&q, "choice1").await;

    let (status, _) = app.get(&format!("/{}/", q.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn detail_of_past_question_shows_text_and_choices() {
    let app = TestApp::new();
    let q = app.create_question("Past Question", -5).await;
    app.add_choice(&q, "choice1").await;

    let (status, body) = app.get(&format!("/{}/", q.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["question"]["question_text"], "Past Question");
    assert_eq!(body["choices"][0]["choice_text"], "choice1");
    assert!(body["error_message"].is_null());
}

#[tokio::test]
async fn detail_without_choices_is_404() {
    let app = TestApp::new();
    let q = app.create_question("question without choice", -30).await;

    let (status, _) = app.get(&format!("/{}/", q.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn detail_with_unknown_or_malformed_id_is_404() {
    let app = TestApp::new();
    let (status, body) = app.get("/1/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, _) = app.get("/abc/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let q = app.create_question("signed", -1).await;
    app.add_choice(&q, "a").await;
    let (status, _) = app.get(&format!("/+{}/", q.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// Results

#[tokio::test]
async fn results_of_missing_question_is_404() {
    let app = TestApp::new();
    let (status, _) = app.get("/1/results/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn results_of_future_question_is_404() {
    let app = TestApp::new();
    let q = app.create_question("future question", 30).await;
    app.add_choice(&q, "choice1").await;

    let (status, _) = app.get(&format!("/{}/results/", q.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn results_of_past_question_shows_counts() {
    let app = TestApp::new();
    let q = app.create_question("past question", -30).await;
    app.add_choice(&q, "choice1").await;

    let (status, body) = app.get(&format!("/{}/results/", q.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["question"]["question_text"], "past question");
    assert_eq!(body["choices"][0]["votes"], 0);
}

#[tokio::test]
async fn results_without_choices_is_404() {
    let app = TestApp::new();
    let q = app.create_question("question", -10).await;

    let (status, _) = app.get(&format!("/{}/results/", q.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// Vote

#[tokio::test]
async fn vote_increments_selected_choice_and_redirects() {
    let app = TestApp::new();
    let q = app.create_question("q", -3).await;
    let a = app.add_choice(&q, "a").await;
    app.add_choice(&q, "b").await;

    let (status, location, body) = app.post_vote(q.id, &format!("choice={a}")).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location.as_deref(), Some(format!("/{}/results/", q.id).as_str()));
    assert!(body.is_null());
    assert_eq!(app.votes(&q).await, [1, 0]);
}

#[tokio::test]
async fn vote_without_choice_rerenders_detail() {
    let app = TestApp::new();
    let q = app.create_question("q", -3).await;
    app.add_choice(&q, "a").await;

    let (status, location, body) = app.post_vote(q.id, "").await;
    assert_eq!(status, StatusCode::OK);
    assert!(location.is_none());
    assert_eq!(body["error_message"], "You didn't select a choice.");
    assert_eq!(body["question"]["question_text"], "q");
    assert_eq!(app.votes(&q).await, [0]);
}

#[tokio::test]
async fn vote_for_other_questions_choice_changes_nothing() {
    let app = TestApp::new();
    let q = app.create_question("q", -3).await;
    app.add_choice(&q, "a").await;
    let other = app.create_question("other", -3).await;
    let foreign = app.add_choice(&other, "x").await;

    let (status, _, body) = app.post_vote(q.id, &format!("choice={foreign}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error_message"], "You didn't select a choice.");
    assert_eq!(app.votes(&q).await, [0]);
    assert_eq!(app.votes(&other).await, [0]);

    let (status, _, _) = app.post_vote(q.id, "choice=not-a-number").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.votes(&q).await, [0]);
}

#[tokio::test]
async fn vote_on_missing_question_is_404() {
    let app = TestApp::new();
    let (status, _, _) = app.post_vote(42, "choice=1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn vote_on_future_question_is_404() {
    let app = TestApp::new();
    let q = app.create_question("future", 30).await;
    let choice = app.add_choice(&q, "a").await;

    let (status, location, _) = app.post_vote(q.id, &format!("choice={choice}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(location.is_none());
    assert_eq!(app.votes(&q).await, [0]);
}

#[tokio::test]
async fn vote_requires_post() {
    let app = TestApp::new();
    let q = app.create_question("q", -3).await;
    app.add_choice(&q, "a").await;

    let (status, _) = app.get(&format!("/{}/vote/", q.id)).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

// Scenarios

#[tokio::test]
async fn past_question_full_voting_flow() {
    let app = TestApp::new();
    let q = app.create_question("Question A", -30).await;
    let x = app.add_choice(&q, "X").await;

    let (status, body) = app.get(&format!("/{}/", q.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["choices"][0]["choice_text"], "X");

    let (status, location, _) = app.post_vote(q.id, &format!("choice={x}")).await;
    assert_eq!(status, StatusCode::FOUND);
    let location = location.unwrap();

    let (status, body) = app.get(&location).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["choices"][0]["choice_text"], "X");
    assert_eq!(body["choices"][0]["votes"], 1);
}

#[tokio::test]
async fn future_question_is_hidden_everywhere() {
    let app = TestApp::new();
    let q = app.create_question("Question B", 30).await;
    app.add_choice(&q, "Y").await;

    let (status, _) = app.get(&format!("/{}/", q.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/{}/results/", q.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new();
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
