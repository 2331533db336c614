//! Router-level tests against fake providers

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::Notify;
use tower::ServiceExt;
use uuid::Uuid;

use feedback_rag::{
    build_router,
    providers::{EmbeddingProvider, LlmProvider, SearchHit, VectorSearchProvider},
    storage::{RewardLedger, SqliteLedger, UnavailableLedger},
    types::{FeedbackEvent, FeedbackLabel},
    AppState, Error, FeedbackRequest, RagConfig, Result,
};

struct FakeEmbedder;

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.0; 4])
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeSearch {
    hits: Vec<SearchHit>,
    fail: bool,
}

#[async_trait]
impl VectorSearchProvider for FakeSearch {
    async fn search(&self, _query_embedding: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        if self.fail {
            return Err(Error::vector_search("connection refused"));
        }
        Ok(self.hits.iter().take(limit).cloned().collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Answers with the number of context entries it was given
struct FakeLlm;

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn generate_answer(&self, _question: &str, context: &str) -> Result<String> {
        Ok(format!("answer from {} sources", context.matches("Source: ").count()))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

/// Holds its first page read until released
struct GatedLedger {
    inner: SqliteLedger,
    gated: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl GatedLedger {
    fn new(inner: SqliteLedger) -> Self {
        Self {
            inner,
            gated: AtomicBool::new(true),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl RewardLedger for GatedLedger {
    async fn append_feedback(&self, event: &FeedbackEvent) -> Result<Uuid> {
        self.inner.append_feedback(event).await
    }

    async fn read_feedback_page(&self, offset: usize, page_size: usize) -> Result<Vec<FeedbackEvent>> {
        if self.gated.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.read_feedback_page(offset, page_size).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.inner.health_check().await
    }

    fn name(&self) -> &str {
        "gated"
    }
}

fn hit(url: &str, similarity: f64) -> SearchHit {
    SearchHit {
        content: format!("Article at {}", url),
        metadata: json!({ "url": url }).as_object().cloned().unwrap(),
        similarity,
    }
}

fn default_hits() -> Vec<SearchHit> {
    vec![
        hit("https://a.example", 0.90),
        hit("https://b.example", 0.85),
        hit("https://c.example", 0.60),
    ]
}

fn state_with(ledger: Arc<dyn RewardLedger>, search: FakeSearch) -> AppState {
    AppState::from_parts(
        RagConfig::default(),
        Arc::new(FakeEmbedder),
        Arc::new(search),
        Arc::new(FakeLlm),
        ledger,
    )
}

async fn ready_app(ledger: Arc<dyn RewardLedger>) -> (AppState, Router) {
    let state = state_with(
        ledger,
        FakeSearch {
            hits: default_hits(),
            fail: false,
        },
    );
    state.warm_start().await;
    (state.clone(), build_router(state))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn feedback(sources: &[&str], label: &str) -> Value {
    json!({
        "query": "Who raised money?",
        "answer": "Acme did [https://b.example]",
        "sources": sources,
        "feedback": label,
    })
}

#[tokio::test]
async fn not_ready_until_warm_start() {
    let state = state_with(
        Arc::new(SqliteLedger::in_memory().unwrap()),
        FakeSearch {
            hits: default_hits(),
            fail: false,
        },
    );
    let app = build_router(state.clone());

    let (status, body) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);

    let (status, body) = send(&app, "POST", "/ask", Some(json!({"query": "q"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["type"], "not_ready");

    state.warm_start().await;
    let (status, body) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["warm_start"]["status"], "loaded");
}

#[tokio::test]
async fn ask_returns_ranked_sources() {
    let (_, app) = ready_app(Arc::new(SqliteLedger::in_memory().unwrap())).await;

    let (status, body) = send(&app, "POST", "/ask", Some(json!({"query": "Who raised?", "top_k": 2}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "Who raised?");
    assert_eq!(body["answer"], "answer from 2 sources");
    assert_eq!(body["model"], "fake-model");
    assert_eq!(body["sources"], json!(["https://a.example", "https://b.example"]));
    assert_eq!(body["scores"], json!([0.90, 0.85]));
    assert_eq!(body["bandit_scores"], json!([0.0, 0.0]));
}

#[tokio::test]
async fn ask_defaults_top_k_to_five() {
    let (_, app) = ready_app(Arc::new(SqliteLedger::in_memory().unwrap())).await;

    let (status, body) = send(&app, "POST", "/ask", Some(json!({"query": "anything"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sources"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn missing_top_k_uses_configured_default() {
    let mut config = RagConfig::default();
    config.ranking.default_top_k = 2;
    let state = AppState::from_parts(
        config,
        Arc::new(FakeEmbedder),
        Arc::new(FakeSearch {
            hits: default_hits(),
            fail: false,
        }),
        Arc::new(FakeLlm),
        Arc::new(SqliteLedger::in_memory().unwrap()),
    );
    state.warm_start().await;
    let app = build_router(state);

    let (status, body) = send(&app, "POST", "/retrieve", Some(json!({"query": "anything"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["candidates"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "POST", "/ask", Some(json!({"query": "anything"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "answer from 2 sources");
}

#[tokio::test]
async fn malformed_body_is_a_validation_error() {
    let (_, app) = ready_app(Arc::new(SqliteLedger::in_memory().unwrap())).await;

    let (status, body) = send(&app, "POST", "/ask", Some(json!({"top_k": 2}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["type"], "validation_error");
}

#[tokio::test]
async fn ask_rejects_out_of_range_top_k() {
    let (_, app) = ready_app(Arc::new(SqliteLedger::in_memory().unwrap())).await;

    for top_k in [0, 21] {
        let (status, body) =
            send(&app, "POST", "/ask", Some(json!({"query": "q", "top_k": top_k}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["type"], "validation_error");
    }
}

#[tokio::test]
async fn search_failure_fails_the_request() {
    let state = state_with(
        Arc::new(SqliteLedger::in_memory().unwrap()),
        FakeSearch {
            hits: Vec::new(),
            fail: true,
        },
    );
    state.warm_start().await;
    let app = build_router(state);

    let (status, body) = send(&app, "POST", "/ask", Some(json!({"query": "q"}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "vector_search_error");
}

#[tokio::test]
async fn positive_feedback_promotes_source() {
    let (state, app) = ready_app(Arc::new(SqliteLedger::in_memory().unwrap())).await;

    let (status, body) = send(&app, "POST", "/feedback", Some(feedback(&["https://b.example"], "positive"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["durable"], true);
    assert!(body["feedback_id"].as_str().is_some());

    let (status, body) = send(&app, "POST", "/retrieve", Some(json!({"query": "q", "top_k": 2}))).await;
    assert_eq!(status, StatusCode::OK);
    let candidates = body["candidates"].as_array().unwrap();
    assert_eq!(candidates[0]["arm_id"], "https://b.example");
    assert_eq!(candidates[0]["bandit_score"], 1.0);
    assert_eq!(candidates[1]["arm_id"], "https://a.example");

    assert_eq!(state.bandit().total_pulls(), 1);
}

#[tokio::test]
async fn unknown_label_is_rejected_before_any_update() {
    let ledger = Arc::new(SqliteLedger::in_memory().unwrap());
    let (state, app) = ready_app(ledger.clone()).await;

    let (status, body) = send(&app, "POST", "/feedback", Some(feedback(&["https://a.example"], "meh"))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["type"], "validation_error");
    assert!(body["error"]["message"].as_str().unwrap().contains("meh"));
    assert_eq!(state.bandit().total_pulls(), 0);
    assert_eq!(ledger.count().unwrap(), 0);
}

#[tokio::test]
async fn ledger_failure_is_reported_not_hidden() {
    let (state, app) = ready_app(Arc::new(UnavailableLedger::new("disk full"))).await;

    let (status, body) = send(&app, "POST", "/feedback", Some(feedback(&["https://a.example"], "negative"))).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "recorded_not_durable");
    assert_eq!(body["durable"], false);
    assert!(body["ledger_error"].as_str().unwrap().contains("disk full"));
    assert_eq!(state.bandit().arm("https://a.example").unwrap().pulls, 1);
}

#[tokio::test]
async fn unavailable_ledger_still_serves_queries() {
    let (_, app) = ready_app(Arc::new(UnavailableLedger::new("no such table"))).await;

    let (status, body) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["warm_start"]["status"], "cold_start");

    let (status, body) = send(&app, "POST", "/ask", Some(json!({"query": "q", "top_k": 1}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bandit_scores"], json!([0.0]));

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["ledger"], "unavailable");
    assert_eq!(body["vector_search"], "ok");
}

#[tokio::test]
async fn health_ok_when_everything_answers() {
    let (_, app) = ready_app(Arc::new(SqliteLedger::in_memory().unwrap())).await;

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn warm_start_replays_existing_history() {
    let ledger = Arc::new(SqliteLedger::in_memory().unwrap());
    for (sources, label) in [
        (vec!["https://a.example", "https://c.example"], FeedbackLabel::Positive),
        (vec!["https://a.example"], FeedbackLabel::Negative),
    ] {
        let event = FeedbackEvent::from_request(FeedbackRequest {
            query: "q".to_string(),
            answer: "a".to_string(),
            sources: sources.into_iter().map(String::from).collect(),
            feedback: label,
        });
        ledger.append_feedback(&event).await.unwrap();
    }

    let (_, app) = ready_app(ledger).await;

    let (status, body) = send(&app, "GET", "/bandit", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_pulls"], 3);
    assert_eq!(body["arms"]["https://a.example"]["pulls"], 2);
    assert_eq!(body["arms"]["https://a.example"]["total_reward"], 1.0);
    assert_eq!(body["arms"]["https://c.example"]["pulls"], 1);
}

#[tokio::test]
async fn second_warm_start_is_a_no_op() {
    let ledger = Arc::new(SqliteLedger::in_memory().unwrap());
    let (state, app) = ready_app(ledger).await;

    send(&app, "POST", "/feedback", Some(feedback(&["https://a.example"], "positive"))).await;
    let outcome = state.warm_start().await;

    assert_eq!(outcome, feedback_rag::WarmStart::AlreadyLoaded);
    assert_eq!(state.bandit().total_pulls(), 1);
}

#[tokio::test]
async fn overlapping_warm_start_waits_for_the_replay() {
    let sqlite = SqliteLedger::in_memory().unwrap();
    let event = FeedbackEvent::from_request(FeedbackRequest {
        query: "q".to_string(),
        answer: "a".to_string(),
        sources: vec!["https://a.example".to_string()],
        feedback: FeedbackLabel::Positive,
    });
    sqlite.append_feedback(&event).await.unwrap();

    let ledger = Arc::new(GatedLedger::new(sqlite));
    let state = state_with(
        ledger.clone(),
        FakeSearch {
            hits: default_hits(),
            fail: false,
        },
    );
    let app = build_router(state.clone());

    let first = tokio::spawn({
        let state = state.clone();
        async move { state.warm_start().await }
    });
    ledger.entered.notified().await;

    let second = tokio::spawn({
        let state = state.clone();
        async move { state.warm_start().await }
    });
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert!(!second.is_finished());
    assert!(!state.is_ready());

    let (status, body) = send(&app, "POST", "/feedback", Some(feedback(&["https://a.example"], "positive"))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["type"], "not_ready");

    ledger.release.notify_one();
    assert_eq!(
        first.await.unwrap(),
        feedback_rag::WarmStart::Loaded {
            events: 1,
            updates: 1,
            arms: 1
        }
    );
    assert_eq!(second.await.unwrap(), feedback_rag::WarmStart::AlreadyLoaded);
    assert_eq!(state.bandit().total_pulls(), 1);

    let (status, _) = send(&app, "POST", "/feedback", Some(feedback(&["https://a.example"], "positive"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.bandit().total_pulls(), 2);
    assert_eq!(state.bandit().arm("https://a.example").unwrap().pulls, 2);
}
