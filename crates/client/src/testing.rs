//! Helpers shared by the unit tests of this crate.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use crate::{client::ApiClient, config::ClientConfig, stream::PageStream};

/// One event observed on a stream
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded<T> {
    Batch(Vec<T>),
    Error(String),
    Completed,
}

/// Subscribes to every event of a stream and keeps them in order
#[derive(Clone)]
pub struct Recorder<T> {
    events: Arc<Mutex<Vec<Recorded<T>>>>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn attach(stream: &PageStream<T>) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));

        let batches = Arc::clone(&events);
        let errors = Arc::clone(&events);
        let completions = Arc::clone(&events);
        stream
            .on_item_batch(move |items| batches.lock().push(Recorded::Batch(items.to_vec())))
            .on_error(move |error| errors.lock().push(Recorded::Error(error.to_string())))
            .on_completed(move || completions.lock().push(Recorded::Completed));

        Self { events }
    }

    pub fn events(&self) -> Vec<Recorded<T>> {
        self.events.lock().clone()
    }

    pub fn batches(&self) -> Vec<Vec<T>> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Recorded::Batch(items) => Some(items.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn completions(&self) -> usize {
        self.count(|event| matches!(event, Recorded::Completed))
    }

    pub fn errors(&self) -> usize {
        self.count(|event| matches!(event, Recorded::Error(_)))
    }

    fn count(&self, predicate: impl Fn(&Recorded<T>) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

/// Canned answer for one request target (path plus query)
#[derive(Clone)]
pub enum Canned {
    Json(JsonValue),
    Status(StatusCode, &'static str),
}

#[derive(Clone, Default)]
struct FakeState {
    routes: Arc<HashMap<String, Canned>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    auth_failures: Arc<AtomicUsize>,
}

/// Local HTTP server standing in for the fleet service.
///
/// Answers each request target with its canned body and counts requests per
/// target. Requests without the expected `x-auth-token` header get a 401.
pub struct FakeService {
    pub base_url: String,
    state: FakeState,
}

pub const TEST_TOKEN: &str = "test-token";

impl FakeService {
    pub async fn start(routes: Vec<(&str, Canned)>) -> Self {
        let state = FakeState {
            routes: Arc::new(
                routes
                    .into_iter()
                    .map(|(target, canned)| (target.to_string(), canned))
                    .collect(),
            ),
            ..Default::default()
        };

        let app = Router::new().fallback(answer).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Number of requests received for a target such as `/devices?page=2`
    pub fn hits(&self, target: &str) -> usize {
        self.state.hits.lock().get(target).copied().unwrap_or(0)
    }

    pub fn auth_failures(&self) -> usize {
        self.state.auth_failures.load(Ordering::SeqCst)
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(ClientConfig::new(&self.base_url).with_token(TEST_TOKEN))
            .expect("test client")
    }
}

async fn answer(State(state): State<FakeState>, request: Request) -> Response {
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();
    *state.hits.lock().entry(target.clone()).or_default() += 1;

    let token = request
        .headers()
        .get("x-auth-token")
        .and_then(|v| v.to_str().ok());
    if token != Some(TEST_TOKEN) {
        state.auth_failures.fetch_add(1, Ordering::SeqCst);
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    }

    match state.routes.get(&target) {
        Some(Canned::Json(body)) => axum::Json(body.clone()).into_response(),
        Some(Canned::Status(status, body)) => (*status, *body).into_response(),
        None => (StatusCode::NOT_FOUND, "no such route").into_response(),
    }
}
