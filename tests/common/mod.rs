//! Shared fixtures for the dashboard integration tests.
//!
//! `MockBackend::start()` serves canned JSON replies from an in-process warp
//! server on an ephemeral port and records every request it sees.

#![allow(dead_code)]

use chrono::Duration as TokenTtl;
use crypto_dashboard::auth::issue_token;
use crypto_dashboard::view::Confirm;
use crypto_dashboard::{ApiClient, Navigator, SessionGate};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use warp::http::{Method, StatusCode};
use warp::hyper::body::Bytes;
use warp::path::FullPath;
use warp::Filter;

pub const SECRET: &str = "test-secret";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone)]
struct Canned {
    status: u16,
    body: String,
    delay: Duration,
}

#[derive(Default)]
struct MockState {
    routes: HashMap<(String, String), Canned>,
    requests: Vec<Recorded>,
    in_flight: usize,
    max_in_flight: usize,
}

pub struct MockBackend {
    pub addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub async fn start() -> MockBackend {
        let state = Arc::new(Mutex::new(MockState::default()));
        let shared = state.clone();

        let route = warp::method()
            .and(warp::path::full())
            .and(warp::header::optional::<String>("authorization"))
            .and(warp::header::optional::<String>("content-type"))
            .and(warp::body::bytes())
            .and_then(
                move |method: Method,
                      path: FullPath,
                      authorization: Option<String>,
                      content_type: Option<String>,
                      body: Bytes| {
                    let state = shared.clone();
                    async move {
                        let canned = {
                            let mut st = state.lock().unwrap();
                            st.requests.push(Recorded {
                                method: method.to_string(),
                                path: path.as_str().to_string(),
                                authorization,
                                content_type,
                                body: String::from_utf8_lossy(&body).to_string(),
                            });
                            st.in_flight += 1;
                            st.max_in_flight = st.max_in_flight.max(st.in_flight);
                            st.routes
                                .get(&(method.to_string(), path.as_str().to_string()))
                                .cloned()
                                .unwrap_or(Canned {
                                    status: 404,
                                    body: "{}".to_string(),
                                    delay: Duration::ZERO,
                                })
                        };
                        if !canned.delay.is_zero() {
                            tokio::time::sleep(canned.delay).await;
                        }
                        state.lock().unwrap().in_flight -= 1;
                        Ok::<_, std::convert::Infallible>(warp::reply::with_status(
                            warp::reply::with_header(canned.body, "content-type", "application/json"),
                            StatusCode::from_u16(canned.status).unwrap(),
                        ))
                    }
                },
            );

        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        MockBackend { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn respond(&self, method: &str, path: &str, status: u16, body: impl Into<String>) {
        self.respond_after(method, path, status, body, Duration::ZERO);
    }

    pub fn respond_after(&self, method: &str, path: &str, status: u16, body: impl Into<String>, delay: Duration) {
        self.state.lock().unwrap().routes.insert(
            (method.to_string(), path.to_string()),
            Canned {
                status,
                body: body.into(),
                delay,
            },
        );
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }
}

pub fn token(user: &str) -> String {
    issue_token(user, Some("trader@example.com"), TokenTtl::hours(1), SECRET).unwrap()
}

pub fn signed_in_gate() -> Arc<SessionGate> {
    let gate = SessionGate::new("/login");
    gate.sign_in(&token("user-1")).unwrap();
    Arc::new(gate)
}

pub fn client(backend: &MockBackend, gate: Arc<SessionGate>) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(&backend.url(), gate, Duration::from_secs(5)).unwrap())
}

pub struct RecordingNavigator {
    route: String,
    pub visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(route: &str) -> Self {
        RecordingNavigator {
            route: route.to_string(),
            visited: Mutex::new(Vec::new()),
        }
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_route(&self) -> String {
        self.route.clone()
    }

    fn navigate(&self, route: &str) {
        self.visited.lock().unwrap().push(route.to_string());
    }
}

/// Answers every confirmation with a fixed reply and keeps the prompts.
pub struct ScriptedConfirm {
    answer: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn answering(answer: bool) -> Arc<Self> {
        Arc::new(ScriptedConfirm {
            answer,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer
    }
}

pub const ONE_BTC_PORTFOLIO: &str =
    r#"{"assets":[{"crypto_name":"BTC","amount":1.5,"price":60000,"value":90000}],"total_value":90000}"#;

pub const TWO_ALERTS: &str = r#"{"alerts":[
    {"id":"a1","symbol":"BTC","target":70000,"sent":false,"timestamp":"2024-01-02T03:04:05Z"},
    {"id":"b2","symbol":"ETH","target":4000.5,"sent":true,"timestamp":{"seconds":1700000000}}
]}"#;
