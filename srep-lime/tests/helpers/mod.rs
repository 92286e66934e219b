//! In-process fake of a LimeSurvey RemoteControl endpoint
//!
//! Runs an axum server on a background thread with its own tokio runtime,
//! so the blocking client under test can talk to it from ordinary `#[test]`
//! functions.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use srep_common::config::ConnectionSettings;

pub const USERNAME: &str = "reporter";
pub const PASSWORD: &str = "secret";

#[derive(Default)]
struct FakeState {
    surveys: Vec<Value>,
    completed: BTreeMap<u64, Value>,
    exports: BTreeMap<u64, String>,
    active_keys: HashSet<String>,
    issued: usize,
    methods: Vec<String>,
    last_params: BTreeMap<String, Value>,
}

type Shared = Arc<Mutex<FakeState>>;

/// Handle on a running fake server
pub struct FakeLimeSurvey {
    addr: SocketAddr,
    state: Shared,
}

impl FakeLimeSurvey {
    pub fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(FakeState::default()));

        let app = Router::new()
            .route("/remotecontrol", post(rpc))
            .route("/broken", post(broken))
            .route("/no-result", post(no_result))
            .with_state(Arc::clone(&state));

        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind fake server");
        listener.set_nonblocking(true).expect("non-blocking listener");
        let addr = listener.local_addr().expect("fake server address");

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("fake server runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                axum::serve(listener, app).await.expect("fake server");
            });
        });

        Self { addr, state }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Settings pointing at the RPC route with valid credentials
    pub fn settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            api_url: Some(self.url("/remotecontrol")),
            username: Some(USERNAME.to_string()),
            password: Some(PASSWORD.to_string()),
        }
    }

    /// Add a survey with its completed count (sent as text, like LimeSurvey)
    pub fn add_survey(&self, sid: u64, title: &str, completed: u64) {
        let mut state = self.state.lock().unwrap();
        state
            .surveys
            .push(json!({"sid": sid.to_string(), "surveyls_title": title, "active": "Y"}));
        state.completed.insert(sid, json!(completed.to_string()));
    }

    /// Register the `;`-separated export text for a survey
    pub fn set_export(&self, sid: u64, csv_text: &str) {
        self.state
            .lock()
            .unwrap()
            .exports
            .insert(sid, STANDARD.encode(csv_text.as_bytes()));
    }

    pub fn methods(&self) -> Vec<String> {
        self.state.lock().unwrap().methods.clone()
    }

    pub fn active_sessions(&self) -> usize {
        self.state.lock().unwrap().active_keys.len()
    }

    /// Parameters of the most recent call to `method`
    pub fn last_params(&self, method: &str) -> Option<Value> {
        self.state.lock().unwrap().last_params.get(method).cloned()
    }
}

fn result(value: Value) -> Response {
    Json(json!({"id": " ", "result": value, "error": null})).into_response()
}

async fn rpc(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let method = body["method"].as_str().unwrap_or_default().to_string();
    let params = body["params"].clone();

    let mut state = state.lock().unwrap();
    state.methods.push(method.clone());
    state.last_params.insert(method.clone(), params.clone());

    if method == "get_session_key" {
        if params["username"] == json!(USERNAME) && params["password"] == json!(PASSWORD) {
            state.issued += 1;
            let key = format!("fake-key-{}", state.issued);
            state.active_keys.insert(key.clone());
            return result(json!(key));
        }
        return result(json!({"status": "Invalid user name or password"}));
    }

    let key = params["sSessionKey"].as_str().unwrap_or_default().to_string();
    if !state.active_keys.contains(&key) {
        return result(json!({"status": "Invalid session key"}));
    }

    match method.as_str() {
        "release_session_key" => {
            state.active_keys.remove(&key);
            result(json!("OK"))
        }
        "list_surveys" if state.surveys.is_empty() => result(json!({"status": "No surveys found"})),
        "list_surveys" => result(Value::Array(state.surveys.clone())),
        "get_summary" => {
            let sid = params["iSurveyID"].as_u64().unwrap_or_default();
            match state.completed.get(&sid) {
                Some(count) => result(json!({"completed_responses": count, "full_responses": count})),
                None => result(json!({"status": "No available data"})),
            }
        }
        "export_responses" => {
            let sid = params["iSurveyID"].as_u64().unwrap_or_default();
            match state.exports.get(&sid) {
                Some(encoded) => result(json!({"csv": encoded})),
                None => result(json!({"status": "No Response found for Token"})),
            }
        }
        _ => Json(json!({"id": " ", "result": null, "error": "Invalid method"})).into_response(),
    }
}

async fn broken() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

async fn no_result() -> Response {
    Json(json!({"id": " ", "error": null})).into_response()
}
