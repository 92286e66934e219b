//! Scripted transport for unit tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::{json, Value};
use srep_common::config::ConnectionSettings;

use crate::transport::{Transport, TransportResponse};
use crate::{LimeError, LimeResult};

pub const TEST_URL: &str = "https://survey.example/index.php/admin/remotecontrol";
pub const TEST_SESSION_KEY: &str = "test-session-key";

pub type RequestLog = Rc<RefCell<Vec<(String, Value)>>>;

pub fn settings() -> ConnectionSettings {
    ConnectionSettings {
        api_url: Some(TEST_URL.to_string()),
        username: Some("reporter".to_string()),
        password: Some("secret".to_string()),
    }
}

/// Replays queued replies in order and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<LimeResult<TransportResponse>>>,
    log: RequestLog,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose first reply is a successful login
    pub fn after_login() -> Self {
        Self::new().reply(json!(TEST_SESSION_KEY))
    }

    /// Queue a successful JSON-RPC reply carrying `result`
    pub fn reply(self, result: Value) -> Self {
        let body = json!({"id": " ", "result": result, "error": null});
        self.reply_raw(200, &body.to_string())
    }

    pub fn reply_raw(self, status: u16, body: &str) -> Self {
        self.replies.borrow_mut().push_back(Ok(TransportResponse {
            status,
            body: body.to_string(),
        }));
        self
    }

    /// Queue a network failure
    pub fn fail(self, message: &str) -> Self {
        self.replies
            .borrow_mut()
            .push_back(Err(LimeError::Transport(message.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.log.borrow().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .map(|(_, body)| body["method"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Shared handle on the request log, usable after the transport is dropped
    pub fn log(&self) -> RequestLog {
        Rc::clone(&self.log)
    }
}

impl Transport for ScriptedTransport {
    fn post_json(&self, url: &str, body: &Value) -> LimeResult<TransportResponse> {
        self.log.borrow_mut().push((url.to_string(), body.clone()));
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(LimeError::Transport("no scripted reply".to_string())))
    }
}
