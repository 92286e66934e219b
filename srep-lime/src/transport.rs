//! HTTP transport for JSON-RPC requests
//!
//! The session client only needs "POST this JSON, give me status and body".
//! That seam is the [`Transport`] trait so the session logic can run against
//! a scripted transport in tests.

use serde_json::Value;

use crate::{LimeError, LimeResult};

const USER_AGENT: &str = concat!("srep/", env!("CARGO_PKG_VERSION"));

/// Raw HTTP reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one JSON request and returns the raw reply
pub trait Transport {
    fn post_json(&self, url: &str, body: &Value) -> LimeResult<TransportResponse>;
}

/// Blocking reqwest transport
pub struct HttpTransport {
    http_client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> LimeResult<Self> {
        let http_client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| LimeError::Transport(e.to_string()))?;

        Ok(Self { http_client })
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, url: &str, body: &Value) -> LimeResult<TransportResponse> {
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .map_err(|e| LimeError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| LimeError::Transport(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(HttpTransport::new().is_ok());
    }

    #[test]
    fn test_user_agent_names_crate_version() {
        assert!(USER_AGENT.starts_with("srep/"));
        assert!(USER_AGENT.ends_with(env!("CARGO_PKG_VERSION")));
    }
}
