//! Session-key lifecycle
//!
//! `LoggedOut → LoggedIn → LoggedOut`. [`LimeSession::login`] acquires and
//! caches a session key, [`LimeSession::call`] attaches it to every request,
//! and [`LimeSession::release`] hands it back. A second login overwrites the
//! cached key.
//!
//! The session is an ordinary value owned by the caller. Nothing is cached
//! process-wide, so several sessions (e.g. in tests) do not interfere.

use serde_json::{Map, Value};
use srep_common::config::ConnectionSettings;
use tracing::{debug, info, warn};

use crate::rpc::{build_request, parse_response, with_session_key};
use crate::transport::{HttpTransport, Transport};
use crate::{LimeError, LimeResult};

/// Login reply for bad credentials
pub const INVALID_CREDENTIALS: &str = "Invalid user name or password";

const METHOD_LOGIN: &str = "get_session_key";
const METHOD_RELEASE: &str = "release_session_key";

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    LoggedOut,
    LoggedIn { api_url: String, session_key: String },
}

/// Authenticated access to one LimeSurvey endpoint
pub struct LimeSession<T: Transport = HttpTransport> {
    transport: T,
    settings: ConnectionSettings,
    state: SessionState,
}

impl LimeSession<HttpTransport> {
    /// Session over HTTP with the given connection settings
    pub fn new(settings: ConnectionSettings) -> LimeResult<Self> {
        Ok(Self::with_transport(settings, HttpTransport::new()?))
    }

    /// Session over HTTP configured from `LIME_API_URL`, `LIME_USERNAME`
    /// and `LIME_PASSWORD`
    pub fn from_env() -> LimeResult<Self> {
        Self::new(ConnectionSettings::from_env())
    }
}

impl<T: Transport> LimeSession<T> {
    pub fn with_transport(settings: ConnectionSettings, transport: T) -> Self {
        Self {
            transport,
            settings,
            state: SessionState::LoggedOut,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.state, SessionState::LoggedIn { .. })
    }

    /// Acquire a session key with the configured credentials
    ///
    /// # Errors
    /// - [`LimeError::Configuration`] if URL, username or password is missing
    /// - [`LimeError::Authentication`] if the remote rejects the credentials
    /// - [`LimeError::Transport`] / [`LimeError::Protocol`] on a failed exchange
    pub fn login(&mut self) -> LimeResult<()> {
        let credentials = self.settings.require()?;

        let mut params = Map::new();
        params.insert(
            "username".to_string(),
            Value::String(credentials.username.clone()),
        );
        params.insert(
            "password".to_string(),
            Value::String(credentials.password.clone()),
        );

        debug!(method = METHOD_LOGIN, url = %credentials.api_url, "Calling LimeSurvey API");
        let response = self
            .transport
            .post_json(&credentials.api_url, &build_request(METHOD_LOGIN, params))?;
        let session_key = session_key_from_result(parse_response(METHOD_LOGIN, response)?)?;

        if self.is_logged_in() {
            debug!("Replacing existing session key");
        }
        self.state = SessionState::LoggedIn {
            api_url: credentials.api_url,
            session_key,
        };

        info!(username = %credentials.username, "Logged in to LimeSurvey API");
        Ok(())
    }

    /// Call a remote method with the session key attached
    ///
    /// The session key always wins over a caller parameter of the same name.
    /// Returns the reply's `result` value as-is.
    ///
    /// # Errors
    /// - [`LimeError::NotAuthenticated`] before login (no request is sent)
    /// - [`LimeError::Transport`] on network failure
    /// - [`LimeError::Protocol`] on a non-2xx status or malformed reply
    pub fn call(&self, method: &str, params: Map<String, Value>) -> LimeResult<Value> {
        let (api_url, session_key) = match &self.state {
            SessionState::LoggedIn {
                api_url,
                session_key,
            } => (api_url, session_key),
            SessionState::LoggedOut => {
                return Err(LimeError::NotAuthenticated(method.to_string()))
            }
        };

        let body = build_request(method, with_session_key(session_key, params));

        debug!(method = %method, "Calling LimeSurvey API");
        let response = self.transport.post_json(api_url, &body)?;
        parse_response(method, response)
    }

    /// Release the session key
    ///
    /// The session is logged out afterwards even if the remote call fails.
    /// Releasing a logged-out session does nothing.
    pub fn release(&mut self) -> LimeResult<()> {
        if !self.is_logged_in() {
            return Ok(());
        }

        let outcome = self.call(METHOD_RELEASE, Map::new());
        self.state = SessionState::LoggedOut;
        outcome?;

        info!("Released LimeSurvey session key");
        Ok(())
    }

    /// Log in, run `work`, and release on every exit path
    ///
    /// An error from `work` takes precedence over a failed release.
    pub fn scoped<R, E, F>(&mut self, work: F) -> Result<R, E>
    where
        F: FnOnce(&mut Self) -> Result<R, E>,
        E: From<LimeError>,
    {
        self.login()?;
        let outcome = work(self);
        let released = self.release();

        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release_err)) => Err(release_err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(release_err)) => {
                warn!("Session release failed after error: {}", release_err);
                Err(err)
            }
        }
    }
}

impl<T: Transport> Drop for LimeSession<T> {
    fn drop(&mut self) {
        if self.is_logged_in() {
            warn!("LimeSurvey session dropped while logged in; releasing session key");
            if let Err(e) = self.release() {
                warn!("Session release on drop failed: {}", e);
            }
        }
    }
}

/// Interpret the `get_session_key` result
fn session_key_from_result(result: Value) -> LimeResult<String> {
    match result {
        Value::String(text) if text == INVALID_CREDENTIALS => {
            Err(LimeError::Authentication(text))
        }
        Value::String(text) if text.trim().is_empty() => Err(LimeError::Protocol(
            "get_session_key returned an empty session key".to_string(),
        )),
        Value::String(text) => Ok(text),
        Value::Object(map) => {
            let status = map.get("status").and_then(Value::as_str).map(str::to_string);
            match status {
                Some(status) => Err(LimeError::Authentication(status)),
                None => Err(LimeError::UnexpectedFormat(format!(
                    "get_session_key returned {}",
                    Value::Object(map)
                ))),
            }
        }
        other => Err(LimeError::UnexpectedFormat(format!(
            "get_session_key returned {}",
            other
        ))),
    }
}
