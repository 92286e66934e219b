//! JSON-RPC envelope
//!
//! Requests look like `{"method": ..., "id": " ", "params": {...}}`. Replies
//! carry `result` and `error`; a reply without a `result` field is rejected
//! even when the HTTP status is a success.

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::transport::TransportResponse;
use crate::{LimeError, LimeResult};

/// Correlation id sent with every request
pub const REQUEST_ID: &str = " ";

/// Parameter carrying the session key on authenticated calls
pub const SESSION_KEY_PARAM: &str = "sSessionKey";

/// Longest excerpt of a bad reply quoted in error messages
const EXCERPT_CHARS: usize = 200;

/// Build the request body for one call
pub fn build_request(method: &str, params: Map<String, Value>) -> Value {
    json!({
        "method": method,
        "id": REQUEST_ID,
        "params": Value::Object(params),
    })
}

/// Put the session key first, dropping any caller value under the same name
pub fn with_session_key(session_key: &str, params: Map<String, Value>) -> Map<String, Value> {
    let mut full = Map::with_capacity(params.len() + 1);
    full.insert(
        SESSION_KEY_PARAM.to_string(),
        Value::String(session_key.to_string()),
    );

    for (name, value) in params {
        if name == SESSION_KEY_PARAM {
            warn!("Ignoring caller-supplied {} parameter", SESSION_KEY_PARAM);
            continue;
        }
        full.insert(name, value);
    }

    full
}

/// Check status and envelope, returning the `result` value
pub fn parse_response(method: &str, response: TransportResponse) -> LimeResult<Value> {
    if !(200..300).contains(&response.status) {
        return Err(LimeError::Protocol(format!(
            "'{}' returned HTTP {}: {}",
            method,
            response.status,
            excerpt(&response.body)
        )));
    }

    let body: Value = serde_json::from_str(&response.body).map_err(|e| {
        LimeError::Protocol(format!(
            "'{}' returned invalid JSON ({}): {}",
            method,
            e,
            excerpt(&response.body)
        ))
    })?;

    let mut envelope = match body {
        Value::Object(map) => map,
        other => {
            return Err(LimeError::Protocol(format!(
                "'{}' returned a non-object reply: {}",
                method,
                excerpt(&other.to_string())
            )))
        }
    };

    match envelope.remove("result") {
        None => Err(LimeError::Protocol(format!(
            "'{}' reply has no result field",
            method
        ))),
        Some(Value::Null) => match envelope.remove("error") {
            Some(Value::Null) | None => Ok(Value::Null),
            Some(Value::String(message)) => Err(LimeError::Protocol(format!(
                "'{}' failed remotely: {}",
                method, message
            ))),
            Some(error) => Err(LimeError::Protocol(format!(
                "'{}' failed remotely: {}",
                method, error
            ))),
        },
        Some(result) => Ok(result),
    }
}

/// First characters of a reply, for error messages
pub(crate) fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(body: &str) -> TransportResponse {
        TransportResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_request_shape() {
        let mut params = Map::new();
        params.insert("iSurveyID".into(), json!(42));
        let body = build_request("get_summary", params);

        assert_eq!(
            body,
            json!({"method": "get_summary", "id": " ", "params": {"iSurveyID": 42}})
        );
    }

    #[test]
    fn test_session_key_first_and_not_overridable() {
        let mut params = Map::new();
        params.insert("iSurveyID".into(), json!(42));
        params.insert(SESSION_KEY_PARAM.into(), json!("forged"));

        let full = with_session_key("real-key", params);
        let keys: Vec<&String> = full.keys().collect();
        assert_eq!(keys, vec![SESSION_KEY_PARAM, "iSurveyID"]);
        assert_eq!(full[SESSION_KEY_PARAM], json!("real-key"));
    }

    #[test]
    fn test_result_returned_verbatim() {
        let result = parse_response("list_surveys", ok(r#"{"id":" ","result":[{"sid":1}],"error":null}"#))
            .unwrap();
        assert_eq!(result, json!([{"sid": 1}]));
    }

    #[test]
    fn test_missing_result_is_protocol_error() {
        let err = parse_response("m", ok(r#"{"id":" ","error":null}"#)).unwrap_err();
        assert!(matches!(err, LimeError::Protocol(ref msg) if msg.contains("no result")));
    }

    #[test]
    fn test_null_result_with_error_is_protocol_error() {
        let err = parse_response("m", ok(r#"{"result":null,"error":"Invalid method"}"#)).unwrap_err();
        assert!(matches!(err, LimeError::Protocol(ref msg) if msg.contains("Invalid method")));
    }

    #[test]
    fn test_null_result_without_error_is_null() {
        let result = parse_response("m", ok(r#"{"result":null,"error":null}"#)).unwrap();
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn test_http_error_status() {
        let response = TransportResponse {
            status: 500,
            body: "Internal Server Error".into(),
        };
        let err = parse_response("m", response).unwrap_err();
        assert!(matches!(err, LimeError::Protocol(ref msg) if msg.contains("HTTP 500")));
    }

    #[test]
    fn test_invalid_json() {
        let err = parse_response("m", ok("<html>login</html>")).unwrap_err();
        assert!(matches!(err, LimeError::Protocol(_)));
    }

    #[test]
    fn test_non_object_reply() {
        let err = parse_response("m", ok("[1,2]")).unwrap_err();
        assert!(matches!(err, LimeError::Protocol(_)));
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(500);
        let short = excerpt(&long);
        assert_eq!(short.len(), EXCERPT_CHARS + 3);
        assert!(short.ends_with("..."));
        assert_eq!(excerpt("short"), "short");
    }
}
