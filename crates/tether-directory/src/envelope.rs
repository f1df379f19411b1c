//! Error classification for directory responses.
//!
//! Every response body is an open map. The typed schema never claims the
//! `error` key, so when it is present it sits in the additional data and
//! means the operation did not succeed, whatever the HTTP status said.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::DirectoryError;

/// Key under which the directory nests its error object.
pub const ERROR_KEY: &str = "error";

/// Structured error reported by the directory service.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct ServiceError {
    #[serde(default = "unknown_code")]
    pub code: String,
    #[serde(default = "unknown_message")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_error: Option<Value>,
}

fn unknown_code() -> String {
    "Unknown".into()
}

fn unknown_message() -> String {
    "unknown error".into()
}

impl ServiceError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            inner_error: None,
        }
    }
}

/// Outcome of inspecting a response envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// No error object present.
    Clean,
    /// A well-formed error object was found.
    ServiceError(ServiceError),
    /// An error key exists but its shape cannot be read.
    Malformed(String),
}

impl Envelope {
    /// `Ok(None)` when clean, `Ok(Some(_))` when the service reported an
    /// error, `Err(Decode)` when the envelope itself is unreadable.
    pub fn into_result(self) -> Result<Option<ServiceError>, DirectoryError> {
        match self {
            Envelope::Clean => Ok(None),
            Envelope::ServiceError(e) => Ok(Some(e)),
            Envelope::Malformed(msg) => Err(DirectoryError::Decode(msg)),
        }
    }
}

/// Inspect the additional data of a decoded response for an error object.
pub fn classify(additional_data: &Map<String, Value>) -> Envelope {
    match additional_data.get(ERROR_KEY) {
        None | Some(Value::Null) => Envelope::Clean,
        Some(obj @ Value::Object(_)) => match ServiceError::deserialize(obj) {
            Ok(err) => Envelope::ServiceError(err),
            Err(e) => Envelope::Malformed(format!("error envelope: {}", e)),
        },
        Some(other) => Envelope::Malformed(format!(
            "error envelope: expected an object, found {}",
            json_kind(other)
        )),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn clean_when_no_error_key() {
        let data = map(json!({ "@odata.context": "https://graph/$metadata#applications" }));
        assert_eq!(classify(&data), Envelope::Clean);
        assert!(classify(&data).into_result().unwrap().is_none());
    }

    #[test]
    fn null_error_is_clean() {
        assert_eq!(classify(&map(json!({ "error": null }))), Envelope::Clean);
    }

    #[test]
    fn well_formed_error_is_extracted() {
        let data = map(json!({
            "error": {
                "code": "Request_BadRequest",
                "message": "Another object with the same value for property appId already exists.",
                "innerError": { "request-id": "abc" }
            }
        }));
        match classify(&data) {
            Envelope::ServiceError(e) => {
                assert_eq!(e.code, "Request_BadRequest");
                assert!(e.message.contains("already exists"));
                assert_eq!(e.inner_error.unwrap()["request-id"], "abc");
            }
            other => panic!("expected service error, got {:?}", other),
        }
    }

    #[test]
    fn missing_fields_get_fallbacks() {
        match classify(&map(json!({ "error": {} }))) {
            Envelope::ServiceError(e) => assert_eq!(e.to_string(), "Unknown: unknown error"),
            other => panic!("expected service error, got {:?}", other),
        }
    }

    #[test]
    fn non_object_error_is_malformed() {
        let env = classify(&map(json!({ "error": "boom" })));
        assert!(matches!(env, Envelope::Malformed(ref m) if m.contains("a string")), "{:?}", env);
        assert!(matches!(env.into_result(), Err(DirectoryError::Decode(_))));
    }

    #[test]
    fn wrongly_typed_code_is_malformed() {
        let env = classify(&map(json!({ "error": { "code": 42, "message": "x" } })));
        assert!(matches!(env, Envelope::Malformed(_)), "{:?}", env);
    }
}
