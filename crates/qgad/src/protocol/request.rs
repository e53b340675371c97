//! Request envelopes decoded from the channel.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Command invocation sent by the host.
///
/// `arguments` distinguishes an absent map from an empty one; `id` is opaque
/// and echoed on the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Command name.
    pub execute: String,
    /// Command arguments, when supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Map<String, Value>>,
    /// Correlation identifier echoed back to the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl Request {
    /// Builds a request without arguments.
    pub fn new(execute: impl Into<String>) -> Self {
        Self {
            execute: execute.into(),
            arguments: None,
            id: None,
        }
    }
}

/// One JSON value read from the channel, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A well-formed request.
    Request(Request),
    /// Valid JSON that is not a request object.
    Invalid {
        /// `id` member of the value, when it was an object carrying one.
        id: Option<Value>,
        /// Why the value was rejected.
        reason: String,
    },
}

impl Frame {
    /// Classifies a decoded JSON value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let Value::Object(object) = value else {
            return Self::Invalid {
                id: None,
                reason: format!("expected a JSON object, found {}", json_kind(&value)),
            };
        };
        let id = object.get("id").filter(|id| !id.is_null()).cloned();
        match serde_json::from_value::<Request>(Value::Object(object)) {
            Ok(request) => Self::Request(request),
            Err(error) => Self::Invalid {
                id,
                reason: error.to_string(),
            },
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
