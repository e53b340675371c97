//! Response envelopes written back to the host.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Error classes understood by host-side controllers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum ErrorClass {
    /// No command with the requested name is registered.
    CommandNotFound,
    /// The command exists but is blacklisted.
    CommandDisabled,
    /// Any other failure, including malformed requests.
    GenericError,
    /// An argument was missing or had the wrong shape.
    InvalidParameter,
}

/// Error payload of a failed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error class name.
    pub class: ErrorClass,
    /// Human-readable description.
    pub desc: String,
}

/// Reply to a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// Successful completion.
    Return {
        #[serde(rename = "return")]
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
    },
    /// Failed or rejected request.
    Error {
        error: ErrorBody,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
    },
}

impl Response {
    /// Successful response carrying `value`.
    pub fn success(value: Value, id: Option<Value>) -> Self {
        Self::Return { value, id }
    }

    /// Error response of the given class.
    pub fn error(class: ErrorClass, desc: impl Into<String>, id: Option<Value>) -> Self {
        Self::Error {
            error: ErrorBody {
                class,
                desc: desc.into(),
            },
            id,
        }
    }

    /// Error class, when this is an error response.
    #[must_use]
    pub fn error_class(&self) -> Option<ErrorClass> {
        match self {
            Self::Return { .. } => None,
            Self::Error { error, .. } => Some(error.class),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn success_serialises_return_member() {
        let response = Response::success(json!("pong"), None);
        let encoded = serde_json::to_string(&response).expect("encode");
        assert_eq!(encoded, r#"{"return":"pong"}"#);
    }

    #[test]
    fn error_serialises_class_and_description() {
        let response = Response::error(
            ErrorClass::CommandDisabled,
            "The command shutdown has been disabled for this instance",
            Some(json!(42)),
        );
        let encoded = serde_json::to_value(&response).expect("encode");
        assert_eq!(
            encoded,
            json!({
                "error": {
                    "class": "CommandDisabled",
                    "desc": "The command shutdown has been disabled for this instance"
                },
                "id": 42
            })
        );
    }

    #[test]
    fn host_side_parsing_distinguishes_variants() {
        let parsed: Response =
            serde_json::from_str(r#"{"error":{"class":"GenericError","desc":"x"}}"#)
                .expect("decode");
        assert_eq!(parsed.error_class(), Some(ErrorClass::GenericError));
        let parsed: Response = serde_json::from_str(r#"{"return":{}}"#).expect("decode");
        assert_eq!(parsed.error_class(), None);
    }
}
