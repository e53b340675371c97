//! Typed access to a request's argument map.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::CommandError;

/// Arguments supplied with a request.
///
/// An absent map and an empty map are distinct: [`Arguments::is_present`]
/// reports which one the host sent. Lookups on absent arguments behave like
/// lookups on an empty map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    map: Option<Map<String, Value>>,
}

impl Arguments {
    /// Wraps the request's `arguments` object; `None` means no arguments.
    pub fn new(map: Option<Map<String, Value>>) -> Self {
        Self { map }
    }

    /// Returns `true` when the request carried an `arguments` member.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.map.is_some()
    }

    /// Raw value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.map.as_ref().and_then(|map| map.get(name))
    }

    /// Value for `name`, failing when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::MissingParameter`].
    pub fn required(&self, name: &str) -> Result<&Value, CommandError> {
        self.get(name).ok_or_else(|| CommandError::MissingParameter {
            name: name.to_owned(),
        })
    }

    /// String value for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::MissingParameter`] or
    /// [`CommandError::InvalidParameter`].
    pub fn required_str(&self, name: &str) -> Result<&str, CommandError> {
        self.required(name)?
            .as_str()
            .ok_or_else(|| CommandError::invalid_parameter(name, "a string"))
    }

    /// Optional string value for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidParameter`] when present but not a
    /// string.
    pub fn optional_str(&self, name: &str) -> Result<Option<&str>, CommandError> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| CommandError::invalid_parameter(name, "a string")),
        }
    }

    /// Optional boolean value for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidParameter`] when present but not a
    /// boolean.
    pub fn optional_bool(&self, name: &str) -> Result<Option<bool>, CommandError> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| CommandError::invalid_parameter(name, "a boolean")),
        }
    }

    /// Integer value for `name`, returned verbatim so that values wider than
    /// 64 bits keep every digit.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::MissingParameter`] or
    /// [`CommandError::InvalidParameter`] when the value is not an integer.
    pub fn required_integer(&self, name: &str) -> Result<&Value, CommandError> {
        let value = self.required(name)?;
        match value {
            Value::Number(number) if is_integer_literal(&number.to_string()) => Ok(value),
            _ => Err(CommandError::invalid_parameter(name, "an integer")),
        }
    }

    /// Deserialises the whole argument map into `T`. Absent arguments
    /// deserialise from an empty map.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidArguments`] when the map does not match.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, CommandError> {
        let map = self.map.clone().unwrap_or_default();
        serde_json::from_value(Value::Object(map)).map_err(|error| {
            CommandError::InvalidArguments {
                message: error.to_string(),
            }
        })
    }
}

fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}
