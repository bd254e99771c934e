//! Untyped client request payloads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("payload does not contain key {0:?}")]
    MissingKey(String),

    #[error("payload key {key:?} is not a {expected}")]
    WrongType { key: String, expected: &'static str },
}

/// String-keyed JSON map sent by the client alongside a request type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(serde_json::Map<String, serde_json::Value>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    /// Extract a required string field.
    pub fn string(&self, key: &str) -> Result<String, PayloadError> {
        let value = self
            .0
            .get(key)
            .ok_or_else(|| PayloadError::MissingKey(key.to_string()))?;

        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PayloadError::WrongType {
                key: key.to_string(),
                expected: "string",
            })
    }

    /// Extract an optional object field. Present-but-not-an-object is an error.
    pub fn object(
        &self,
        key: &str,
    ) -> Result<Option<&serde_json::Map<String, serde_json::Value>>, PayloadError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_object()
                .map(Some)
                .ok_or_else(|| PayloadError::WrongType {
                    key: key.to_string(),
                    expected: "object",
                }),
        }
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Payload {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<serde_json::Value> for Payload {
    type Error = PayloadError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Object(map) => Ok(Self(map)),
            _ => Err(PayloadError::WrongType {
                key: String::new(),
                expected: "object",
            }),
        }
    }
}

/// Request frame received from a client: a request type plus its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRequest {
    #[serde(rename = "type")]
    pub request_type: String,
    #[serde(default)]
    pub payload: Payload,
}
