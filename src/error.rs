use serde::Serialize;
use thiserror::Error;

use crate::content::ContentError;
use crate::plugin::PluginError;
use crate::runtime::RuntimeError;

#[derive(Debug, Error)]
pub enum PanoramaError {
    #[error("Unknown client request type: {0}")]
    UnknownRequest(String),

    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

// Client-facing errors travel as plain strings
impl Serialize for PanoramaError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PanoramaError>;
