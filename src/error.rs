//! Error types for the server.
//!
//! Only `ConfigError` is ever fatal. `ApiError` is consumed inside the
//! backend clients and `ToolError` is turned into a text result at the
//! dispatch boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("ElevenLabs API key not provided (use --elevenlabs-api-key or set ELEVENLABS_API_KEY)")]
    MissingApiKey,

    #[error("ElevenLabs API key contains characters not allowed in an HTTP header")]
    InvalidApiKey,

    #[error("Invalid ElevenLabs base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("invalid path segment: {0:?}")]
    InvalidPath(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Failed to write audio file: {0}")]
    AudioWrite(#[from] std::io::Error),
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidArguments(e.to_string())
    }
}
