//! Pass-through bridge to the MIA IoT control server.
//!
//! Commands and status queries are forwarded verbatim. Transport and HTTP
//! failures come back as `{"error": "..."}` so the dispatcher can narrate
//! them like any other response.

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tracing::error;

use crate::config::MiaConfig;
use crate::error::{ApiError, ApiResult, ConfigError};

pub struct MiaBridge {
    base_url: String,
    client: Client,
}

impl MiaBridge {
    pub fn new(config: &MiaConfig) -> Result<Self, ConfigError> {
        Self::with_base_url(config.base_url(), Duration::from_secs(config.timeout_secs))
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_json(resp: reqwest::Response) -> ApiResult<Value> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        resp.json().await.map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn try_execute_command(&self, command: &str) -> ApiResult<Value> {
        let payload = json!({
            "command": command,
            "source": "voice",
            "timestamp": chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
        });
        let resp = self
            .client
            .post(format!("{}/voice-command", self.base_url))
            .json(&payload)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn try_status(&self) -> ApiResult<Value> {
        let resp = self
            .client
            .get(format!("{}/status", self.base_url))
            .send()
            .await?;
        Self::read_json(resp).await
    }

    /// Forward a free-text command. Returns MIA's JSON or `{"error": ...}`.
    pub async fn execute_voice_command(&self, command: &str) -> Value {
        self.try_execute_command(command).await.unwrap_or_else(|e| {
            error!("Failed to execute voice command: {e}");
            json!({ "error": format!("Failed to execute command: {e}") })
        })
    }

    pub async fn get_status(&self) -> Value {
        self.try_status().await.unwrap_or_else(|e| {
            error!("Failed to get MIA status: {e}");
            json!({ "error": format!("Failed to get status: {e}") })
        })
    }
}

/// The `error` message of a bridge response, if it carries one.
pub fn error_message(response: &Value) -> Option<String> {
    response.get("error").map(|e| match e {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Whether a status report claims health. Any non-empty, non-zero,
/// non-false `healthy` value counts.
pub fn is_healthy(status: &Value) -> bool {
    match status.get("healthy") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// Number of entries under `devices`, whether a list or a keyed map.
pub fn device_count(status: &Value) -> usize {
    match status.get("devices") {
        Some(Value::Array(a)) => a.len(),
        Some(Value::Object(o)) => o.len(),
        _ => 0,
    }
}
