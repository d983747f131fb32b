//! ElevenLabs text-to-speech API client.
//!
//! Every public operation degrades instead of failing: transport and HTTP
//! errors are logged and turned into an empty list or `None`, so callers can
//! always produce a text response. The `try_*` methods carry the reason.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::config::{ElevenLabsConfig, DEFAULT_MODEL_ID};
use crate::error::{ApiError, ApiResult, ConfigError};

const API_KEY_HEADER: &str = "xi-api-key";

/// Stability and similarity-boost knobs sent with every synthesis request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesisSettings {
    pub stability: f64,
    pub similarity_boost: f64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.5,
        }
    }
}

impl SynthesisSettings {
    pub fn new(stability: f64, similarity_boost: f64) -> Self {
        Self {
            stability,
            similarity_boost,
        }
    }

    /// Both values must lie in [0, 1].
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("stability", self.stability),
            ("similarity_boost", self.similarity_boost),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} must be between 0.0 and 1.0, got {value}"));
            }
        }
        Ok(())
    }
}

/// A voice as returned by `/v1/voices`. Fields we don't read are kept in
/// `extra` so the details view can show the full record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    pub voice_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<Voice>,
}

pub struct ElevenLabsClient {
    base_url: Url,
    default_model: String,
    client: Client,
}

impl ElevenLabsClient {
    /// Build a client from config. Fails when no usable API key is available
    /// or the base URL cannot carry a path.
    pub fn new(config: &ElevenLabsConfig) -> Result<Self, ConfigError> {
        let api_key = config.resolve_api_key()?;
        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| ConfigError::InvalidBaseUrl(config.base_url.clone()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(&api_key).map_err(|_| ConfigError::InvalidApiKey)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            default_model: config.model_id.clone(),
            client,
        })
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Append `segments` to the base URL, each percent-encoded as a single
    /// path segment. Empty, `.` and `..` segments are refused.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(ApiError::InvalidPath(bad.to_string()));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidPath(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<reqwest::Response> {
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        let resp = self.send(self.client.get(self.endpoint(segments)?)).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn try_list_voices(&self) -> ApiResult<Vec<Voice>> {
        let data: VoicesResponse = self.get_json(&["v1", "voices"]).await?;
        Ok(data.voices)
    }

    pub async fn try_get_voice(&self, voice_id: &str) -> ApiResult<Voice> {
        self.get_json(&["v1", "voices", voice_id]).await
    }

    pub async fn try_synthesize(
        &self,
        text: &str,
        voice_id: &str,
        model_id: Option<&str>,
        settings: Option<SynthesisSettings>,
    ) -> ApiResult<Vec<u8>> {
        let body = json!({
            "text": text,
            "model_id": model_id.unwrap_or(&self.default_model),
            "voice_settings": settings.unwrap_or_default(),
        });
        let request = self
            .client
            .post(self.endpoint(&["v1", "text-to-speech", voice_id])?)
            .header(ACCEPT, "audio/mpeg")
            .json(&body);
        let resp = self.send(request).await?;
        let bytes = resp.bytes().await?;
        debug!("Synthesized {} bytes of audio with voice {voice_id}", bytes.len());
        Ok(bytes.to_vec())
    }

    pub async fn try_list_models(&self) -> ApiResult<Vec<serde_json::Value>> {
        self.get_json(&["v1", "models"]).await
    }

    pub async fn try_get_user_info(&self) -> ApiResult<serde_json::Value> {
        self.get_json(&["v1", "user"]).await
    }

    /// List available voices. Empty on failure.
    pub async fn list_voices(&self) -> Vec<Voice> {
        self.try_list_voices().await.unwrap_or_else(|e| {
            error!("Failed to get voices: {e}");
            Vec::new()
        })
    }

    pub async fn get_voice(&self, voice_id: &str) -> Option<Voice> {
        self.try_get_voice(voice_id)
            .await
            .map_err(|e| error!("Failed to get voice {voice_id}: {e}"))
            .ok()
    }

    /// Synthesize `text` to MP3 bytes. `None` on failure.
    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        model_id: Option<&str>,
        settings: Option<SynthesisSettings>,
    ) -> Option<Vec<u8>> {
        self.try_synthesize(text, voice_id, model_id, settings)
            .await
            .map_err(|e| error!("Failed to generate speech: {e}"))
            .ok()
    }

    pub async fn list_models(&self) -> Vec<serde_json::Value> {
        self.try_list_models().await.unwrap_or_else(|e| {
            error!("Failed to get models: {e}");
            Vec::new()
        })
    }

    pub async fn get_user_info(&self) -> Option<serde_json::Value> {
        self.try_get_user_info()
            .await
            .map_err(|e| error!("Failed to get user info: {e}"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ElevenLabsClient {
        let config = ElevenLabsConfig {
            api_key: Some("test-key".into()),
            base_url: server.uri(),
            ..Default::default()
        };
        ElevenLabsClient::new(&config).unwrap()
    }

    #[test]
    fn settings_out_of_range_rejected() {
        assert!(SynthesisSettings::new(0.0, 1.0).validate().is_ok());
        let err = SynthesisSettings::new(1.2, 0.5).validate().unwrap_err();
        assert!(err.contains("stability"));
        let err = SynthesisSettings::new(0.5, -0.1).validate().unwrap_err();
        assert!(err.contains("similarity_boost"));
    }

    #[tokio::test]
    async fn list_voices_sends_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/voices"))
            .and(header("xi-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "voices": [{"name": "Test Voice", "voice_id": "test-123", "category": "premade"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let voices = client_for(&server).list_voices().await;
        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0].name, "Test Voice");
        assert_eq!(voices[0].voice_id, "test-123");
        assert_eq!(voices[0].category.as_deref(), Some("premade"));
    }

    #[tokio::test]
    async fn list_voices_degrades_to_empty_on_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/voices"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.list_voices().await.is_empty());
        assert!(matches!(
            client.try_list_voices().await,
            Err(ApiError::Status { status, .. }) if status.as_u16() == 500
        ));
    }

    #[tokio::test]
    async fn synthesize_requests_audio_with_default_settings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice-123"))
            .and(header("accept", "audio/mpeg"))
            .and(body_partial_json(json!({
                "text": "Hello world",
                "model_id": "eleven_monolingual_v1",
                "voice_settings": {"stability": 0.5, "similarity_boost": 0.5}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-audio-data".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let audio = client_for(&server)
            .synthesize("Hello world", "voice-123", None, None)
            .await;
        assert_eq!(audio.as_deref(), Some(&b"fake-audio-data"[..]));
    }

    #[tokio::test]
    async fn synthesize_passes_explicit_model_and_settings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice-123"))
            .and(body_partial_json(json!({
                "model_id": "model-456",
                "voice_settings": {"stability": 0.8, "similarity_boost": 0.7}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"audio-data".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let audio = client_for(&server)
            .synthesize(
                "Test",
                "voice-123",
                Some("model-456"),
                Some(SynthesisSettings::new(0.8, 0.7)),
            )
            .await;
        assert!(audio.is_some());
    }

    #[tokio::test]
    async fn synthesize_returns_none_on_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let audio = client_for(&server)
            .synthesize("Hi", "voice-123", None, None)
            .await;
        assert!(audio.is_none());
    }

    #[tokio::test]
    async fn get_voice_keeps_extra_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/voices/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "voice_id": "abc", "name": "Rachel", "labels": {"accent": "american"}
            })))
            .mount(&server)
            .await;

        let voice = client_for(&server).get_voice("abc").await.unwrap();
        assert_eq!(voice.name, "Rachel");
        assert_eq!(voice.extra["labels"]["accent"], "american");
        assert!(client_for(&server).get_voice("missing").await.is_none());
    }

    #[tokio::test]
    async fn models_and_user_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"model_id": "eleven_monolingual_v1"}, {"model_id": "eleven_multilingual_v2"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/user"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.list_models().await.len(), 2);
        assert!(client.get_user_info().await.is_none());
    }

    #[tokio::test]
    async fn unreachable_backend_degrades() {
        let config = ElevenLabsConfig {
            api_key: Some("test-key".into()),
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            ..Default::default()
        };
        let client = ElevenLabsClient::new(&config).unwrap();
        assert!(client.list_voices().await.is_empty());
        assert!(client.synthesize("x", "v", None, None).await.is_none());
    }

    #[tokio::test]
    async fn voice_id_stays_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "voice_id": "USER", "name": "account"
            })))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/voices/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "voice_id": "abc", "name": "Rachel"
            })))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.get_voice("../user").await.is_none());
        assert!(client.get_voice("abc?x=1").await.is_none());
        assert!(client.get_voice("abc#frag").await.is_none());
        assert!(matches!(
            client.try_get_voice("..").await,
            Err(ApiError::InvalidPath(seg)) if seg == ".."
        ));
        assert!(client.synthesize("x", "..", None, None).await.is_none());
    }

    #[test]
    fn endpoint_encodes_reserved_characters() {
        let config = ElevenLabsConfig {
            api_key: Some("k".into()),
            base_url: "https://api.example.com/prefix/".into(),
            ..Default::default()
        };
        let client = ElevenLabsClient::new(&config).unwrap();
        let url = client.endpoint(&["v1", "voices", "a/b?c"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/prefix/v1/voices/a%2Fb%3Fc");
    }

    #[test]
    fn missing_or_blank_api_key_is_fatal() {
        // the only test that touches the variable
        std::env::remove_var(crate::config::API_KEY_ENV);

        assert!(matches!(
            ElevenLabsClient::new(&ElevenLabsConfig::default()),
            Err(ConfigError::MissingApiKey)
        ));
        let blank = ElevenLabsConfig {
            api_key: Some("   ".into()),
            ..Default::default()
        };
        assert!(matches!(
            ElevenLabsClient::new(&blank),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn api_key_is_trimmed_or_rejected() {
        let padded = ElevenLabsConfig {
            api_key: Some("abc\n".into()),
            ..Default::default()
        };
        assert_eq!(padded.resolve_api_key().unwrap(), "abc");
        assert!(ElevenLabsClient::new(&padded).is_ok());

        let control = ElevenLabsConfig {
            api_key: Some("ab\u{7}c".into()),
            ..Default::default()
        };
        assert!(matches!(
            ElevenLabsClient::new(&control),
            Err(ConfigError::InvalidApiKey)
        ));
    }

    #[test]
    fn opaque_base_url_is_rejected() {
        let config = ElevenLabsConfig {
            api_key: Some("k".into()),
            base_url: "mailto:someone@example.com".into(),
            ..Default::default()
        };
        assert!(matches!(
            ElevenLabsClient::new(&config),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn default_model_comes_from_config() {
        let config = ElevenLabsConfig {
            api_key: Some("k".into()),
            ..Default::default()
        };
        let client = ElevenLabsClient::new(&config).unwrap();
        assert_eq!(client.default_model(), DEFAULT_MODEL_ID);
    }
}
