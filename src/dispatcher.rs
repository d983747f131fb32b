//! Tool call routing.
//!
//! `Dispatcher::call` is the per-call boundary: it resolves the tool name,
//! decodes arguments, runs the matching handler and always returns a text
//! reply. Nothing that goes wrong inside one call escapes it.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::elevenlabs::ElevenLabsClient;
use crate::error::{ConfigError, ToolError};
use crate::mia::{self, MiaBridge};
use crate::profiles::{ProfileStore, VoiceProfile};
use crate::tools::{
    parse_args, CreateVoiceProfileArgs, GenerateSpeechArgs, GenerateSpeechFromProfileArgs,
    GetVoiceDetailsArgs, MiaStatusArgs, MiaVoiceCommandArgs, NoArgs, ToolName,
};

/// One text content block, optionally flagged as an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolReply {
    pub text: String,
    pub is_error: bool,
}

impl ToolReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

pub struct Dispatcher {
    voice: ElevenLabsClient,
    profiles: Mutex<ProfileStore>,
    mia: MiaBridge,
    audio_dir: PathBuf,
}

impl Dispatcher {
    pub fn new(
        voice: ElevenLabsClient,
        profiles: ProfileStore,
        mia: MiaBridge,
        audio_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            voice,
            profiles: Mutex::new(profiles),
            mia,
            audio_dir: audio_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let voice = ElevenLabsClient::new(&config.elevenlabs)?;
        let mia = MiaBridge::new(&config.mia)?;
        let profiles = ProfileStore::open(config.profiles.resolved_path());
        info!(
            "Voice profiles at {}, MIA bridge at {}",
            profiles.path().display(),
            mia.base_url()
        );
        Ok(Self::new(voice, profiles, mia, config.audio.resolved_dir()))
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    fn profiles(&self) -> MutexGuard<'_, ProfileStore> {
        self.profiles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn profile(&self, name: &str) -> Option<VoiceProfile> {
        self.profiles().get(name).cloned()
    }

    /// Handle one tool call. Unknown tools, bad arguments and I/O failures
    /// all come back as an error-flagged reply naming the tool.
    pub async fn call(&self, name: &str, arguments: Option<Map<String, Value>>) -> ToolReply {
        debug!("Tool call {name} with {arguments:?}");
        let outcome = match name.parse::<ToolName>() {
            Ok(tool) => self.dispatch(tool, arguments).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(text) => ToolReply::text(text),
            Err(e) => {
                warn!("Error executing tool {name}: {e}");
                ToolReply::error(format!("Error executing {name}: {e}"))
            }
        }
    }

    async fn dispatch(
        &self,
        tool: ToolName,
        arguments: Option<Map<String, Value>>,
    ) -> Result<String, ToolError> {
        match tool {
            ToolName::ListVoices => {
                let NoArgs {} = parse_args(arguments)?;
                Ok(self.list_voices().await)
            }
            ToolName::GetVoiceDetails => self.get_voice_details(parse_args(arguments)?).await,
            ToolName::GenerateSpeech => self.generate_speech(parse_args(arguments)?).await,
            ToolName::CreateVoiceProfile => self.create_voice_profile(parse_args(arguments)?),
            ToolName::ListVoiceProfiles => {
                let NoArgs {} = parse_args(arguments)?;
                Ok(self.list_voice_profiles())
            }
            ToolName::GenerateSpeechFromProfile => {
                self.generate_speech_from_profile(parse_args(arguments)?).await
            }
            ToolName::MiaVoiceCommand => self.mia_voice_command(parse_args(arguments)?).await,
            ToolName::MiaStatus => self.mia_status(parse_args(arguments)?).await,
        }
    }

    /// Persist synthesized audio to a fresh `.mp3` in the audio directory.
    fn save_audio(&self, audio: &[u8]) -> Result<PathBuf, ToolError> {
        let mut file = tempfile::Builder::new()
            .prefix("speech-")
            .suffix(".mp3")
            .tempfile_in(&self.audio_dir)?;
        file.write_all(audio)?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        debug!("Wrote {} bytes of audio to {}", audio.len(), path.display());
        Ok(path)
    }

    // --- Handlers ---

    async fn list_voices(&self) -> String {
        let voices = self.voice.list_voices().await;
        if voices.is_empty() {
            return "No voices available.".to_string();
        }
        let lines = voices
            .iter()
            .map(|v| {
                format!(
                    "- {} (ID: {}, Category: {})",
                    v.name,
                    v.voice_id,
                    v.category.as_deref().unwrap_or("unknown")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("Available voices:\n{lines}")
    }

    async fn get_voice_details(&self, args: GetVoiceDetailsArgs) -> Result<String, ToolError> {
        match self.voice.get_voice(&args.voice_id).await {
            Some(voice) => {
                let details = serde_json::to_string_pretty(&voice)
                    .unwrap_or_else(|_| format!("{voice:?}"));
                Ok(format!("Voice details:\n{details}"))
            }
            None => Ok(format!("Voice {} not found", args.voice_id)),
        }
    }

    async fn generate_speech(&self, args: GenerateSpeechArgs) -> Result<String, ToolError> {
        let settings = args.settings();
        settings.validate().map_err(ToolError::InvalidArguments)?;

        let audio = self
            .voice
            .synthesize(&args.text, &args.voice_id, Some(&args.model_id), Some(settings))
            .await;
        let Some(audio) = audio else {
            return Ok("Failed to generate speech".to_string());
        };
        let path = self.save_audio(&audio)?;
        Ok(format!(
            "Speech generated successfully. Audio saved to: {}\nText: '{}'",
            path.display(),
            args.text
        ))
    }

    fn create_voice_profile(&self, args: CreateVoiceProfileArgs) -> Result<String, ToolError> {
        let settings = args.settings();
        settings.validate().map_err(ToolError::InvalidArguments)?;

        self.profiles().create(&args.name, &args.voice_id, settings);
        info!("Created voice profile '{}' ({})", args.name, args.voice_id);
        Ok(format!(
            "Voice profile '{}' created with voice ID '{}'",
            args.name, args.voice_id
        ))
    }

    fn list_voice_profiles(&self) -> String {
        let names = self.profiles().list();
        if names.is_empty() {
            return "No voice profiles saved yet".to_string();
        }
        let lines = names
            .iter()
            .map(|n| format!("- {n}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!("Saved voice profiles:\n{lines}")
    }

    async fn generate_speech_from_profile(
        &self,
        args: GenerateSpeechFromProfileArgs,
    ) -> Result<String, ToolError> {
        let Some(profile) = self.profile(&args.profile_name) else {
            return Ok(format!("Voice profile '{}' not found", args.profile_name));
        };

        let audio = self
            .voice
            .synthesize(&args.text, &profile.voice_id, None, Some(profile.settings))
            .await;
        let Some(audio) = audio else {
            return Ok("Failed to generate speech from profile".to_string());
        };
        let path = self.save_audio(&audio)?;
        Ok(format!(
            "Speech generated from profile '{}'. Audio saved to: {}\nText: '{}'",
            args.profile_name,
            path.display(),
            args.text
        ))
    }

    async fn mia_voice_command(&self, args: MiaVoiceCommandArgs) -> Result<String, ToolError> {
        let result = self.mia.execute_voice_command(&args.command).await;

        let mut text = format!("Voice command executed: {}", args.command);
        match mia::error_message(&result) {
            None => text.push_str(". Command completed successfully."),
            Some(e) => text.push_str(&format!(". Error: {e}")),
        }

        let narration = self.narrate(&text, &args.voice_profile, "Voice response").await?;
        text.push_str(&narration);
        Ok(text)
    }

    async fn mia_status(&self, args: MiaStatusArgs) -> Result<String, ToolError> {
        let status = self.mia.get_status().await;

        let mut text = match mia::error_message(&status) {
            Some(e) => format!("MIA system status unavailable: {e}"),
            None => format!(
                "MIA system status: {}{} devices connected.",
                if mia::is_healthy(&status) {
                    "System is healthy. "
                } else {
                    "System has issues. "
                },
                mia::device_count(&status)
            ),
        };

        let narration = self.narrate(&text, &args.voice_profile, "Voice status").await?;
        text.push_str(&narration);
        Ok(text)
    }

    /// Speak `text` with the named profile and describe where the audio went.
    /// A failed synthesis adds nothing; the command result still stands.
    async fn narrate(&self, text: &str, profile_name: &str, label: &str) -> Result<String, ToolError> {
        let Some(profile) = self.profile(profile_name) else {
            return Ok(format!(
                "\nVoice profile '{profile_name}' not found; no voice response generated"
            ));
        };
        match self
            .voice
            .synthesize(text, &profile.voice_id, None, Some(profile.settings))
            .await
        {
            Some(audio) => {
                let path = self.save_audio(&audio)?;
                Ok(format!("\n{label} saved to: {}", path.display()))
            }
            None => Ok(String::new()),
        }
    }
}
