//! The fixed tool catalog.
//!
//! `ToolName` is the closed set of callable tools; each variant owns its
//! wire name, description and argument type. The argument structs double
//! as the JSON Schema source advertised to the host.

use std::str::FromStr;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::DEFAULT_MODEL_ID;
use crate::elevenlabs::SynthesisSettings;
use crate::error::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ListVoices,
    GetVoiceDetails,
    GenerateSpeech,
    CreateVoiceProfile,
    ListVoiceProfiles,
    GenerateSpeechFromProfile,
    MiaVoiceCommand,
    MiaStatus,
}

impl ToolName {
    pub const ALL: [ToolName; 8] = [
        ToolName::ListVoices,
        ToolName::GetVoiceDetails,
        ToolName::GenerateSpeech,
        ToolName::CreateVoiceProfile,
        ToolName::ListVoiceProfiles,
        ToolName::GenerateSpeechFromProfile,
        ToolName::MiaVoiceCommand,
        ToolName::MiaStatus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::ListVoices => "elevenlabs_list_voices",
            ToolName::GetVoiceDetails => "elevenlabs_get_voice_details",
            ToolName::GenerateSpeech => "elevenlabs_generate_speech",
            ToolName::CreateVoiceProfile => "elevenlabs_create_voice_profile",
            ToolName::ListVoiceProfiles => "elevenlabs_list_voice_profiles",
            ToolName::GenerateSpeechFromProfile => "elevenlabs_generate_speech_from_profile",
            ToolName::MiaVoiceCommand => "mia_voice_command",
            ToolName::MiaStatus => "mia_get_status_voice",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolName::ListVoices => "List all available ElevenLabs voices",
            ToolName::GetVoiceDetails => "Get detailed information about a specific voice",
            ToolName::GenerateSpeech => "Convert text to speech using ElevenLabs",
            ToolName::CreateVoiceProfile => {
                "Create a reusable voice profile with specific settings"
            }
            ToolName::ListVoiceProfiles => "List all saved voice profiles",
            ToolName::GenerateSpeechFromProfile => "Generate speech using a saved voice profile",
            ToolName::MiaVoiceCommand => "Execute a voice command to control MIA IoT devices",
            ToolName::MiaStatus => "Get MIA system status with voice feedback",
        }
    }

    /// JSON Schema of the tool's argument object.
    pub fn input_schema(self) -> Map<String, Value> {
        let schema = match self {
            ToolName::ListVoices | ToolName::ListVoiceProfiles => schemars::schema_for!(NoArgs),
            ToolName::GetVoiceDetails => schemars::schema_for!(GetVoiceDetailsArgs),
            ToolName::GenerateSpeech => schemars::schema_for!(GenerateSpeechArgs),
            ToolName::CreateVoiceProfile => schemars::schema_for!(CreateVoiceProfileArgs),
            ToolName::GenerateSpeechFromProfile => {
                schemars::schema_for!(GenerateSpeechFromProfileArgs)
            }
            ToolName::MiaVoiceCommand => schemars::schema_for!(MiaVoiceCommandArgs),
            ToolName::MiaStatus => schemars::schema_for!(MiaStatusArgs),
        };
        match serde_json::to_value(schema) {
            Ok(Value::Object(map)) => map,
            _ => {
                let mut map = Map::new();
                map.insert("type".into(), Value::String("object".into()));
                map
            }
        }
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode a tool's argument object into its typed form.
pub fn parse_args<T: serde::de::DeserializeOwned>(
    arguments: Option<Map<String, Value>>,
) -> Result<T, ToolError> {
    Ok(serde_json::from_value(Value::Object(arguments.unwrap_or_default()))?)
}

fn default_half() -> f64 {
    0.5
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_profile() -> String {
    "default".to_string()
}

// --- Tool argument structs ---

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoArgs {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetVoiceDetailsArgs {
    #[schemars(description = "Voice ID to get details for")]
    pub voice_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateSpeechArgs {
    #[schemars(description = "Text to convert to speech")]
    pub text: String,
    #[schemars(description = "Voice ID to use")]
    pub voice_id: String,
    #[serde(default = "default_model_id")]
    #[schemars(description = "Model ID to use")]
    pub model_id: String,
    #[serde(default = "default_half")]
    #[schemars(description = "Voice stability (0.0-1.0)")]
    pub stability: f64,
    #[serde(default = "default_half")]
    #[schemars(description = "Similarity boost (0.0-1.0)")]
    pub similarity_boost: f64,
}

impl GenerateSpeechArgs {
    pub fn settings(&self) -> SynthesisSettings {
        SynthesisSettings::new(self.stability, self.similarity_boost)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateVoiceProfileArgs {
    #[schemars(description = "Profile name")]
    pub name: String,
    #[schemars(description = "Voice ID to associate with profile")]
    pub voice_id: String,
    #[serde(default = "default_half")]
    #[schemars(description = "Voice stability setting (0.0-1.0)")]
    pub stability: f64,
    #[serde(default = "default_half")]
    #[schemars(description = "Similarity boost setting (0.0-1.0)")]
    pub similarity_boost: f64,
}

impl CreateVoiceProfileArgs {
    pub fn settings(&self) -> SynthesisSettings {
        SynthesisSettings::new(self.stability, self.similarity_boost)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateSpeechFromProfileArgs {
    #[schemars(description = "Text to convert to speech")]
    pub text: String,
    #[schemars(description = "Name of the voice profile to use")]
    pub profile_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MiaVoiceCommandArgs {
    #[schemars(description = "Voice command text (e.g., 'turn on the lights')")]
    pub command: String,
    #[serde(default = "default_profile")]
    #[schemars(description = "Voice profile for response")]
    pub voice_profile: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MiaStatusArgs {
    #[serde(default = "default_profile")]
    #[schemars(description = "Voice profile for status readout")]
    pub voice_profile: String,
}
