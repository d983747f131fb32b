//! Voice profile persistence.
//!
//! Profiles are named (voice id, settings) presets kept in a single JSON
//! document. The whole map is loaded on open and rewritten on every
//! mutation. Disk failures are logged and never reach the caller.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::elevenlabs::SynthesisSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub voice_id: String,
    pub settings: SynthesisSettings,
    pub created_at: DateTime<Utc>,
}

pub struct ProfileStore {
    path: PathBuf,
    profiles: BTreeMap<String, VoiceProfile>,
}

impl ProfileStore {
    /// `<config dir>/elevenlabs-mia/voice_profiles.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join("elevenlabs-mia")
            .join("voice_profiles.json")
    }

    /// Open the store at `path`. A missing file gives an empty store; a
    /// malformed one is reported and also gives an empty store.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let profiles = Self::load(&path);
        Self { path, profiles }
    }

    fn load(path: &Path) -> BTreeMap<String, VoiceProfile> {
        if !path.exists() {
            debug!("No profile file at {}, starting empty", path.display());
            return BTreeMap::new();
        }
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to read voice profiles from {}: {e}", path.display());
                return BTreeMap::new();
            }
        };
        match serde_json::from_str::<BTreeMap<String, VoiceProfile>>(&contents) {
            Ok(profiles) => {
                info!("Loaded {} voice profile(s) from {}", profiles.len(), path.display());
                profiles
            }
            Err(e) => {
                warn!(
                    "Voice profile file {} is malformed ({e}); starting with no profiles",
                    path.display()
                );
                BTreeMap::new()
            }
        }
    }

    fn save(&self) {
        if let Err(e) = self.write_atomically() {
            error!("Failed to save voice profiles to {}: {e}", self.path.display());
        }
    }

    fn write_atomically(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.profiles)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or overwrite `name`, then persist.
    pub fn create(&mut self, name: &str, voice_id: &str, settings: SynthesisSettings) {
        let profile = VoiceProfile {
            voice_id: voice_id.to_string(),
            settings,
            created_at: Utc::now(),
        };
        if self.profiles.insert(name.to_string(), profile).is_some() {
            debug!("Overwriting voice profile '{name}'");
        }
        self.save();
    }

    pub fn get(&self, name: &str) -> Option<&VoiceProfile> {
        self.profiles.get(name)
    }

    pub fn list(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn delete(&mut self, name: &str) {
        if self.profiles.remove(name).is_some() {
            self.save();
        }
    }
}
