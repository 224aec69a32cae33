use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ChatError;

/// Jurisdictional framing passed to the reasoning collaborator.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Scope {
    #[default]
    Global,
    Nigeria,
}

/// Reasoning framework requested of the reasoning collaborator.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum LegalMethod {
    #[default]
    None,
    Irac,
    Ipac,
    Crec,
}

/// Narrator voice.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum VoiceGender {
    Male,
    #[default]
    Female,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gemini_api_key: String,
    /// Optional research proxy; when set it replaces direct Gemini calls.
    pub reasoning_endpoint: String,
    /// Image-generation webhook. Empty disables image routing.
    pub image_endpoint: String,
    pub scope: Scope,
    pub legal_method: LegalMethod,
    pub voice: VoiceGender,
    pub auto_narrate: bool,
}

impl Config {
    /// Directory: ~/.config/omnisearch/
    fn dir() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("omnisearch");
        p
    }

    pub fn default_path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from disk, returning defaults if file doesn't exist or is invalid.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(data) => Self::parse(&data),
            Err(_) => Self::default(),
        }
    }

    fn parse(data: &str) -> Self {
        serde_json::from_str(data).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed config: {e}");
            Self::default()
        })
    }

    /// Persist to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ChatError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Configured key, falling back to `GEMINI_API_KEY`.
    pub fn api_key(&self) -> String {
        if !self.gemini_api_key.trim().is_empty() {
            return self.gemini_api_key.trim().to_string();
        }
        std::env::var("GEMINI_API_KEY").unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.scope, Scope::Global);
        assert_eq!(config.legal_method, LegalMethod::None);
        assert_eq!(config.voice, VoiceGender::Female);
        assert!(!config.auto_narrate);
        assert!(config.image_endpoint.is_empty());
    }

    #[test]
    fn test_malformed_config_falls_back_to_defaults() {
        let config = Config::parse("{\"scope\": 12");
        assert_eq!(config.scope, Scope::Global);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = Config::parse(r#"{"image_endpoint":"http://img.local","scope":"NIGERIA"}"#);
        assert_eq!(config.image_endpoint, "http://img.local");
        assert_eq!(config.scope, Scope::Nigeria);
        assert_eq!(config.voice, VoiceGender::Female);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            image_endpoint: "https://img.local/hook".into(),
            legal_method: LegalMethod::Ipac,
            auto_narrate: true,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.image_endpoint, "https://img.local/hook");
        assert_eq!(loaded.legal_method, LegalMethod::Ipac);
        assert!(loaded.auto_narrate);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.json"));
        assert!(loaded.image_endpoint.is_empty());
    }

    #[test]
    fn test_enum_parsing_is_case_insensitive() {
        assert_eq!("irac".parse::<LegalMethod>().unwrap(), LegalMethod::Irac);
        assert_eq!("Nigeria".parse::<Scope>().unwrap(), Scope::Nigeria);
        assert_eq!("MALE".parse::<VoiceGender>().unwrap(), VoiceGender::Male);
        assert!("martian".parse::<Scope>().is_err());
        assert_eq!(LegalMethod::Crec.to_string(), "CREC");
    }
}
