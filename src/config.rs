use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000";
pub const ENDPOINT_ENV: &str = "DOST_ENDPOINT";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub endpoint: Option<String>,
    pub preset_prompts: Option<Vec<String>>,
    pub mood_gauge: Option<bool>,
    pub research_consent: Option<bool>,
    pub settings: Option<bool>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            endpoint: Some(DEFAULT_ENDPOINT.to_string()),
            preset_prompts: Some(default_preset_prompts()),
            mood_gauge: Some(true),
            research_consent: Some(true),
            settings: Some(true),
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Environment wins over the file; the file wins over the default.
    pub fn endpoint(&self) -> String {
        std::env::var(ENDPOINT_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    pub fn preset_prompts(&self) -> Vec<String> {
        self.preset_prompts
            .clone()
            .unwrap_or_else(default_preset_prompts)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("dost"))
    }
}

fn default_preset_prompts() -> Vec<String> {
    vec![
        "\"I feel anxious about my exams\"".to_string(),
        "\"I can't sleep at night\"".to_string(),
        "\"I feel lonely\"".to_string(),
        "\"How do I manage stress?\"".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dost").join("config.json");

        let mut config = Config::new();
        config.endpoint = Some("http://example.test:8080".to_string());
        config.mood_gauge = Some(false);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_leaves_other_fields_unset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"mood_gauge": false}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.mood_gauge, Some(false));
        assert_eq!(config.endpoint, None);
        assert_eq!(config.preset_prompts(), default_preset_prompts());
    }
}
