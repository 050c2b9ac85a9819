/// Settings management — load and save the chat client configuration.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::logging::{app_error, app_info, app_warn};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// OpenRouter model id. Empty means: take LLM_MODEL from the environment.
    #[serde(default)]
    pub model: String,
    /// Empty means: take OPENROUTER_API_KEY from the environment.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_persona")]
    pub persona: String,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_db_path() -> String {
    env::var("ASKDB_DATABASE").unwrap_or_else(|_| "askdb.db".to_string())
}
fn default_persona() -> String {
    "a meticulous data navigator".to_string()
}
fn default_greeting() -> String {
    "Hello! What would you like to know about the connected database?".to_string()
}
fn default_max_rows() -> usize {
    50
}
fn default_max_tokens() -> u32 {
    300
}
fn default_temperature() -> f32 {
    0.0
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: default_db_path(),
            model: String::new(),
            api_key: String::new(),
            persona: default_persona(),
            greeting: default_greeting(),
            max_rows: default_max_rows(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

pub fn settings_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("askdb");
    if let Err(err) = fs::create_dir_all(&config_dir) {
        app_warn(format!(
            "Failed to create config directory {}: {}",
            config_dir.display(),
            err
        ));
    }
    config_dir.join("settings.json")
}

pub fn load_settings() -> Settings {
    load_from(&settings_path())
}

/// Load settings from an explicit path; missing or malformed files fall back
/// to defaults with a logged warning.
pub fn load_from(path: &Path) -> Settings {
    if !path.exists() {
        app_warn(format!(
            "Settings file not found at {}. Using defaults.",
            path.display()
        ));
        return Settings::default();
    }

    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) => {
            app_error(format!(
                "Failed to read settings file {}: {}",
                path.display(),
                err
            ));
            return Settings::default();
        }
    };

    match serde_json::from_str::<Settings>(&data) {
        Ok(settings) => settings,
        Err(err) => {
            app_error(format!("Failed to parse settings: {}", err));
            Settings::default()
        }
    }
}

pub fn save_settings(settings: &Settings) -> Result<(), String> {
    let path = settings_path();
    let json = serde_json::to_string_pretty(settings).map_err(|e| {
        app_error(format!("Failed to serialize settings: {}", e));
        e.to_string()
    })?;
    fs::write(&path, json).map_err(|e| {
        app_error(format!(
            "Failed to write settings file {}: {}",
            path.display(),
            e
        ));
        e.to_string()
    })?;
    app_info(format!("Settings saved to {}", path.display()));
    Ok(())
}
