use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the Gemini credential.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Directory the export artifacts are written into.
    pub export_dir: String,
    /// Optional model override; `None` means the shipped default.
    pub model: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            export_dir: ".".to_string(),
            model: None,
        }
    }
}

/// Loads config.toml. The file is optional; a missing file yields the
/// defaults, but a present file that fails to parse or names a bad
/// export directory is an error worth showing the user.
pub fn load_config_from_file(file_path: &str) -> Result<Config, String> {
    if !Path::new(file_path).exists() {
        return Ok(Config::default());
    }
    match fs::read_to_string(file_path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(loaded_config) => {
                let path = PathBuf::from(&loaded_config.export_dir);
                if path.is_dir() {
                    Ok(loaded_config)
                } else {
                    Err(format!(
                        "Error: export_dir specified in {} ('{}') is not a valid directory.",
                        file_path, loaded_config.export_dir
                    ))
                }
            }
            Err(e) => Err(format!("Failed to parse {}: {}", file_path, e)),
        },
        Err(e) => Err(format!("Failed to read {}: {}", file_path, e)),
    }
}

/// Reads the provider credential from the environment, consulting a local
/// .env file first. Read once at startup and injected into the client so
/// nothing does ad hoc env lookups later.
pub fn api_key_from_env() -> Option<String> {
    let _ = dotenvy::dotenv();
    std::env::var(API_KEY_VAR)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}
