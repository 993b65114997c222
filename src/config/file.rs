//! TOML configuration file loading
//!
//! Supports `~/.config/parley/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dialogue::{NoInputPolicy, UnhandledEventPolicy};
use crate::Result;

use super::SpeechBackend;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfigFile {
    /// Model server configuration
    #[serde(default)]
    pub ollama: OllamaFileConfig,

    /// Speech adapter configuration
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Turn-taking behavior
    #[serde(default)]
    pub dialogue: DialogueFileConfig,

    /// Bounds on outstanding operations
    #[serde(default)]
    pub timeouts: TimeoutsFileConfig,

    /// Status page / trigger server
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// Model server configuration
#[derive(Debug, Default, Deserialize)]
pub struct OllamaFileConfig {
    /// Base URL (e.g. `http://localhost:11434`)
    pub url: Option<String>,
    /// Optional bearer key for proxied servers
    pub api_key: Option<String>,
    /// Model used for completions (e.g. "llama3:latest")
    pub model: Option<String>,
    /// Sampling temperature sent with each completion
    pub temperature: Option<f32>,
}

/// Speech adapter configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// "local" (microphone + speakers) or "console" (stdin/stdout)
    pub backend: Option<SpeechBackend>,
    /// Silence before a listen is reported as no input
    pub no_input_timeout_ms: Option<u64>,
    /// Trailing silence that completes an utterance (0 = adapter default)
    pub complete_timeout_ms: Option<u64>,
    /// Recognition locale (e.g. "en-US")
    pub locale: Option<String>,
    /// OpenAI-compatible base URL for STT/TTS
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub stt_model: Option<String>,
    pub tts_model: Option<String>,
    pub tts_voice: Option<String>,
    pub tts_speed: Option<f64>,
}

/// Turn-taking behavior
#[derive(Debug, Default, Deserialize)]
pub struct DialogueFileConfig {
    /// "skip" or "reprompt"
    pub on_no_input: Option<NoInputPolicy>,
    /// "drop" or "defer"
    pub on_unhandled: Option<UnhandledEventPolicy>,
    pub reprompt_phrase: Option<String>,
    pub apology_phrase: Option<String>,
    /// Extra attempts for a failed speech operation before giving up
    pub adapter_retries: Option<u32>,
}

/// Bounds on outstanding operations, in seconds unless named otherwise
#[derive(Debug, Default, Deserialize)]
pub struct TimeoutsFileConfig {
    pub speech_secs: Option<u64>,
    pub speak_ms_per_char: Option<u64>,
    pub listen_secs: Option<u64>,
    pub model_secs: Option<u64>,
}

/// Status page / trigger server
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub enabled: Option<bool>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ParleyConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ParleyConfigFile {
    let Some(path) = config_file_path() else {
        return ParleyConfigFile::default();
    };

    if !path.exists() {
        return ParleyConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            ParleyConfigFile::default()
        }
    }
}

/// Read and parse a config file at an explicit path
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn read_config_file(path: &Path) -> Result<ParleyConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Return the config file path: `~/.config/parley/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("parley").join("config.toml"))
}
