//! Configuration management for Parley
//!
//! Precedence for every value: environment > TOML file > default.

pub mod file;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::dialogue::DialogueSettings;
use crate::{Error, Result};

use self::file::ParleyConfigFile;

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default completion model
pub const DEFAULT_MODEL: &str = "llama3:latest";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Default OpenAI-compatible speech API
pub const DEFAULT_SPEECH_URL: &str = "https://api.openai.com/v1";

/// Parley configuration
#[derive(Debug)]
pub struct Config {
    /// Model server
    pub ollama: OllamaConfig,

    /// Speech adapter
    pub speech: SpeechConfig,

    /// Turn-taking behavior
    pub dialogue: DialogueSettings,

    /// Extra attempts for a failed speech operation (0 = fail immediately)
    pub adapter_retries: u32,

    /// Bounds on outstanding operations
    pub timeouts: Timeouts,

    /// Status page / trigger server
    pub server: ServerConfig,
}

/// Model server configuration
#[derive(Debug)]
pub struct OllamaConfig {
    /// Base URL, without trailing slash
    pub base_url: String,

    /// Bearer key, when the server sits behind an authenticating proxy
    pub api_key: Option<SecretString>,

    /// Model used for every completion
    pub model: String,

    /// Sampling temperature; omitted from requests when `None`
    pub temperature: Option<f32>,
}

/// Which speech adapter to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    /// Microphone capture, HTTP STT/TTS, speaker playback
    #[default]
    Local,
    /// Lines on stdin, utterances on stdout
    Console,
}

impl FromStr for SpeechBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "console" => Ok(Self::Console),
            other => Err(Error::Config(format!("unknown speech backend: {other}"))),
        }
    }
}

/// Speech adapter configuration
#[derive(Debug)]
pub struct SpeechConfig {
    pub backend: SpeechBackend,

    /// Silence before a listen is reported as no input
    pub no_input_timeout: Duration,

    /// Trailing silence that completes an utterance (zero = adapter default)
    pub complete_timeout: Duration,

    /// Recognition locale (e.g. "en-US")
    pub locale: String,

    /// OpenAI-compatible base URL for STT/TTS
    pub api_url: String,

    /// Key for the STT/TTS API
    pub api_key: Option<SecretString>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f64,
}

impl SpeechConfig {
    /// Copy of the STT/TTS key for a new client
    #[must_use]
    pub fn api_key(&self) -> Option<SecretString> {
        self.api_key
            .as_ref()
            .map(|k| SecretString::from(k.expose_secret().to_owned()))
    }

    /// Language code for STT derived from the locale ("en-US" → "en")
    #[must_use]
    pub fn language(&self) -> &str {
        self.locale
            .split(['-', '_'])
            .next()
            .unwrap_or(&self.locale)
    }
}

/// Bounds on outstanding operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Prepare, and the fixed part of a speak
    pub speech: Duration,
    /// Extra time per character of an utterance, covering its playback
    pub speak_per_char: Duration,
    /// A single listen, including transcription
    pub listen: Duration,
    /// Model directory and completion calls
    pub model: Duration,
}

impl Timeouts {
    /// Bound for speaking `utterance`: the fixed speech bound plus an
    /// allowance per character, so long replies are not cut off
    #[must_use]
    pub fn speak_limit(&self, utterance: &str) -> Duration {
        let chars = u32::try_from(utterance.chars().count()).unwrap_or(u32::MAX);
        self.speech
            .saturating_add(self.speak_per_char.saturating_mul(chars))
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            speech: Duration::from_secs(60),
            speak_per_char: Duration::from_millis(80),
            listen: Duration::from_secs(60),
            model: Duration::from_secs(120),
        }
    }
}

/// Status page / trigger server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from the environment and config file
    ///
    /// An explicit `path` must exist and parse; the default path is optional.
    ///
    /// # Errors
    ///
    /// Returns error if the explicit file is unreadable or a value is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc = match path {
            Some(path) => file::read_config_file(path)?,
            None => file::load_config_file(),
        };
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value is invalid
    pub fn from_sources<F>(fc: ParleyConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Model server (env > toml > default)
        let base_url = env("PARLEY_OLLAMA_URL")
            .or(fc.ollama.url)
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        let temperature = match env("PARLEY_TEMPERATURE") {
            Some(raw) => Some(parse_value::<f32>("PARLEY_TEMPERATURE", &raw)?),
            None => fc.ollama.temperature.or(Some(DEFAULT_TEMPERATURE)),
        };
        if let Some(t) = temperature {
            if !t.is_finite() || t < 0.0 {
                return Err(Error::Config(format!("temperature must be >= 0, got {t}")));
            }
        }
        let ollama = OllamaConfig {
            base_url: validate_url("ollama url", &base_url)?,
            api_key: env("PARLEY_OLLAMA_KEY")
                .or(fc.ollama.api_key)
                .map(SecretString::from),
            model: env("PARLEY_MODEL")
                .or(fc.ollama.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature,
        };

        // Speech adapter (env > toml > default)
        let backend = match env("PARLEY_SPEECH_BACKEND") {
            Some(raw) => raw.parse()?,
            None => fc.speech.backend.unwrap_or_default(),
        };
        let no_input_ms = match env("PARLEY_NO_INPUT") {
            Some(raw) => parse_value::<u64>("PARLEY_NO_INPUT", &raw)?,
            None => fc.speech.no_input_timeout_ms.unwrap_or(5000),
        };
        let api_url = env("PARLEY_SPEECH_URL")
            .or(fc.speech.api_url)
            .unwrap_or_else(|| DEFAULT_SPEECH_URL.to_string());
        let tts_speed = fc.speech.tts_speed.unwrap_or(1.0);
        if !(0.25..=4.0).contains(&tts_speed) {
            return Err(Error::Config(format!(
                "tts_speed must be between 0.25 and 4.0, got {tts_speed}"
            )));
        }
        let speech = SpeechConfig {
            backend,
            no_input_timeout: Duration::from_millis(no_input_ms),
            complete_timeout: Duration::from_millis(fc.speech.complete_timeout_ms.unwrap_or(0)),
            locale: fc.speech.locale.unwrap_or_else(|| "en-US".to_string()),
            api_url: validate_url("speech api url", &api_url)?,
            api_key: env("OPENAI_API_KEY")
                .or(fc.speech.api_key)
                .map(SecretString::from),
            stt_model: env("PARLEY_STT_MODEL")
                .or(fc.speech.stt_model)
                .unwrap_or_else(|| "whisper-1".to_string()),
            tts_model: env("PARLEY_TTS_MODEL")
                .or(fc.speech.tts_model)
                .unwrap_or_else(|| "tts-1".to_string()),
            tts_voice: env("PARLEY_TTS_VOICE")
                .or(fc.speech.tts_voice)
                .unwrap_or_else(|| "alloy".to_string()),
            tts_speed,
        };

        // Dialogue behavior (toml > default)
        let defaults = DialogueSettings::default();
        let dialogue = DialogueSettings {
            on_no_input: fc.dialogue.on_no_input.unwrap_or(defaults.on_no_input),
            on_unhandled: fc.dialogue.on_unhandled.unwrap_or(defaults.on_unhandled),
            reprompt_phrase: fc
                .dialogue
                .reprompt_phrase
                .unwrap_or(defaults.reprompt_phrase),
            apology_phrase: fc.dialogue.apology_phrase.unwrap_or(defaults.apology_phrase),
        };

        let default_timeouts = Timeouts::default();
        let timeouts = Timeouts {
            speech: timeout_secs("speech_secs", fc.timeouts.speech_secs, default_timeouts.speech)?,
            speak_per_char: fc
                .timeouts
                .speak_ms_per_char
                .map_or(default_timeouts.speak_per_char, Duration::from_millis),
            listen: timeout_secs("listen_secs", fc.timeouts.listen_secs, default_timeouts.listen)?,
            model: timeout_secs("model_secs", fc.timeouts.model_secs, default_timeouts.model)?,
        };

        let port = match env("PARLEY_PORT") {
            Some(raw) => parse_value::<u16>("PARLEY_PORT", &raw)?,
            None => fc.server.port.unwrap_or(18800),
        };
        let server = ServerConfig {
            enabled: fc.server.enabled.unwrap_or(true),
            host: fc.server.host.unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
        };

        Ok(Self {
            ollama,
            speech,
            dialogue,
            adapter_retries: fc.dialogue.adapter_retries.unwrap_or(0),
            timeouts,
            server,
        })
    }
}

/// Parse a URL and return it without a trailing slash
fn validate_url(what: &str, raw: &str) -> Result<String> {
    let url = url::Url::parse(raw).map_err(|e| Error::Config(format!("invalid {what} {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!("{what} must be http(s): {raw}")));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// A configured timeout in seconds; zero would fail every operation at once
fn timeout_secs(key: &str, configured: Option<u64>, default: Duration) -> Result<Duration> {
    match configured {
        Some(0) => Err(Error::Config(format!("timeouts.{key} must be greater than 0"))),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("invalid {key}={raw:?}: {e}")))
}
