//! Speech adapter contract
//!
//! A [`SpeechAdapter`] prepares audio resources, listens for one user turn
//! and speaks utterances. Its results are translated into dialogue
//! [`Event`]s by the `events_for_*` functions, which do nothing but forward.
//!
//! Two adapters ship with the crate: [`LocalSpeech`] (microphone, speakers
//! and an OpenAI-compatible STT/TTS API) and [`ConsoleSpeech`] (stdin/stdout).

mod capture;
mod console;
mod endpoint;
mod local;
mod playback;
mod stt;
mod tts;

use async_trait::async_trait;
use serde::Serialize;

use crate::Result;
use crate::dialogue::Event;

pub use capture::{Microphone, Recording, SAMPLE_RATE, samples_to_wav};
pub use console::ConsoleSpeech;
pub use endpoint::{ENERGY_THRESHOLD, Endpoint, UtteranceDetector, rms_energy};
pub use local::LocalSpeech;
pub use playback::{AudioPlayback, decode_mp3};
pub use stt::SpeechToText;
pub use tts::TextToSpeech;

/// One recognition hypothesis
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub text: String,
    pub confidence: Option<f32>,
}

impl RecognitionResult {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }
}

/// Result of one listen
#[derive(Debug, Clone, PartialEq)]
pub enum Hearing {
    /// Recognition results in the order they were produced
    Recognized(Vec<RecognitionResult>),
    /// The user said nothing before the no-input timeout
    NoInput,
}

/// The adapter's own status, shown next to the dialogue state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechView {
    #[default]
    NotReady,
    Idle,
    Recognising,
    Speaking,
}

impl SpeechView {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotReady => "not-ready",
            Self::Idle => "idle",
            Self::Recognising => "recognising",
            Self::Speaking => "speaking",
        }
    }
}

impl std::fmt::Display for SpeechView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speech recognition and synthesis backend
///
/// Audio streams are not `Send`, so adapters run on the task that owns them.
#[async_trait(?Send)]
pub trait SpeechAdapter {
    /// Acquire devices and clients
    ///
    /// # Errors
    ///
    /// Returns error if the adapter cannot be made ready
    async fn prepare(&mut self) -> Result<()>;

    /// Listen for one user turn
    ///
    /// # Errors
    ///
    /// Returns error if capture or recognition fails
    async fn listen(&mut self) -> Result<Hearing>;

    /// Speak `utterance` and return once playback has finished
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&mut self, utterance: &str) -> Result<()>;

    /// Current adapter status
    fn view(&self) -> SpeechView;
}

/// A speech operation that finished successfully
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechOutcome {
    Prepared,
    Heard(Hearing),
    Spoke,
}

/// Events for a finished speech operation
///
/// Recognition results are forwarded one by one, followed by the completion
/// of the listen. Any error becomes an adapter failure.
#[must_use]
pub fn events_for_speech(outcome: Result<SpeechOutcome>) -> Vec<Event> {
    match outcome {
        Ok(SpeechOutcome::Prepared) => vec![Event::AdapterReady],
        Ok(SpeechOutcome::Heard(Hearing::Recognized(results))) => results
            .into_iter()
            .map(|r| Event::Recognized {
                text: r.text,
                confidence: r.confidence,
            })
            .chain(std::iter::once(Event::ListenComplete))
            .collect(),
        Ok(SpeechOutcome::Heard(Hearing::NoInput)) => vec![Event::NoInput],
        Ok(SpeechOutcome::Spoke) => vec![Event::SpeakComplete],
        Err(e) => vec![Event::AdapterFailed(e.to_string())],
    }
}

/// Events for a finished model completion
#[must_use]
pub fn events_for_completion(outcome: Result<String>) -> Vec<Event> {
    match outcome {
        Ok(content) => vec![Event::CompletionDone(content)],
        Err(e) => vec![Event::CompletionFailed(e.to_string())],
    }
}

/// Events for a finished model directory fetch
#[must_use]
pub fn events_for_directory(outcome: Result<Vec<String>>) -> Vec<Event> {
    match outcome {
        Ok(names) => vec![Event::ModelsFetched(names)],
        Err(e) => vec![Event::FetchFailed(e.to_string())],
    }
}
