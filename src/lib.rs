//! Parley - spoken conversations with a local language model
//!
//! A dialogue orchestrator that greets the user with the models available on
//! an Ollama server, then alternates listening, asking the model and speaking
//! its reply until stopped.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │        Status page / click trigger (api)              │
//! └────────────────────────┬─────────────────────────────┘
//!                          │ triggers, status
//! ┌────────────────────────▼─────────────────────────────┐
//! │                 Runner (runner)                       │
//! │   executes intents, bounds them with timeouts         │
//! └───────┬──────────────────────────────────┬───────────┘
//!         │ events / intents                 │
//! ┌───────▼──────────────┐        ┌──────────▼───────────┐
//! │ Dialogue machine     │        │ Speech adapter       │
//! │ + transcript         │        │ Ollama client        │
//! └──────────────────────┘        └──────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod ollama;
pub mod runner;
pub mod speech;

pub use config::Config;
pub use dialogue::{
    DialogueMachine, DialogueSettings, DialogueState, Event, Intent, MainState, Message,
    NoInputPolicy, Role, Transcript, UnhandledEventPolicy,
};
pub use error::{Error, Result};
pub use ollama::{ModelClient, ModelDirectory, OllamaClient};
pub use runner::{DialogueRunner, Status};
pub use speech::{ConsoleSpeech, Hearing, LocalSpeech, RecognitionResult, SpeechAdapter, SpeechView};
