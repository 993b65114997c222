//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use parley::speech::{Hearing, RecognitionResult, SpeechAdapter, SpeechView};
use parley::{Error, Message, ModelClient, ModelDirectory, Result};
use tokio::sync::mpsc;

/// Speech adapter that replays scripted listens and records what it speaks
pub struct ScriptedSpeech {
    hearings: VecDeque<Result<Hearing>>,
    prepare_failures: usize,
    spoken: Arc<Mutex<Vec<String>>>,
    done: Option<mpsc::Sender<()>>,
    speak_pace: Duration,
    view: SpeechView,
}

impl ScriptedSpeech {
    pub fn new(hearings: Vec<Result<Hearing>>) -> Self {
        Self {
            hearings: hearings.into(),
            prepare_failures: 0,
            spoken: Arc::new(Mutex::new(Vec::new())),
            done: None,
            speak_pace: Duration::ZERO,
            view: SpeechView::NotReady,
        }
    }

    /// Fail the first `count` prepare calls
    pub fn failing_prepare(mut self, count: usize) -> Self {
        self.prepare_failures = count;
        self
    }

    /// Send on `done` once the script runs out, then never answer
    pub fn shutdown_when_exhausted(mut self, done: mpsc::Sender<()>) -> Self {
        self.done = Some(done);
        self
    }

    /// Take `pace` per character to speak, like real playback
    pub fn with_speak_pace(mut self, pace: Duration) -> Self {
        self.speak_pace = pace;
        self
    }

    /// Handle to everything spoken so far
    pub fn spoken(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.spoken)
    }
}

/// A single recognized utterance
pub fn said(text: &str) -> Result<Hearing> {
    Ok(Hearing::Recognized(vec![RecognitionResult::new(text)]))
}

#[async_trait(?Send)]
impl SpeechAdapter for ScriptedSpeech {
    async fn prepare(&mut self) -> Result<()> {
        if self.prepare_failures > 0 {
            self.prepare_failures -= 1;
            return Err(Error::Audio("no input device available".to_string()));
        }
        self.view = SpeechView::Idle;
        Ok(())
    }

    async fn listen(&mut self) -> Result<Hearing> {
        if let Some(hearing) = self.hearings.pop_front() {
            return hearing;
        }
        if let Some(done) = self.done.take() {
            let _ = done.send(()).await;
        }
        std::future::pending().await
    }

    async fn speak(&mut self, utterance: &str) -> Result<()> {
        let chars = u32::try_from(utterance.chars().count()).unwrap();
        tokio::time::sleep(self.speak_pace * chars).await;
        self.spoken.lock().unwrap().push(utterance.to_string());
        Ok(())
    }

    fn view(&self) -> SpeechView {
        self.view
    }
}

/// Model server stub with canned replies and a recorded request log
pub struct StubModel {
    models: std::result::Result<Vec<String>, String>,
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    requests: Mutex<Vec<Vec<Message>>>,
    stalled: bool,
}

impl StubModel {
    pub fn new(models: &[&str], replies: Vec<std::result::Result<&str, &str>>) -> Self {
        Self {
            models: Ok(models.iter().map(ToString::to_string).collect()),
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
            stalled: false,
        }
    }

    /// Make the directory fetch fail
    pub fn without_directory(mut self) -> Self {
        self.models = Err("connection refused".to_string());
        self
    }

    /// Never answer completion requests
    pub fn stalled(mut self) -> Self {
        self.stalled = true;
        self
    }

    /// Transcripts sent for completion, in order
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for StubModel {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if self.stalled {
            return std::future::pending().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("no reply scripted".to_string()))
            .map_err(Error::Model)
    }
}

#[async_trait]
impl ModelDirectory for StubModel {
    async fn list_models(&self) -> Result<Vec<String>> {
        self.models.clone().map_err(Error::Model)
    }
}
