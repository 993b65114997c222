//! Effect runner
//!
//! Executes the machine's intents against the speech adapter and the model
//! server, one at a time, and feeds the outcomes back as events. Every
//! operation is bounded by a timeout; a timeout is reported like any other
//! failure of that operation. Speaking is bounded by the length of the
//! utterance as well, since playback takes as long as the audio.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::config::Timeouts;
use crate::dialogue::{DialogueMachine, DialogueSettings, DialogueState, Event, Intent, MainState};
use crate::ollama::{ModelClient, ModelDirectory};
use crate::speech::{
    SpeechAdapter, SpeechOutcome, SpeechView, events_for_completion, events_for_directory,
    events_for_speech,
};
use crate::{Error, Result};

/// Snapshot published after every transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    /// Dialogue state label, e.g. "Main.Ask"
    pub state: &'static str,
    /// Speech adapter view label
    pub view: SpeechView,
    /// Completed model replies
    pub turns: usize,
    /// Last event the machine accepted
    pub latest_move: Option<&'static str>,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            state: "Prepare",
            view: SpeechView::NotReady,
            turns: 0,
            latest_move: None,
        }
    }
}

/// Drives a [`DialogueMachine`] to completion
pub struct DialogueRunner {
    machine: DialogueMachine,
    speech: Box<dyn SpeechAdapter>,
    model: Arc<dyn ModelClient>,
    directory: Arc<dyn ModelDirectory>,
    timeouts: Timeouts,
    adapter_retries: u32,
    auto_start: bool,
    status: watch::Sender<Status>,
}

impl DialogueRunner {
    #[must_use]
    pub fn new(
        settings: DialogueSettings,
        speech: Box<dyn SpeechAdapter>,
        model: Arc<dyn ModelClient>,
        directory: Arc<dyn ModelDirectory>,
    ) -> Self {
        let (status, _) = watch::channel(Status::default());
        Self {
            machine: DialogueMachine::new(settings),
            speech,
            model,
            directory,
            timeouts: Timeouts::default(),
            adapter_retries: 0,
            auto_start: false,
            status,
        }
    }

    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Extra attempts for a failed speech operation
    #[must_use]
    pub const fn with_adapter_retries(mut self, retries: u32) -> Self {
        self.adapter_retries = retries;
        self
    }

    /// Click once on the user's behalf the first time the greeting is ready
    #[must_use]
    pub const fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Receiver for status updates
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    #[must_use]
    pub const fn machine(&self) -> &DialogueMachine {
        &self.machine
    }

    /// Run the dialogue until shutdown or a fatal adapter failure
    ///
    /// Each message on `triggers` is a user click; clicks the current state
    /// does not accept go through the unhandled-event policy. The run ends
    /// cleanly when `shutdown` fires or is closed, or when `triggers` is
    /// closed while the dialogue waits for a click.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Speech`] if the speech adapter failed
    pub async fn run(
        &mut self,
        mut triggers: mpsc::Receiver<()>,
        mut shutdown: mpsc::Receiver<()>,
    ) -> Result<()> {
        let mut next = self.machine.start();
        self.publish();
        tracing::info!("dialogue started");

        loop {
            if self.machine.state().is_terminal() {
                tracing::error!(turns = self.machine.turns(), "dialogue failed");
                return Err(Error::Speech("speech adapter failed".to_string()));
            }

            let events = if let Some(intent) = next.take() {
                let operation = intent.operation().name();
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => {
                        tracing::info!(operation, "shutdown during operation");
                        return Ok(());
                    }
                    events = self.execute(intent) => events,
                }
            } else if self.auto_start
                && self.machine.state() == DialogueState::Main(MainState::Prompt)
            {
                self.auto_start = false;
                tracing::info!("starting without a click");
                vec![Event::UserClick]
            } else {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => {
                        tracing::info!("shutdown");
                        return Ok(());
                    }
                    trigger = triggers.recv() => match trigger {
                        Some(()) => vec![Event::UserClick],
                        None => {
                            tracing::info!("trigger source closed");
                            return Ok(());
                        }
                    },
                }
            };

            next = self.dispatch(events);

            while let Ok(()) = triggers.try_recv() {
                let intent = self.dispatch(vec![Event::UserClick]);
                if next.is_none() {
                    next = intent;
                }
            }
        }
    }

    /// Hand events to the machine in order, keeping the intent they produce
    fn dispatch(&mut self, events: Vec<Event>) -> Option<Intent> {
        let mut next = None;
        for event in events {
            tracing::debug!(event = event.name(), state = %self.machine.state(), "dispatching");
            if let Some(intent) = self.machine.handle(event) {
                if let Some(previous) = next.replace(intent) {
                    tracing::error!(?previous, "intent superseded before it ran");
                }
            }
            self.publish();
        }
        next
    }

    async fn execute(&mut self, intent: Intent) -> Vec<Event> {
        tracing::debug!(operation = intent.operation().name(), "executing");

        match intent {
            Intent::FetchModels => events_for_directory(
                bounded("model directory", self.timeouts.model, self.directory.list_models()).await,
            ),
            Intent::Complete(messages) => events_for_completion(
                bounded("completion", self.timeouts.model, self.model.complete(&messages)).await,
            ),
            speech => {
                let mut attempt = 0;
                loop {
                    let outcome = self.attempt(&speech).await;
                    self.publish();
                    match outcome {
                        Err(e) if attempt < self.adapter_retries => {
                            attempt += 1;
                            tracing::warn!(
                                operation = speech.operation().name(),
                                attempt,
                                error = %e,
                                "speech operation failed, retrying"
                            );
                        }
                        outcome => return events_for_speech(outcome),
                    }
                }
            }
        }
    }

    async fn attempt(&mut self, intent: &Intent) -> Result<SpeechOutcome> {
        match intent {
            Intent::Prepare => bounded("prepare", self.timeouts.speech, self.speech.prepare())
                .await
                .map(|()| SpeechOutcome::Prepared),
            Intent::Listen => bounded("listen", self.timeouts.listen, self.speech.listen())
                .await
                .map(SpeechOutcome::Heard),
            Intent::Speak(utterance) => {
                let limit = self.timeouts.speak_limit(utterance);
                bounded("speak", limit, self.speech.speak(utterance))
                    .await
                    .map(|()| SpeechOutcome::Spoke)
            }
            other => Err(Error::Speech(format!(
                "{} is not a speech operation",
                other.operation().name()
            ))),
        }
    }

    fn publish(&self) {
        let status = Status {
            state: self.machine.state().label(),
            view: self.speech.view(),
            turns: self.machine.turns(),
            latest_move: self.machine.latest_move(),
        };
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

/// Await `fut`, failing with [`Error::Timeout`] after `limit`
async fn bounded<T>(
    operation: &'static str,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or(Err(Error::Timeout { operation, limit }))
}
