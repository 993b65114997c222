//! Dialogue orchestration state machine
//!
//! Drives the turn-taking loop: prepare the speech adapter, fetch the model
//! directory, greet, then Ask → ChatCompletion → Speaking → Ask forever.
//!
//! Transitions are pure. Each accepted event may produce at most one
//! [`Intent`], and a new intent is only produced once the completion event
//! for the previous one has been accepted, so at most one operation is ever
//! outstanding.

use std::collections::VecDeque;

use serde::Deserialize;

use super::event::Event;
use super::intent::{Intent, Operation};
use super::state::{DialogueState, MainState};
use super::transcript::{Message, Role, Transcript};

/// Maximum number of events held under [`UnhandledEventPolicy::Defer`]
pub const MAX_DEFERRED: usize = 16;

/// What to do when the adapter reports no input while listening
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoInputPolicy {
    /// Append an empty user message and ask the model anyway
    Skip,
    /// Speak the reprompt phrase and listen again
    #[default]
    Reprompt,
}

/// What to do with an event the current state does not accept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnhandledEventPolicy {
    /// Discard it
    #[default]
    Drop,
    /// Queue it and offer it again once no operation is outstanding
    Defer,
}

/// Behavior knobs for the dialogue machine
#[derive(Debug, Clone)]
pub struct DialogueSettings {
    pub on_no_input: NoInputPolicy,
    pub on_unhandled: UnhandledEventPolicy,
    /// Spoken after no input under [`NoInputPolicy::Reprompt`]
    pub reprompt_phrase: String,
    /// Spoken after a failed completion
    pub apology_phrase: String,
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            on_no_input: NoInputPolicy::default(),
            on_unhandled: UnhandledEventPolicy::default(),
            reprompt_phrase: "I can't hear you!".to_string(),
            apology_phrase: "Sorry, I couldn't come up with an answer. Could you say that again?"
                .to_string(),
        }
    }
}

/// A recognition result waiting for the listen to complete
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    pub confidence: Option<f32>,
}

/// The dialogue orchestrator
#[derive(Debug)]
pub struct DialogueMachine {
    settings: DialogueSettings,
    state: DialogueState,
    transcript: Transcript,
    models: Vec<String>,
    pending: Option<Recognition>,
    latest_move: Option<&'static str>,
    outstanding: Option<Operation>,
    deferred: VecDeque<Event>,
}

impl DialogueMachine {
    #[must_use]
    pub const fn new(settings: DialogueSettings) -> Self {
        Self {
            settings,
            state: DialogueState::Prepare,
            transcript: Transcript::new(),
            models: Vec::new(),
            pending: None,
            latest_move: None,
            outstanding: None,
            deferred: VecDeque::new(),
        }
    }

    /// Run the entry action of the initial state
    pub fn start(&mut self) -> Option<Intent> {
        self.enter(DialogueState::Prepare)
    }

    /// Apply one event, returning the next operation to execute
    pub fn handle(&mut self, event: Event) -> Option<Intent> {
        match self.apply(event) {
            Ok(Some(intent)) => Some(intent),
            Ok(None) => self.replay_deferred(),
            Err(event) => {
                self.reject(event);
                None
            }
        }
    }

    #[must_use]
    pub const fn state(&self) -> DialogueState {
        self.state
    }

    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Model names fetched for the opening message
    #[must_use]
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Operation whose completion is being awaited
    #[must_use]
    pub const fn outstanding(&self) -> Option<Operation> {
        self.outstanding
    }

    #[must_use]
    pub const fn pending_recognition(&self) -> Option<&Recognition> {
        self.pending.as_ref()
    }

    /// Name of the last accepted event
    #[must_use]
    pub const fn latest_move(&self) -> Option<&'static str> {
        self.latest_move
    }

    #[must_use]
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    #[must_use]
    pub const fn settings(&self) -> &DialogueSettings {
        &self.settings
    }

    /// Number of model replies in the transcript
    #[must_use]
    pub fn turns(&self) -> usize {
        self.transcript
            .messages()
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }

    /// Accept or hand back `event`
    fn apply(&mut self, event: Event) -> Result<Option<Intent>, Event> {
        use DialogueState::{FetchModels, Main, Prepare};
        use MainState::{Apologize, Ask, ChatCompletion, Prompt, Reprompt, SpeakPrompt, Speaking};

        let name = event.name();
        let intent = match (self.state, event) {
            (Prepare, Event::AdapterReady) => {
                self.finish(Operation::Prepare);
                self.enter(FetchModels)
            }
            (
                Prepare | Main(SpeakPrompt | Ask | Speaking | Reprompt | Apologize),
                Event::AdapterFailed(reason),
            ) => {
                tracing::error!(state = %self.state, reason, "speech adapter failed");
                self.outstanding = None;
                self.enter(DialogueState::Failed)
            }
            (FetchModels, Event::ModelsFetched(names)) => {
                self.finish(Operation::FetchModels);
                tracing::debug!(models = ?names, "model directory fetched");
                self.models = names;
                self.enter(Main(Prompt))
            }
            (FetchModels, Event::FetchFailed(reason)) => {
                self.finish(Operation::FetchModels);
                tracing::warn!(reason, "model directory unavailable, greeting without it");
                self.models.clear();
                self.enter(Main(Prompt))
            }
            (Main(Prompt), Event::UserClick) => self.enter(Main(SpeakPrompt)),
            (Main(Ask), Event::Recognized { text, confidence }) => {
                if text.trim().is_empty() {
                    tracing::debug!("ignoring blank recognition");
                } else {
                    tracing::debug!(text, ?confidence, "recognized");
                    self.pending = Some(Recognition { text, confidence });
                }
                None
            }
            (Main(Ask), Event::ListenComplete | Event::NoInput) => {
                self.finish(Operation::Listen);
                match self.pending.take() {
                    Some(recognition) => {
                        self.transcript.append(Message::user(recognition.text));
                        self.enter(Main(ChatCompletion))
                    }
                    None => self.no_input(),
                }
            }
            (Main(ChatCompletion), Event::CompletionDone(content)) => {
                self.finish(Operation::Complete);
                self.transcript.append(Message::assistant(content));
                self.enter(Main(Speaking))
            }
            (Main(ChatCompletion), Event::CompletionFailed(reason)) => {
                self.finish(Operation::Complete);
                tracing::warn!(reason, "completion failed, transcript left unchanged");
                self.enter(Main(Apologize))
            }
            (Main(SpeakPrompt | Speaking | Reprompt | Apologize), Event::SpeakComplete) => {
                self.finish(Operation::Speak);
                self.enter(Main(Ask))
            }
            (_, event) => return Err(event),
        };

        self.latest_move = Some(name);
        Ok(intent)
    }

    fn no_input(&mut self) -> Option<Intent> {
        match self.settings.on_no_input {
            NoInputPolicy::Skip => {
                tracing::debug!("no input, continuing with an empty user turn");
                self.transcript.append(Message::user(String::new()));
                self.enter(DialogueState::Main(MainState::ChatCompletion))
            }
            NoInputPolicy::Reprompt => {
                tracing::debug!("no input, reprompting");
                self.enter(DialogueState::Main(MainState::Reprompt))
            }
        }
    }

    /// Switch state and run its entry action
    fn enter(&mut self, next: DialogueState) -> Option<Intent> {
        tracing::debug!(from = %self.state, to = %next, "transition");
        self.state = next;

        let intent = match next {
            DialogueState::Prepare => Some(Intent::Prepare),
            DialogueState::FetchModels => Some(Intent::FetchModels),
            DialogueState::Failed => None,
            DialogueState::Main(main) => match main {
                MainState::Prompt => {
                    let opening = opening_message(&self.models);
                    self.transcript.append(Message::system(opening));
                    None
                }
                MainState::SpeakPrompt => self
                    .transcript
                    .latest(Role::System)
                    .map(|m| Intent::Speak(m.content.clone())),
                MainState::Ask => {
                    self.pending = None;
                    Some(Intent::Listen)
                }
                MainState::ChatCompletion => Some(Intent::Complete(self.transcript.snapshot())),
                MainState::Speaking => match self.transcript.last() {
                    Some(m) if m.role == Role::Assistant => Some(Intent::Speak(m.content.clone())),
                    _ => {
                        tracing::error!("no assistant reply to speak");
                        return self.enter(DialogueState::Main(MainState::Apologize));
                    }
                },
                MainState::Reprompt => Some(Intent::Speak(self.settings.reprompt_phrase.clone())),
                MainState::Apologize => Some(Intent::Speak(self.settings.apology_phrase.clone())),
            },
        };

        if let Some(intent) = &intent {
            debug_assert!(self.outstanding.is_none(), "operation already outstanding");
            self.outstanding = Some(intent.operation());
        }
        intent
    }

    fn finish(&mut self, operation: Operation) {
        if self.outstanding != Some(operation) {
            tracing::debug!(operation = operation.name(), "completion without a matching operation");
        }
        self.outstanding = None;
    }

    fn reject(&mut self, event: Event) {
        if self.state.is_terminal() {
            tracing::debug!(event = event.name(), "machine failed, dropping event");
            return;
        }

        match self.settings.on_unhandled {
            UnhandledEventPolicy::Drop => {
                tracing::debug!(state = %self.state, event = event.name(), "dropping unhandled event");
            }
            UnhandledEventPolicy::Defer => {
                tracing::debug!(state = %self.state, event = event.name(), "deferring event");
                self.deferred.push_back(event);
                if self.deferred.len() > MAX_DEFERRED {
                    if let Some(oldest) = self.deferred.pop_front() {
                        tracing::warn!(event = oldest.name(), "deferred queue full, dropping oldest");
                    }
                }
            }
        }
    }

    /// Offer queued events again, in arrival order
    fn replay_deferred(&mut self) -> Option<Intent> {
        if self.deferred.is_empty() || self.outstanding.is_some() || self.state.is_terminal() {
            return None;
        }

        let mut remaining = VecDeque::with_capacity(self.deferred.len());
        let mut emitted = None;

        while let Some(event) = self.deferred.pop_front() {
            if emitted.is_some() || self.outstanding.is_some() {
                remaining.push_back(event);
                continue;
            }
            match self.apply(event) {
                Ok(intent) => {
                    tracing::debug!(state = %self.state, "replayed deferred event");
                    emitted = intent;
                }
                Err(event) => remaining.push_back(event),
            }
        }

        self.deferred = remaining;
        emitted
    }
}

/// Opening message listing the available models
#[must_use]
pub fn opening_message(models: &[String]) -> String {
    if models.is_empty() {
        "Hello! I couldn't find any models, but let's talk anyway.".to_string()
    } else {
        format!("Hello! The models are {}", models.join(" "))
    }
}
