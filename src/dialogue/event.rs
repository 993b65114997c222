//! Events fed into the dialogue machine

/// Input to [`DialogueMachine::handle`](super::DialogueMachine::handle)
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Speech adapter finished preparing
    AdapterReady,
    /// Speech adapter could not prepare, listen or speak
    AdapterFailed(String),
    /// Model directory returned these names
    ModelsFetched(Vec<String>),
    /// Model directory could not be fetched
    FetchFailed(String),
    /// The user pressed the trigger
    UserClick,
    /// A (possibly partial) recognition result
    Recognized {
        text: String,
        confidence: Option<f32>,
    },
    /// The adapter finished a listen
    ListenComplete,
    /// No speech was detected within the adapter's timeout
    NoInput,
    /// An utterance finished playing
    SpeakComplete,
    /// The model replied with this content
    CompletionDone(String),
    /// The model call failed or timed out
    CompletionFailed(String),
}

impl Event {
    /// Short name used in logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AdapterReady => "adapter_ready",
            Self::AdapterFailed(_) => "adapter_failed",
            Self::ModelsFetched(_) => "fetch_done",
            Self::FetchFailed(_) => "fetch_failed",
            Self::UserClick => "user_click",
            Self::Recognized { .. } => "recognized",
            Self::ListenComplete => "listen_complete",
            Self::NoInput => "no_input",
            Self::SpeakComplete => "speak_complete",
            Self::CompletionDone(_) => "completion_done",
            Self::CompletionFailed(_) => "completion_failed",
        }
    }
}
