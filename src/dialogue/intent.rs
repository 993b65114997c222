//! Intents emitted by the dialogue machine
//!
//! The machine never performs I/O; each intent names one operation for the
//! runner to execute, and its completion comes back as an [`Event`](super::Event).

use super::transcript::Message;

/// Command for the effect layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Initialize the speech adapter
    Prepare,
    /// Fetch the model directory
    FetchModels,
    /// Start listening for the user
    Listen,
    /// Speak an utterance
    Speak(String),
    /// Request a completion for this transcript snapshot
    Complete(Vec<Message>),
}

/// Kind of asynchronous operation an intent starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Prepare,
    FetchModels,
    Listen,
    Speak,
    Complete,
}

impl Intent {
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Prepare => Operation::Prepare,
            Self::FetchModels => Operation::FetchModels,
            Self::Listen => Operation::Listen,
            Self::Speak(_) => Operation::Speak,
            Self::Complete(_) => Operation::Complete,
        }
    }
}

impl Operation {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::FetchModels => "fetch_models",
            Self::Listen => "listen",
            Self::Speak => "speak",
            Self::Complete => "complete",
        }
    }

    /// Operations executed by the speech adapter
    #[must_use]
    pub const fn is_speech(self) -> bool {
        matches!(self, Self::Prepare | Self::Listen | Self::Speak)
    }
}
