//! Dialogue states

/// Top-level state of the dialogue machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueState {
    /// Waiting for the speech adapter to become ready
    Prepare,
    /// Fetching the model directory for the opening message
    FetchModels,
    /// Conversational cycle
    Main(MainState),
    /// Speech adapter failed; nothing further is accepted
    Failed,
}

/// Sub-states of the conversational cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainState {
    /// Opening message stored, waiting for the user to start
    Prompt,
    /// Speaking the opening message
    SpeakPrompt,
    /// Listening for the user
    Ask,
    /// Waiting for the model reply
    ChatCompletion,
    /// Speaking the model reply
    Speaking,
    /// Speaking the "can't hear you" phrase after no input
    Reprompt,
    /// Speaking the apology after a failed completion
    Apologize,
}

impl DialogueState {
    /// Dotted label shown in logs and on the status surface
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Prepare => "Prepare",
            Self::FetchModels => "FetchModels",
            Self::Failed => "Failed",
            Self::Main(main) => match main {
                MainState::Prompt => "Main.Prompt",
                MainState::SpeakPrompt => "Main.SpeakPrompt",
                MainState::Ask => "Main.Ask",
                MainState::ChatCompletion => "Main.ChatCompletion",
                MainState::Speaking => "Main.Speaking",
                MainState::Reprompt => "Main.Reprompt",
                MainState::Apologize => "Main.Apologize",
            },
        }
    }

    /// Whether the machine can still make progress
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for DialogueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
