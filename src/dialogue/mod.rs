//! Dialogue orchestration
//!
//! A pure state machine over [`Event`]s that emits [`Intent`]s, plus the
//! append-only [`Transcript`] it owns. The [`runner`](crate::runner) executes
//! intents against the speech adapter and model server.

mod event;
mod intent;
pub mod machine;
mod state;
pub mod transcript;

#[cfg(test)]
mod proptests;

pub use event::Event;
pub use intent::{Intent, Operation};
pub use machine::{
    DialogueMachine, DialogueSettings, NoInputPolicy, Recognition, UnhandledEventPolicy,
    opening_message,
};
pub use state::{DialogueState, MainState};
pub use transcript::{Message, Role, Transcript};
