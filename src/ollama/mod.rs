//! Model server contracts and the Ollama HTTP client
//!
//! The dialogue only needs two calls: list the installed models (for the
//! opening message) and turn a transcript into one assistant reply.

mod client;

use async_trait::async_trait;

use crate::Result;
use crate::dialogue::Message;

pub use client::OllamaClient;

/// Produces one assistant reply for an ordered transcript
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Return the content of the assistant reply
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-2xx status or malformed reply
    async fn complete(&self, messages: &[Message]) -> Result<String>;
}

/// Lists the models available on the server
#[async_trait]
pub trait ModelDirectory: Send + Sync {
    /// Return the installed model names
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-2xx status or malformed body
    async fn list_models(&self) -> Result<Vec<String>>;
}
