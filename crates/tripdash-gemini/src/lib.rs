//! Client for Google's Gemini `generateContent` endpoint, plus the
//! [`TextGenerator`] seam the chat session is written against.

pub mod client;
pub mod error;
pub mod types;

use futures::future::BoxFuture;

pub use client::GeminiClient;
pub use error::GeminiError;

/// Anything that turns a prompt into reply text.
///
/// The chat session only needs this one call, so tests and the server can
/// swap the HTTP client for an in-process stub.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, GeminiError>>;
}
