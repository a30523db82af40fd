//! Per-conversation chat state: the append-only turn history, the selected
//! place, and the in-flight guard.
//!
//! A submission is two steps so a caller holding the session behind a lock
//! can release it while the model call runs: [`ChatSession::begin`] records
//! the user turn and hands back the prompt, [`ChatSession::finish`] records
//! the reply. [`ChatSession::submit`] does both around one generator call.

use thiserror::Error;
use tripdash_core::{ChatTurn, LocationEntry};
use tripdash_gemini::{GeminiError, TextGenerator};

use crate::parse::extract_locations;
use crate::prompt::build_explore_prompt;

/// Assistant text recorded when the model call fails for any reason.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a reply is already pending for this session")]
    Busy,

    #[error("no reply is pending for this session")]
    NotPending,

    #[error("turn {0} does not exist")]
    NoSuchTurn(usize),

    #[error("turn {turn} has no location at index {index}")]
    NoSuchLocation { turn: usize, index: usize },
}

/// Position of a place within the history: turn index, then location index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub turn: usize,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
    selected: Option<Selection>,
    pending: bool,
    place_count: usize,
}

impl ChatSession {
    #[must_use]
    pub fn new(place_count: usize) -> Self {
        Self {
            turns: Vec::new(),
            selected: None,
            pending: false,
            place_count,
        }
    }

    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    #[must_use]
    pub fn selected(&self) -> Option<Selection> {
        self.selected
    }

    #[must_use]
    pub fn selected_location(&self) -> Option<&LocationEntry> {
        let sel = self.selected?;
        self.turns.get(sel.turn)?.locations.get(sel.index)
    }

    /// Record the user's input and return the prompt to send.
    ///
    /// Blank input is ignored and yields `Ok(None)` with no state change.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Busy`] while a previous submission is unfinished.
    pub fn begin(&mut self, input: &str) -> Result<Option<String>, SessionError> {
        if input.trim().is_empty() {
            return Ok(None);
        }
        if self.pending {
            return Err(SessionError::Busy);
        }
        self.turns.push(ChatTurn::user(input));
        self.selected = None;
        self.pending = true;
        Ok(Some(build_explore_prompt(input, self.place_count)))
    }

    /// Record the outcome of the model call started by [`ChatSession::begin`].
    ///
    /// A failed call becomes a [`FALLBACK_REPLY`] turn with no locations. When
    /// the reply yields places, the first one becomes the selection.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotPending`] if no submission is in flight.
    pub fn finish(&mut self, outcome: Result<String, GeminiError>) -> Result<&ChatTurn, SessionError> {
        if !self.pending {
            return Err(SessionError::NotPending);
        }

        let turn = match outcome {
            Ok(text) => {
                let locations = extract_locations(&text);
                tracing::debug!(locations = locations.len(), "assistant reply parsed");
                ChatTurn::assistant(text, locations)
            }
            Err(e) => {
                tracing::warn!(error = %e, "text generation failed, recording fallback reply");
                ChatTurn::assistant(FALLBACK_REPLY, Vec::new())
            }
        };
        Ok(self.record_reply(turn))
    }

    /// Close a submission whose reply will never arrive, e.g. because the
    /// caller waiting on it went away. Records [`FALLBACK_REPLY`] so the
    /// history keeps its user/assistant pairing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotPending`] if no submission is in flight.
    pub fn abandon(&mut self) -> Result<&ChatTurn, SessionError> {
        if !self.pending {
            return Err(SessionError::NotPending);
        }
        tracing::warn!("submission abandoned before its reply, recording fallback reply");
        Ok(self.record_reply(ChatTurn::assistant(FALLBACK_REPLY, Vec::new())))
    }

    fn record_reply(&mut self, turn: ChatTurn) -> &ChatTurn {
        self.pending = false;
        let index = self.turns.len();
        if turn.has_locations() {
            self.selected = Some(Selection { turn: index, index: 0 });
        }
        self.turns.push(turn);
        &self.turns[index]
    }

    /// Run one full submission against `generator`.
    ///
    /// Returns the assistant turn, or `None` for blank input.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Busy`] while a previous submission is unfinished.
    pub async fn submit<G>(&mut self, generator: &G, input: &str) -> Result<Option<&ChatTurn>, SessionError>
    where
        G: TextGenerator + ?Sized,
    {
        let Some(prompt) = self.begin(input)? else {
            return Ok(None);
        };
        let outcome = generator.generate(&prompt).await;
        self.finish(outcome).map(Some)
    }

    /// Point the selection at location `index` of turn `turn`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSuchTurn`] or [`SessionError::NoSuchLocation`]
    /// when the position does not exist; the previous selection is kept.
    pub fn select(&mut self, turn: usize, index: usize) -> Result<&LocationEntry, SessionError> {
        let entry = self
            .turns
            .get(turn)
            .ok_or(SessionError::NoSuchTurn(turn))?
            .locations
            .get(index)
            .ok_or(SessionError::NoSuchLocation { turn, index })?;
        self.selected = Some(Selection { turn, index });
        Ok(entry)
    }
}
