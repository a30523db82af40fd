//! Turn free-text model replies into map-ready places, and run the chat
//! session that asks for them.

pub mod parse;
pub mod prompt;
pub mod session;

pub use parse::{extract_locations, parse_block, BLOCK_DELIMITER};
pub use prompt::build_explore_prompt;
pub use session::{ChatSession, Selection, SessionError, FALLBACK_REPLY};
