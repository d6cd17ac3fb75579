//! Daily Verse Core Library
//!
//! Error taxonomy and the port traits the server wires together at startup.

// Re-export pure types from daily-verse-types
pub use daily_verse_types::*;

pub mod error;
pub mod ports;

pub use error::{Result, VerseError};
pub use ports::{
    EntityStore, MailSender, SessionStore, UserStore, UserVerseStore, VerseSource, VerseStore,
};
