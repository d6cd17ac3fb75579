//! Port traits (interfaces) for dependency injection

pub mod mail;
pub mod storage;
pub mod verse_source;

pub use mail::MailSender;
pub use storage::{EntityStore, SessionStore, UserStore, UserVerseStore, VerseStore};
pub use verse_source::VerseSource;
