//! Business logic services

pub mod auth;
pub mod dispatcher;
pub mod mailer;
pub mod verse_source;

pub use auth::AuthService;
pub use dispatcher::BatchDispatcher;
pub use mailer::{LogMailer, SmtpMailer};
pub use verse_source::BibleApiSource;
