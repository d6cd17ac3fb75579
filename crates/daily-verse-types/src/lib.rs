//! Daily Verse Types - Pure type definitions
//!
//! Plain data records shared by the store, the services and the HTTP layer.
//! Nothing in here depends on an async runtime.

pub mod dispatch;
pub mod session;
pub mod user;
pub mod verse;

pub use dispatch::*;
pub use session::*;
pub use user::*;
pub use verse::*;
