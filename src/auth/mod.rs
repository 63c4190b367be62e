//! Persisted login state
//!
//! `AuthSessionStore` owns the session file. Freshness is never checked
//! locally; the query dispatcher finds out whether the workspace accepts the
//! session and invalidates it when it does not.

mod session;
mod store;

pub use session::{AuthSession, OriginStorage, StoredCookie};
pub use store::AuthSessionStore;
