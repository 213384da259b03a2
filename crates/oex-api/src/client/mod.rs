//! Client Agent: drives the authorization code + PKCE flow for browser sessions
//! and shows the protected resource once a token is held.

pub mod cookies;
pub mod page;
pub mod resource;
pub mod routes;
pub mod session;

pub use routes::{ENTRY_PATH, EntryParams, routes};
