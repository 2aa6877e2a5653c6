pub mod auth;
pub mod audit_log;
pub mod token_cache;
pub mod token_manager;

pub use auth::{AccessToken, Credentials, Session};
pub use token_cache::TokenCache;
pub use token_manager::{Authenticated, TokenManager, TokenSource, Warning};
