pub mod commands;
pub mod config;
pub mod error;
pub mod keystone;
pub mod security;
pub mod transport;
pub mod utils;

pub use error::{Error, Result};

// Crate version exposed for runtime queries
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
