pub mod credentials;
pub mod get;

pub use get::{GetOptions, GetPlan};
