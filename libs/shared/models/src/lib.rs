pub mod auth;
pub mod error;

pub use auth::{SessionTokens, StaticTokenStore, TokenStore};
pub use error::AppError;
