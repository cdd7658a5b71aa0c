use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session identity handed to this core by the host application.
/// The core never acquires or refreshes tokens itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub user_id: Uuid,
    pub access_token: String,
}

/// Read-only view over wherever the host keeps its session.
pub trait TokenStore: Send + Sync {
    fn get_tokens(&self) -> Option<SessionTokens>;
}

pub struct StaticTokenStore {
    tokens: SessionTokens,
}

impl StaticTokenStore {
    pub fn new(tokens: SessionTokens) -> Self {
        Self { tokens }
    }
}

impl TokenStore for StaticTokenStore {
    fn get_tokens(&self) -> Option<SessionTokens> {
        Some(self.tokens.clone())
    }
}
