//! Shared, immutable per-process state handed to every handler.

use crate::services::{
    credential_service::CredentialStore, object_store::ObjectStore, token_service::TokenService,
};
use std::sync::Arc;

/// Handles to the collaborators. Cloning is cheap; nothing in here is
/// mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub credentials: Arc<dyn CredentialStore>,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        credentials: Arc<dyn CredentialStore>,
        tokens: TokenService,
    ) -> Self {
        Self {
            store,
            credentials,
            tokens,
        }
    }
}
