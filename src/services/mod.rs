//! Collaborators behind the HTTP layer: object storage, credentials, tokens.

pub mod credential_service;
pub mod memory_store;
pub mod object_store;
pub mod storage_service;
pub mod token_service;
