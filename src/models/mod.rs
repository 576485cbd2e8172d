//! Core data models for the file API.
//!
//! `object` describes what the store hands back for a key; `auth` carries the
//! token claims and the JSON request bodies of the auth and transfer routes.

pub mod auth;
pub mod object;
