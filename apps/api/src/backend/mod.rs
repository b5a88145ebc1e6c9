//! Adapters for the hosted backend: auth, blob storage and résumé rows.
//! Each returns its own typed error.

pub mod auth;
pub mod data;
pub mod storage;
