//! API support shared by LDD services
//!
//! Framework-independent pieces only; HTTP handlers live in the service crates.

pub mod auth;

pub use auth::{bearer_token, generate_token, CredentialCheck, StaticToken};
