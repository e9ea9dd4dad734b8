//! Credentials for the HTTP transport.

pub mod credential;

pub use credential::{Credential, CredentialRefresher, CredentialSnapshot, IssuedToken};
