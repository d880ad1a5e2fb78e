//! `ChatKit` relay core library
//!
//! Shared functionality for the relay binary:
//! - Session credential and request body wire types
//! - Secret wrapper that keeps credentials out of logs
//! - Common error types
//! - Tracing initialisation

pub mod error;
pub mod secret;
pub mod session;
pub mod tracing_init;

pub use error::{Error, Result};
pub use secret::Secret;
pub use session::{RefreshRequest, SessionCredential, StartRequest};
