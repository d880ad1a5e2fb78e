//! `ChatKit` token relay
//!
//! Mints short-lived `ChatKit` client secrets on behalf of the browser
//! widget, keeping the API key on the server.

pub mod config;
pub mod routes;
pub mod upstream;
