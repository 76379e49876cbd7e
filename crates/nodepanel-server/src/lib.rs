//! `NodePanel` Server Library
//!
//! Core functionality for the panel server:
//! - `SQLite` storage for users, groups, nodes, inbounds and sync history
//! - Admin authentication (PBKDF2 password hashes, JWT bearer tokens)
//! - HTTP client for node agents
//! - Node sync engine with per-node serialization and group fan-out
//! - Panel write paths and the JSON procedure surface

pub mod auth;
pub mod node;
pub mod panel;
pub mod server;
pub mod storage;
pub mod sync;

#[cfg(test)]
pub mod test_helpers;
