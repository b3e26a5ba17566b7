//! Service integrations and shared state.
//!
//! This module contains the pieces the interaction handlers are built from:
//! - Chat services (e.g., Discord)
//! - Preference storage (in-memory, JSON file, SurrealDB)
//! - Per-user cooldown tracking
//!
//! External services define both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod chat;
pub mod cooldown;
pub mod store;
