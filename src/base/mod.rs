//! Core components, types, and utilities for auto-react.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Emoji validation and the `Emoji` preference type.
//! - Typed store and validation errors.
//! - User-facing reply text.
//! - Common types and result handling.

pub mod config;
pub mod emoji;
pub mod error;
pub mod replies;
pub mod types;
