//! Event handling and user interactions for auto-react.
//!
//! This module provides functionality for handling inbound messages:
//! - Classifying private-channel commands and acting on them
//! - Reacting to everything else with the author's preferred emoji
//! - Spawning one task per inbound message

pub mod command;
pub mod message;
pub mod reaction;
