//! # Earmark Common Library
//!
//! Shared code for the Earmark annotation engine including:
//! - Error taxonomy (Error enum)
//! - Event types (EarmarkEvent enum) and EventBus
//! - Task configuration loading and validation
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
