//! fc-core: shared types, IDs, errors, configuration, and event system.
//!
//! This crate is the foundational dependency for the other fc-* crates,
//! providing the typed file identifier, the caller [`Identity`], a unified
//! error type, application configuration, and a broadcast event bus.

pub mod config;
pub mod content_type;
pub mod error;
pub mod events;
pub mod identity;
pub mod ids;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use identity::Identity;
pub use ids::*;
