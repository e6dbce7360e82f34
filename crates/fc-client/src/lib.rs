//! fc-client: talking to a filecast server.
//!
//! The main entry point is [`UploadCoordinator`], which sends one upload at
//! a time and reports byte-level progress while it runs.

pub mod coordinator;
pub mod error;

pub use coordinator::{
    NavigationDecision, UploadCoordinator, UploadOptions, UploadProgress, UploadedFile,
    NAVIGATION_PROMPT,
};
pub use error::ClientError;
