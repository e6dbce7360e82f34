//! Route handlers for the HTTP API.

pub mod events;
pub mod files;
pub mod health;
pub mod upload;
