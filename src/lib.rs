//! Webpforge - batch image to WebP conversion queue
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod conversion;
pub mod export;
pub mod handles;
pub mod ingest;
pub mod notifications;
pub mod preferences;
pub mod retrieval;
pub mod session;
pub mod state;
