//! Webpforge-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across webpforge:
//!
//! - **Typed IDs**: Type-safe UUID wrappers for queue items and notifications
//! - **Core Types**: Quality, item status, target formats and naming modes
//! - **Path Utilities**: Image detection and output file naming
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use webpforge_common::{ItemId, Quality, Error, Result};
//! use webpforge_common::paths::is_image_mime;
//!
//! // Create typed IDs
//! let item_id = ItemId::new();
//!
//! // Quality is always clamped into range
//! assert_eq!(Quality::new(2.0), Quality::MAX);
//!
//! // Check file types
//! assert!(is_image_mime("image/jpeg"));
//!
//! // Use common error types
//! fn example() -> Result<()> {
//!     Err(Error::not_found("item"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
