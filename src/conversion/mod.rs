//! Image conversion.
//!
//! This module turns queued source images into lossy artifacts. It includes:
//!
//! - The [`EncoderSurface`] seam and its `image`/libwebp implementation
//! - The [`ConversionScheduler`] that drains the queue one item at a time
//!
//! # Single-flight rule
//!
//! The encoder surface holds one shared raster canvas and cannot run two
//! decode/draw/encode cycles at once. The scheduler owns a semaphore with a
//! single permit, and the queue store refuses to start an item while another
//! is converting, so at most one item is ever `converting`.

mod scheduler;
mod surface;

pub use scheduler::{ConversionScheduler, DrainReport, SchedulerHandle};
pub use surface::{EncoderSurface, ImageSurface};
