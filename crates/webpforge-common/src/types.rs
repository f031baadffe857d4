//! Core type definitions for the conversion queue.
//!
//! All enums serialize in lowercase so that persisted preferences, config
//! files and emitted events share one spelling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lossy encoding quality in `[0.10, 0.90]`.
///
/// Every constructor clamps, so a `Quality` value is always safe to hand to
/// an encoder.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Quality(f32);

impl Quality {
    /// Lowest accepted quality.
    pub const MIN: Quality = Quality(0.10);
    /// Highest accepted quality.
    pub const MAX: Quality = Quality(0.90);
    /// Built-in default used when no preference exists.
    pub const DEFAULT: Quality = Quality(0.50);

    /// Clamp `value` into range. Non-finite input falls back to the default.
    #[must_use]
    pub fn new(value: f32) -> Self {
        if !value.is_finite() {
            return Self::DEFAULT;
        }
        Self(value.clamp(Self::MIN.0, Self::MAX.0))
    }

    /// Whether `value` is already inside the accepted range.
    pub fn in_range(value: f32) -> bool {
        value.is_finite() && value >= Self::MIN.0 && value <= Self::MAX.0
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Rounded percentage, e.g. `0.75` -> `75`.
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round() as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<f32> for Quality {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for f32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Lifecycle status of a queued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Waiting for the scheduler.
    Pending,
    /// Currently on the encoder surface.
    Converting,
    /// Converted; a result artifact exists.
    Done,
    /// Decode or encode failed; only an explicit retry re-queues it.
    Failed,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Converting => write!(f, "converting"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Lossy output format produced by the encoder surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[default]
    WebP,
    Jpeg,
}

impl TargetFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::WebP => "webp",
            Self::Jpeg => "jpg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::WebP => "image/webp",
            Self::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebP => write!(f, "webp"),
            Self::Jpeg => write!(f, "jpeg"),
        }
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "webp" => Ok(Self::WebP),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            other => Err(format!("unknown target format '{other}' (expected webp or jpeg)")),
        }
    }
}

/// How output file names are derived from source names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingMode {
    /// `photo.png` -> `photo.webp`
    #[default]
    Original,
    /// `photo.png` -> `photo-q75.webp`
    Suffix,
}

impl fmt::Display for NamingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => write!(f, "original"),
            Self::Suffix => write!(f, "suffix"),
        }
    }
}

impl FromStr for NamingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "suffix" => Ok(Self::Suffix),
            other => Err(format!("unknown naming mode '{other}' (expected original or suffix)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_clamps() {
        assert_eq!(Quality::new(0.0), Quality::MIN);
        assert_eq!(Quality::new(-3.0), Quality::MIN);
        assert_eq!(Quality::new(1.0), Quality::MAX);
        assert_eq!(Quality::new(0.42).value(), 0.42);
        assert_eq!(Quality::new(f32::NAN), Quality::DEFAULT);
        assert_eq!(Quality::new(f32::INFINITY), Quality::DEFAULT);
    }

    #[test]
    fn test_quality_percent() {
        assert_eq!(Quality::new(0.75).percent(), 75);
        assert_eq!(Quality::DEFAULT.to_string(), "50%");
    }

    #[test]
    fn test_quality_in_range() {
        assert!(Quality::in_range(0.10));
        assert!(Quality::in_range(0.90));
        assert!(!Quality::in_range(0.05));
        assert!(!Quality::in_range(0.95));
        assert!(!Quality::in_range(f32::NAN));
    }

    #[test]
    fn test_quality_deserialize_clamps() {
        let q: Quality = serde_json::from_str("3.5").unwrap();
        assert_eq!(q, Quality::MAX);
        let json = serde_json::to_string(&Quality::new(0.3)).unwrap();
        assert_eq!(json, "0.3");
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ItemStatus::Converting).unwrap();
        assert_eq!(json, "\"converting\"");
        assert_eq!(ItemStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_target_format() {
        assert_eq!(TargetFormat::default(), TargetFormat::WebP);
        assert_eq!(TargetFormat::WebP.extension(), "webp");
        assert_eq!(TargetFormat::Jpeg.mime_type(), "image/jpeg");
        assert_eq!("JPG".parse::<TargetFormat>().unwrap(), TargetFormat::Jpeg);
        assert!("avif".parse::<TargetFormat>().is_err());
    }

    #[test]
    fn test_naming_mode_parse() {
        assert_eq!("suffix".parse::<NamingMode>().unwrap(), NamingMode::Suffix);
        assert_eq!("Original".parse::<NamingMode>().unwrap(), NamingMode::Original);
        assert!("fancy".parse::<NamingMode>().is_err());
    }
}
