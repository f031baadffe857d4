use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use webpforge_common::{NamingMode, TargetFormat};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub conversion: ConversionConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub preferences: PreferencesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Maximum number of items the queue may hold.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum size of one source file, in MiB.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

fn default_max_files() -> usize {
    50
}
fn default_max_file_size_mb() -> u64 {
    25
}

impl LimitsConfig {
    /// Size cap in bytes. Saturates instead of overflowing.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConversionConfig {
    /// Output format (webp or jpeg).
    #[serde(default)]
    pub format: TargetFormat,

    /// Fail an encode that takes longer than this. Unset means no limit.
    #[serde(default)]
    pub encode_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Delay before the file selection input is cleared after admission.
    #[serde(default = "default_input_reset_delay")]
    pub input_reset_delay_ms: u64,
}

fn default_input_reset_delay() -> u64 {
    100
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            input_reset_delay_ms: default_input_reset_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationsConfig {
    /// How long a notification stays visible.
    #[serde(default = "default_ttl")]
    pub ttl_ms: u64,

    /// Broadcast buffer size.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_ttl() -> u64 {
    4000
}
fn default_capacity() -> usize {
    64
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl(),
            capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExportConfig {
    /// Default naming mode for downloads and bundles.
    #[serde(default)]
    pub naming: NamingMode,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreferencesConfig {
    /// Where the default quality preference is stored.
    #[serde(default = "default_preferences_path")]
    pub path: PathBuf,
}

fn default_preferences_path() -> PathBuf {
    PathBuf::from("~/.config/webpforge/preferences.json")
}

impl PreferencesConfig {
    /// The configured path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        let raw = self.path.to_string_lossy();
        PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
    }
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            path: default_preferences_path(),
        }
    }
}
