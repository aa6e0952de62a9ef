//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `--config <path>` on the command line
//! 2. `$MAILHOOK_CONFIG` (environment variable)
//! 3. `~/.config/mailhook/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailhook\config.toml` (Windows)
//! 4. Built-in defaults
//!
//! The configuration is loaded once at startup and passed by reference into
//! every stage of the pipeline; nothing reads it from global state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Platform quotas for text fields and attachments.
    pub limits: Limits,
    /// Appearance of the posted notification.
    pub notification: NotificationConfig,
    /// Recipient → webhook routing table.
    pub routing: RoutingConfig,
    /// HTTP client settings.
    pub http: HttpConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Quotas imposed by the receiving platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum characters in the notification title.
    pub title_max: usize,
    /// Maximum characters in a single field value.
    pub field_max: usize,
    /// Maximum characters in the notification body.
    pub body_max: usize,
    /// Maximum size of a single uploaded file, in bytes.
    pub max_file_bytes: u64,
    /// Maximum number of files per message, archive included.
    pub max_files: usize,
    /// Maximum characters in a sanitized attachment filename.
    pub filename_max: usize,
    /// Maximum characters in the embed footer.
    pub footer_max: usize,
    /// Maximum characters in the webhook username override.
    pub username_max: usize,
}

/// Appearance of the posted notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Embed accent color (`0xRRGGBB` as an integer).
    pub color: u32,
    /// Username override for the webhook post.
    pub username: Option<String>,
    /// Avatar override for the webhook post.
    pub avatar_url: Option<String>,
    /// Footer text shown under the embed.
    pub footer: Option<String>,
    /// Filename of the plain-text archive attached to every notification.
    pub archive_name: String,
}

/// Recipient → webhook routing table.
///
/// Lookup order: exact address, then domain, then `default_webhook`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Webhook used when no address or domain entry matches.
    pub default_webhook: Option<String>,
    /// Full recipient address (lowercase) → webhook URL.
    pub addresses: BTreeMap<String, String>,
    /// Recipient domain (lowercase) → webhook URL.
    pub domains: BTreeMap<String, String>,
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds (0 = no timeout).
    pub timeout_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            title_max: 256,
            field_max: 1024,
            body_max: 4096,
            max_file_bytes: 8 * 1024 * 1024, // 8 MiB
            max_files: 10,
            filename_max: 100,
            footer_max: 2048,
            username_max: 80,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            color: 0x5865F2,
            username: Some("Mailhook".to_string()),
            avatar_url: None,
            footer: Some("Forwarded by mailhook".to_string()),
            archive_name: "email.txt".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("mailhook/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// An explicit `path` wins over the environment and the standard directory.
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config(path: Option<&Path>) -> Config {
    let path = match path.map(Path::to_path_buf).or_else(config_file_path) {
        Some(p) => p,
        None => return Config::default(),
    };
    if !path.exists() {
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            Config::default()
        }
    }
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILHOOK_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailhook").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailhook")
}
