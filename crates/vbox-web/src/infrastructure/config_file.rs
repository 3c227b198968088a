//! TOML configuration file for the control server.
//!
//! The file is optional and only read when `--config <path>` (or
//! `VBOX_WEB_CONFIG`) names one.  Every field may be omitted; a missing
//! field keeps the built-in default from [`ServerConfig::default`].
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1"
//! port = 9091
//! port_attempts = 10
//!
//! [hypervisor]
//! vboxmanage = "/usr/bin/VBoxManage"
//! command_timeout_secs = 30
//! lifecycle_timeout_secs = 120
//! start_type = "headless"
//! screenshot_dir = "/var/tmp"
//!
//! [keyboard]
//! max_scancodes_per_call = 64
//! inter_batch_delay_ms = 10
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! # Serde default values
//!
//! `#[serde(default)]` on each section makes every field an `Option` that is
//! `None` when absent.  [`FileConfig::apply`] then overlays only the fields
//! that were actually written onto a base configuration, which keeps the
//! precedence rule simple: flags over file over defaults.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ServerConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field parsed but holds an unusable value.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level layout of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerSection,
    pub hypervisor: HypervisorSection,
    pub keyboard: KeyboardSection,
    pub logging: LoggingSection,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// IP address to bind.  `"0.0.0.0"` binds all interfaces.
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub port_attempts: Option<u16>,
}

/// How the hypervisor CLI is invoked.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HypervisorSection {
    pub vboxmanage: Option<PathBuf>,
    pub command_timeout_secs: Option<u64>,
    pub lifecycle_timeout_secs: Option<u64>,
    pub start_type: Option<String>,
    pub screenshot_dir: Option<PathBuf>,
}

/// Keystroke injection pacing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct KeyboardSection {
    pub max_scancodes_per_call: Option<usize>,
    pub inter_batch_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// `tracing` filter: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    pub level: Option<String>,
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Reads and parses the configuration file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read (including when it
/// does not exist; the path was given explicitly) and
/// [`ConfigError::Parse`] for invalid TOML or unknown fields.
pub fn load_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_config(&text)
}

/// Parses configuration file text.
pub fn parse_config(text: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

impl FileConfig {
    /// Overlays every field present in the file onto `base`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] for an unparsable bind address, a zero
    /// timeout, or a zero scancode budget.
    pub fn apply(self, mut base: ServerConfig) -> Result<ServerConfig, ConfigError> {
        if let Some(bind) = self.server.bind {
            let ip: IpAddr = bind.parse().map_err(|_| ConfigError::InvalidValue {
                field: "server.bind",
                reason: format!("{bind:?} is not an IP address"),
            })?;
            base.bind_addr = SocketAddr::new(ip, base.bind_addr.port());
        }
        if let Some(port) = self.server.port {
            base.bind_addr.set_port(port);
        }
        if let Some(attempts) = self.server.port_attempts {
            base.port_attempts = attempts;
        }

        let hv = self.hypervisor;
        if let Some(path) = hv.vboxmanage {
            base.vboxmanage_path = path;
        }
        if let Some(secs) = hv.command_timeout_secs {
            base.command_timeout = nonzero_secs("hypervisor.command_timeout_secs", secs)?;
        }
        if let Some(secs) = hv.lifecycle_timeout_secs {
            base.lifecycle_timeout = nonzero_secs("hypervisor.lifecycle_timeout_secs", secs)?;
        }
        if let Some(start_type) = hv.start_type {
            base.start_type = start_type;
        }
        if let Some(dir) = hv.screenshot_dir {
            base.screenshot_dir = dir;
        }

        if let Some(max) = self.keyboard.max_scancodes_per_call {
            if max == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "keyboard.max_scancodes_per_call",
                    reason: "must be at least 1".to_string(),
                });
            }
            base.max_scancodes_per_call = max;
        }
        if let Some(ms) = self.keyboard.inter_batch_delay_ms {
            base.inter_batch_delay = Duration::from_millis(ms);
        }

        if let Some(level) = self.logging.level {
            base.log_level = level;
        }

        Ok(base)
    }
}

/// Seconds as a timeout; zero is refused.
fn nonzero_secs(field: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be at least 1 second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
