//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for all runtime settings.
//! It is assembled once in `main.rs` from built-in defaults, an optional TOML
//! file, and command-line flags, then shared read-only.
//!
//! Keeping configuration as a plain struct (no global state, no environment
//! reads inside the domain) lets tests build exactly the configuration they
//! need with struct-update syntax:
//!
//! ```rust
//! use std::time::Duration;
//! use vbox_web::domain::ServerConfig;
//!
//! let cfg = ServerConfig {
//!     inter_batch_delay: Duration::ZERO,
//!     ..ServerConfig::default()
//! };
//! assert_eq!(cfg.bind_addr.port(), 9091);
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default HTTP port of the control panel.
pub const DEFAULT_PORT: u16 = 9091;

/// All runtime configuration for the control server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// First address the HTTP server tries to bind.
    pub bind_addr: SocketAddr,

    /// How many consecutive ports to try, starting at `bind_addr`'s port,
    /// when the port is already in use.
    pub port_attempts: u16,

    /// Program name or path of the hypervisor CLI.
    pub vboxmanage_path: PathBuf,

    /// Timeout for query invocations (list, showvminfo, screenshot, keys).
    pub command_timeout: Duration,

    /// Timeout for lifecycle invocations (start, poweroff, savestate).
    ///
    /// Starting a VM can take far longer than a query, so it gets its own
    /// budget.
    pub lifecycle_timeout: Duration,

    /// Frontend type passed to `startvm --type`.
    pub start_type: String,

    /// Upper bound on scancode bytes per `keyboardputscancode` invocation.
    pub max_scancodes_per_call: usize,

    /// Pause between consecutive scancode-injection invocations, giving the
    /// guest time to drain its keyboard buffer.
    pub inter_batch_delay: Duration,

    /// Directory where screen captures are written before being read back.
    pub screenshot_dir: PathBuf,

    /// Default `tracing` filter when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ServerConfig {
    /// | Field                    | Default          |
    /// |--------------------------|------------------|
    /// | bind_addr                | `0.0.0.0:9091`   |
    /// | port_attempts            | 10               |
    /// | vboxmanage_path          | `VBoxManage`     |
    /// | command_timeout          | 30 seconds       |
    /// | lifecycle_timeout        | 120 seconds      |
    /// | start_type               | `headless`       |
    /// | max_scancodes_per_call   | 64               |
    /// | inter_batch_delay        | 10 ms            |
    /// | screenshot_dir           | OS temp dir      |
    /// | log_level                | `info`           |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            port_attempts: 10,
            vboxmanage_path: PathBuf::from("VBoxManage"),
            command_timeout: Duration::from_secs(30),
            lifecycle_timeout: Duration::from_secs(120),
            start_type: "headless".to_string(),
            max_scancodes_per_call: 64,
            inter_batch_delay: Duration::from_millis(10),
            screenshot_dir: std::env::temp_dir(),
            log_level: "info".to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_is_9091() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr.port(), 9091);
    }

    #[test]
    fn test_default_binds_all_interfaces() {
        let cfg = ServerConfig::default();
        assert!(cfg.bind_addr.ip().is_unspecified());
    }

    #[test]
    fn test_default_program_is_vboxmanage() {
        assert_eq!(
            ServerConfig::default().vboxmanage_path,
            PathBuf::from("VBoxManage")
        );
    }

    #[test]
    fn test_lifecycle_timeout_exceeds_query_timeout() {
        let cfg = ServerConfig::default();
        assert!(cfg.lifecycle_timeout > cfg.command_timeout);
    }

    #[test]
    fn test_default_batch_budget_fits_extended_keys() {
        // A shifted or extended key needs up to three bytes per action.
        assert!(ServerConfig::default().max_scancodes_per_call >= 3);
    }
}
