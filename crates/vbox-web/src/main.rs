//! VBox-Web-Control server entry point.
//!
//! Serves the browser control panel and turns its requests into
//! `VBoxManage` invocations.
//!
//! # Usage
//!
//! ```text
//! vbox-web [OPTIONS]
//!
//! Options:
//!   --config <PATH>              TOML configuration file
//!   --bind <IP>                  Address to listen on [default: 0.0.0.0]
//!   --port <PORT>                First port to try [default: 9091]
//!   --port-attempts <N>          Consecutive ports to try [default: 10]
//!   --vboxmanage <PATH>          Hypervisor CLI program [default: VBoxManage]
//!   --command-timeout <SECS>     Query timeout [default: 30]
//!   --lifecycle-timeout <SECS>   Start/stop timeout [default: 120]
//!   --start-type <TYPE>          startvm --type value [default: headless]
//!   --max-scancodes-per-call <N> Bytes per keyboardputscancode call [default: 64]
//!   --inter-batch-delay-ms <MS>  Pause between scancode calls [default: 10]
//!   --screenshot-dir <PATH>      Capture directory [default: OS temp dir]
//!   --log-level <FILTER>         Default log filter [default: info]
//! ```
//!
//! # Where settings come from
//!
//! Highest precedence first:
//!
//! 1. Command-line flags, or the matching `VBOX_WEB_*` environment variable.
//! 2. The TOML file named by `--config` / `VBOX_WEB_CONFIG`.
//! 3. Built-in defaults ([`ServerConfig::default`]).
//!
//! `RUST_LOG`, when set, overrides the configured log level.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::builder::RangedU64ValueParser;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vbox_web::application::VmOrchestrator;
use vbox_web::domain::ServerConfig;
use vbox_web::infrastructure::config_file::load_config_file;
use vbox_web::infrastructure::{run_server, VBoxManageGateway};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Browser control panel for headless VirtualBox VMs.
///
/// Every flag is optional; an absent flag falls back to the config file and
/// then to the built-in default.
#[derive(Debug, Default, Parser)]
#[command(
    name = "vbox-web",
    about = "Web control panel for VirtualBox VMs",
    version
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "VBOX_WEB_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the HTTP server to.
    #[arg(long, env = "VBOX_WEB_BIND")]
    bind: Option<IpAddr>,

    /// First TCP port to try.
    #[arg(long, env = "VBOX_WEB_PORT")]
    port: Option<u16>,

    /// How many consecutive ports to try when the port is in use.
    #[arg(long, env = "VBOX_WEB_PORT_ATTEMPTS")]
    port_attempts: Option<u16>,

    /// Program name or path of VBoxManage.
    #[arg(long, env = "VBOX_WEB_VBOXMANAGE")]
    vboxmanage: Option<PathBuf>,

    /// Timeout in seconds for list, status, info, screenshot and key calls.
    #[arg(long, env = "VBOX_WEB_COMMAND_TIMEOUT", value_parser = clap::value_parser!(u64).range(1..))]
    command_timeout: Option<u64>,

    /// Timeout in seconds for start, poweroff and savestate.
    #[arg(long, env = "VBOX_WEB_LIFECYCLE_TIMEOUT", value_parser = clap::value_parser!(u64).range(1..))]
    lifecycle_timeout: Option<u64>,

    /// Frontend type passed to `startvm --type`.
    #[arg(long, env = "VBOX_WEB_START_TYPE")]
    start_type: Option<String>,

    /// Scancode bytes per `keyboardputscancode` invocation.
    #[arg(
        long,
        env = "VBOX_WEB_MAX_SCANCODES_PER_CALL",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    max_scancodes_per_call: Option<usize>,

    /// Pause in milliseconds between scancode invocations.
    #[arg(long, env = "VBOX_WEB_INTER_BATCH_DELAY_MS")]
    inter_batch_delay_ms: Option<u64>,

    /// Directory where screenshots are written before being served.
    #[arg(long, env = "VBOX_WEB_SCREENSHOT_DIR")]
    screenshot_dir: Option<PathBuf>,

    /// Default log filter when `RUST_LOG` is not set.
    #[arg(long, env = "VBOX_WEB_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Builds the final [`ServerConfig`] from defaults, the config file, and
    /// the flags, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or holds invalid
    /// values.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = ServerConfig::default();

        if let Some(path) = &self.config {
            config = load_config_file(path)
                .and_then(|file| file.apply(config))
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
        }

        if let Some(ip) = self.bind {
            config.bind_addr.set_ip(ip);
        }
        if let Some(port) = self.port {
            config.bind_addr.set_port(port);
        }
        if let Some(attempts) = self.port_attempts {
            config.port_attempts = attempts;
        }
        if let Some(path) = self.vboxmanage {
            config.vboxmanage_path = path;
        }
        if let Some(secs) = self.command_timeout {
            config.command_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.lifecycle_timeout {
            config.lifecycle_timeout = Duration::from_secs(secs);
        }
        if let Some(start_type) = self.start_type {
            config.start_type = start_type;
        }
        if let Some(max) = self.max_scancodes_per_call {
            config.max_scancodes_per_call = max;
        }
        if let Some(ms) = self.inter_batch_delay_ms {
            config.inter_batch_delay = Duration::from_millis(ms);
        }
        if let Some(dir) = self.screenshot_dir {
            config.screenshot_dir = dir;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed with `clap` and merged with the config file
///    into a [`ServerConfig`].
/// 2. `tracing_subscriber` is initialised.  `RUST_LOG` wins when set;
///    otherwise the configured log level applies.
/// 3. The `VBoxManage` gateway and the orchestrator are built.
/// 4. [`run_server`] binds the first free port and serves requests until
///    Ctrl+C is pressed.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_server_config()?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        vboxmanage = %config.vboxmanage_path.display(),
        bind = %config.bind_addr,
        "VBox-Web-Control starting"
    );

    let gateway = Arc::new(VBoxManageGateway::new(config.vboxmanage_path.clone()));
    let orchestrator = Arc::new(VmOrchestrator::new(gateway, config));

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
                // Without a signal handler, keep serving until killed.
                std::future::pending::<()>().await;
            }
        }
    };

    run_server(orchestrator, shutdown).await?;

    info!("VBox-Web-Control stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
