//! vbox-web library crate.
//!
//! A browser control panel for headless VirtualBox guests: list the VMs on
//! the host, start/stop/save them, type into them, read their state, and
//! watch their screen.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browser (HTTP GET + JSON / image bytes)
//!         ↕
//! [vbox-web]
//!   ├── domain/           ServerConfig and response payloads
//!   ├── application/      Orchestrator, per-VM locks, screenshot service
//!   └── infrastructure/
//!         ├── gateway       HypervisorGateway trait + VBoxManage process runner
//!         ├── scripted      Recording test double for the gateway
//!         ├── config_file   TOML configuration file
//!         └── http_server   axum routes
//!         ↕
//! VBoxManage  (one argument vector per call, never a shell)
//! ```
//!
//! # Layer rules
//!
//! - `domain` does no I/O.
//! - `application` talks to the hypervisor only through the
//!   [`HypervisorGateway`](infrastructure::gateway::HypervisorGateway) trait.
//! - `infrastructure` owns processes, files, sockets and HTTP.
//!
//! # For beginners: why this structure?
//!
//! The interesting rules (validate before calling out, never let two
//! operations on one VM overlap, always have an image to show) live in the
//! application layer.  Because it only sees a trait, the tests can swap
//! `VBoxManage` for a scripted double and check those rules without
//! VirtualBox installed.

/// Domain layer: configuration and payload types (no I/O).
pub mod domain;

/// Application layer: VM operation orchestration.
pub mod application;

/// Infrastructure layer: hypervisor process gateway, config file, HTTP server.
pub mod infrastructure;
