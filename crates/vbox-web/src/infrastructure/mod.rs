//! Infrastructure layer: everything that touches the outside world.

pub mod config_file;
pub mod gateway;
pub mod http_server;
pub mod scripted;

pub use gateway::{CommandOutput, GatewayError, GatewayErrorKind, HypervisorGateway, VBoxManageGateway};
pub use http_server::{router, run_server};
pub use scripted::ScriptedGateway;
