//! Domain layer for vbox-web.
//!
//! Plain data: runtime configuration and the payloads the browser receives.
//! Nothing in here performs I/O, spawns processes, or knows about HTTP.

pub mod config;
pub mod responses;

pub use config::ServerConfig;
pub use responses::{
    ControlResponse, ErrorResponse, ImageFormat, InfoResponse, KeysResponse, Screenshot,
    StatusResponse,
};
