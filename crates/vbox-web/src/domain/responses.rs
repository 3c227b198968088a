//! Payloads returned to the browser.
//!
//! Every successful operation has its own response struct; every failure is
//! an [`ErrorResponse`] carrying a human-readable message and a stable `kind`
//! string the frontend can switch on.  Field names are camelCase on the wire
//! (`keysSent`, `rawState`).

use serde::{Deserialize, Serialize};

use vbox_core::protocol::MachineInfo;
use vbox_core::{ControlAction, VmRunState};

/// Result of a lifecycle action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlResponse {
    pub vm: String,
    pub action: ControlAction,
    /// Always `"ok"`; failures are reported as [`ErrorResponse`].
    pub result: String,
}

impl ControlResponse {
    pub fn ok(vm: impl Into<String>, action: ControlAction) -> Self {
        Self {
            vm: vm.into(),
            action,
            result: "ok".to_string(),
        }
    }
}

/// Result of a keystroke injection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysResponse {
    pub vm: String,
    /// Number of keys tapped (literal characters plus `<token>`s).
    pub keys_sent: usize,
}

/// Observed run state of a VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub vm: String,
    pub state: VmRunState,
    /// The hypervisor's own state string, when it reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_state: Option<String>,
}

/// Full configuration dump, passed through without interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub vm: String,
    pub fields: MachineInfo,
}

/// Failure payload shared by all JSON operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// Encoding of a screenshot body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Svg => "image/svg+xml",
        }
    }

    /// File name offered when the browser downloads the image.
    pub fn file_name(self) -> &'static str {
        match self {
            ImageFormat::Png => "screenshot.png",
            ImageFormat::Svg => "screenshot.svg",
        }
    }
}

/// Image bytes for the screenshot view; never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    /// `true` when the capture failed and `bytes` is the fixed placeholder.
    pub placeholder: bool,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
