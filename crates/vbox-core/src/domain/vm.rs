//! Value types describing a VM and what can be done to it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a VM name is rejected before it reaches the hypervisor CLI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmNameError {
    #[error("VM name is empty")]
    Empty,

    /// `VBoxManage` would parse a leading dash as an option.
    #[error("VM name {0:?} starts with '-'")]
    LeadingDash(String),

    #[error("VM name {0:?} contains control characters")]
    ControlCharacter(String),
}

/// Name of a VM as known to the hypervisor.
///
/// Constructing a `VmName` only proves the string is safe to place in an
/// argument vector.  Whether the VM exists is checked against the
/// hypervisor's own listing at the time of use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VmName(String);

impl VmName {
    /// Validates a raw name taken from a request.
    ///
    /// # Errors
    ///
    /// Returns [`VmNameError`] for empty names, names starting with `-`, and
    /// names containing control characters.
    pub fn parse(raw: &str) -> Result<Self, VmNameError> {
        if raw.is_empty() {
            return Err(VmNameError::Empty);
        }
        if raw.starts_with('-') {
            return Err(VmNameError::LeadingDash(raw.to_string()));
        }
        if raw.chars().any(char::is_control) {
            return Err(VmNameError::ControlCharacter(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VmName {
    type Error = VmNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VmName> for String {
    fn from(name: VmName) -> Self {
        name.0
    }
}

/// Observed run state of a VM.
///
/// Derived fresh from the hypervisor on every query; never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VmRunState {
    Running,
    Stopped,
    Unknown,
}

impl VmRunState {
    /// Maps a raw `VMState` value from `showvminfo --machinereadable`.
    ///
    /// Transitional and unexpected states map to [`VmRunState::Unknown`]
    /// rather than failing.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "running" => VmRunState::Running,
            "poweroff" | "aborted" | "saved" | "aborted-saved" => VmRunState::Stopped,
            _ => VmRunState::Unknown,
        }
    }
}

/// Returned when a lifecycle action string is not one of the supported ones.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid VM action: {0:?}")]
pub struct InvalidAction(pub String);

/// A lifecycle action, one-to-one with a hypervisor subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Start,
    PowerOff,
    SaveState,
}

impl ControlAction {
    /// The action name as used in requests and responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ControlAction::Start => "start",
            ControlAction::PowerOff => "poweroff",
            ControlAction::SaveState => "savestate",
        }
    }
}

impl FromStr for ControlAction {
    type Err = InvalidAction;

    /// Parses `start`, `poweroff`, or `savestate`, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(ControlAction::Start),
            "poweroff" => Ok(ControlAction::PowerOff),
            "savestate" => Ok(ControlAction::SaveState),
            _ => Err(InvalidAction(s.to_string())),
        }
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_name_accepts_spaces_and_punctuation() {
        let name = VmName::parse("Ubuntu 22.04 (dev); rm -rf").unwrap();
        assert_eq!(name.as_str(), "Ubuntu 22.04 (dev); rm -rf");
    }

    #[test]
    fn test_vm_name_rejects_empty() {
        assert_eq!(VmName::parse(""), Err(VmNameError::Empty));
    }

    #[test]
    fn test_vm_name_rejects_leading_dash() {
        assert!(matches!(
            VmName::parse("--help"),
            Err(VmNameError::LeadingDash(_))
        ));
    }

    #[test]
    fn test_vm_name_rejects_newline() {
        assert!(matches!(
            VmName::parse("vm\nname"),
            Err(VmNameError::ControlCharacter(_))
        ));
    }

    #[test]
    fn test_run_state_maps_running() {
        assert_eq!(VmRunState::from_raw("running"), VmRunState::Running);
    }

    #[test]
    fn test_run_state_maps_stopped_family() {
        for raw in ["poweroff", "aborted", "saved", "PowerOff"] {
            assert_eq!(VmRunState::from_raw(raw), VmRunState::Stopped, "{raw}");
        }
    }

    #[test]
    fn test_run_state_unrecognized_is_unknown() {
        // Arrange: a transitional state and garbage
        for raw in ["paused", "starting", "gurumeditation", ""] {
            // Act / Assert
            assert_eq!(VmRunState::from_raw(raw), VmRunState::Unknown, "{raw}");
        }
    }

    #[test]
    fn test_control_action_parses_case_insensitively() {
        assert_eq!("PowerOff".parse::<ControlAction>(), Ok(ControlAction::PowerOff));
        assert_eq!("start".parse::<ControlAction>(), Ok(ControlAction::Start));
        assert_eq!("SAVESTATE".parse::<ControlAction>(), Ok(ControlAction::SaveState));
    }

    #[test]
    fn test_control_action_rejects_unknown() {
        assert_eq!(
            "reset".parse::<ControlAction>(),
            Err(InvalidAction("reset".to_string()))
        );
    }

    #[test]
    fn test_control_action_round_trips_through_as_str() {
        for action in [ControlAction::Start, ControlAction::PowerOff, ControlAction::SaveState] {
            assert_eq!(action.as_str().parse::<ControlAction>(), Ok(action));
        }
    }
}
