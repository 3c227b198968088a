//! Domain types for VMs under control.
//!
//! Pure value types with no I/O.  Anything that comes from a request (a VM
//! name, an action string) is validated here before it gets anywhere near
//! the hypervisor CLI.

pub mod vm;

pub use vm::{ControlAction, InvalidAction, VmName, VmNameError, VmRunState};
