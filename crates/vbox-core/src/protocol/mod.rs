//! The `VBoxManage` command-line vocabulary: what we send and what we read back.

pub mod commands;
pub mod parse;

pub use parse::{parse_machine_readable, parse_vm_list, vm_state, MachineInfo};
