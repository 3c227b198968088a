//! Parsers for text printed by `VBoxManage`.
//!
//! None of these fail.  Lines that do not look like what we expect are
//! skipped, because the CLI interleaves warnings and progress output with
//! the data we want.

use std::collections::BTreeMap;

/// Key/value dump from `showvminfo --machinereadable`.
pub type MachineInfo = BTreeMap<String, String>;

/// Key under which `showvminfo --machinereadable` reports the run state.
pub const VM_STATE_KEY: &str = "VMState";

/// Extracts VM names from `list vms` output.
///
/// Each line has the form `"<name>" {<uuid>}`.  The name may itself contain
/// quotes, so it is taken as everything between the first quote and the
/// quote that precedes the UUID.
pub fn parse_vm_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let inner = line.trim().strip_prefix('"')?;
            let name = match inner.rsplit_once("\" {") {
                Some((name, _uuid)) => name,
                None => inner.strip_suffix('"')?,
            };
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

/// Parses `key=value` lines into a map.
///
/// Keys are trimmed; values are trimmed and stripped of surrounding double
/// quotes.  A repeated key keeps its last value.
pub fn parse_machine_readable(stdout: &str) -> MachineInfo {
    let mut info = MachineInfo::new();
    for line in stdout.lines() {
        if let Some((key, value)) = line.split_once('=') {
            info.insert(
                key.trim().to_string(),
                value.trim().trim_matches('"').to_string(),
            );
        }
    }
    info
}

/// The raw `VMState` value, if the dump has one.
pub fn vm_state(info: &MachineInfo) -> Option<&str> {
    info.get(VM_STATE_KEY).map(String::as_str)
}
