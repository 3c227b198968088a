//! Argument vectors for `VBoxManage` subcommands.
//!
//! Every builder returns a `Vec<String>` with one element per argument.  The
//! caller hands the vector to the process launcher as-is, so a VM name like
//! `"a; rm -rf /"` stays a single inert argument and is never seen by a
//! shell.  The program name itself is not included.

use std::path::Path;

use crate::domain::vm::{ControlAction, VmName};

/// `list vms`
pub fn list_vms() -> Vec<String> {
    vec!["list".into(), "vms".into()]
}

/// `showvminfo <vm> --machinereadable`
pub fn show_vm_info(vm: &VmName) -> Vec<String> {
    vec![
        "showvminfo".into(),
        vm.to_string(),
        "--machinereadable".into(),
    ]
}

/// Lifecycle subcommand for `action`.
///
/// Starting uses `startvm <vm> --type <start_type>`; the other actions are
/// `controlvm <vm> <action>`.
pub fn control(vm: &VmName, action: ControlAction, start_type: &str) -> Vec<String> {
    match action {
        ControlAction::Start => vec![
            "startvm".into(),
            vm.to_string(),
            "--type".into(),
            start_type.to_string(),
        ],
        ControlAction::PowerOff | ControlAction::SaveState => vec![
            "controlvm".into(),
            vm.to_string(),
            action.as_str().into(),
        ],
    }
}

/// `controlvm <vm> screenshotpng <path>`
pub fn screenshot_png(vm: &VmName, path: &Path) -> Vec<String> {
    vec![
        "controlvm".into(),
        vm.to_string(),
        "screenshotpng".into(),
        path.to_string_lossy().into_owned(),
    ]
}

/// `controlvm <vm> keyboardputscancode <hex> <hex> ...`
pub fn put_scancodes(vm: &VmName, bytes: &[u8]) -> Vec<String> {
    let mut args = Vec::with_capacity(3 + bytes.len());
    args.push("controlvm".to_string());
    args.push(vm.to_string());
    args.push("keyboardputscancode".to_string());
    args.extend(bytes.iter().map(|b| format!("{b:02x}")));
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm(name: &str) -> VmName {
        VmName::parse(name).unwrap()
    }

    #[test]
    fn test_poweroff_keeps_name_and_subcommand_separate() {
        let args = control(&vm("my vm; reboot"), ControlAction::PowerOff, "headless");
        assert_eq!(args, vec!["controlvm", "my vm; reboot", "poweroff"]);
    }

    #[test]
    fn test_start_uses_startvm_with_type() {
        let args = control(&vm("dev"), ControlAction::Start, "headless");
        assert_eq!(args, vec!["startvm", "dev", "--type", "headless"]);
    }

    #[test]
    fn test_savestate_uses_controlvm() {
        let args = control(&vm("dev"), ControlAction::SaveState, "headless");
        assert_eq!(args, vec!["controlvm", "dev", "savestate"]);
    }

    #[test]
    fn test_put_scancodes_formats_each_byte_as_argument() {
        let args = put_scancodes(&vm("dev"), &[0x2A, 0x1E, 0x9E, 0xAA]);
        assert_eq!(
            args,
            vec!["controlvm", "dev", "keyboardputscancode", "2a", "1e", "9e", "aa"]
        );
    }

    #[test]
    fn test_screenshot_path_is_single_argument() {
        let args = screenshot_png(&vm("dev"), Path::new("/tmp/shot dir/a.png"));
        assert_eq!(args.len(), 4);
        assert_eq!(args[3], "/tmp/shot dir/a.png");
    }

    #[test]
    fn test_show_vm_info_is_machine_readable() {
        assert_eq!(
            show_vm_info(&vm("dev")),
            vec!["showvminfo", "dev", "--machinereadable"]
        );
    }
}
