//! # vbox-core
//!
//! Shared library for VBox-Web-Control containing the keyboard scancode
//! tables, the keystroke translator, VM domain types, and the vocabulary of
//! the hypervisor command-line tool (argument vectors and output parsers).
//!
//! This crate performs no I/O.  It never starts a process, opens a socket, or
//! touches the file system, which keeps everything in it testable with plain
//! `#[test]` functions.
//!
//! # Architecture overview (for beginners)
//!
//! VBox-Web-Control lets an operator drive a headless VirtualBox VM from a
//! browser: start it, stop it, type into it, and watch its screen.  The
//! browser sends text such as `"root<enter>"`; the server has to turn that
//! text into the raw keyboard scancodes the virtual PS/2 keyboard of the VM
//! understands, and hand them to `VBoxManage`.
//!
//! - **`keymap`** – The scancode table (which bytes a key sends when pressed
//!   and released) and the translator that turns text plus `<token>` markers
//!   into an ordered list of press/release actions.
//!
//! - **`domain`** – Small validated value types: VM names, run states, and
//!   lifecycle actions.
//!
//! - **`protocol`** – How we talk to `VBoxManage`: argument vectors for each
//!   subcommand and parsers for the text it prints back.

pub mod domain;
pub mod keymap;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `vbox_core::translate` instead of `vbox_core::keymap::translate::translate`.
pub use domain::vm::{ControlAction, InvalidAction, VmName, VmNameError, VmRunState};
pub use keymap::scancode::{KeyEntry, ScancodeTable, UnknownKey};
pub use keymap::translate::{
    pack_batches, translate, KeyDirection, KeyToken, ScancodeAction, TranslateError,
};
