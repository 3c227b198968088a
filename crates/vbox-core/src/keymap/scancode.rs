//! PS/2 scancode set 1 table for the virtual keyboard of a VirtualBox guest.
//!
//! `VBoxManage controlvm <vm> keyboardputscancode` accepts raw set-1 bytes
//! written as two-digit hex strings.  This module knows which bytes each
//! printable character and each named special key produces.
//!
//! # Make-codes and break-codes (for beginners)
//!
//! A PS/2 keyboard sends one byte sequence when a key goes down (the
//! *make-code*) and another when it comes back up (the *break-code*).  In
//! scancode set 1 the break-code is simply the make-code with the high bit
//! set:
//!
//! | Key    | Make | Break |
//! |--------|------|-------|
//! | A      | 1E   | 9E    |
//! | Enter  | 1C   | 9C    |
//! | Ctrl   | 1D   | 9D    |
//!
//! Keys added to the keyboard after the original IBM PC/XT design (arrow
//! cluster, Insert/Home/End, Windows key) share their base code with an
//! older key and are told apart by an `E0` *extended prefix* in front of both
//! the make and the break byte.
//!
//! # Shifted characters
//!
//! There is no scancode for `A` or `!`.  A real keyboard produces them by
//! holding Shift while pressing `a` or `1`.  Entries flagged `shifted` fold
//! the left-Shift make (`2A`) into their make-code and the left-Shift break
//! (`AA`) into their break-code, so one character is still exactly one press
//! and one release.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extended-code prefix byte for keys outside the original XT layout.
pub const EXTENDED_PREFIX: u8 = 0xE0;

/// Bit set on a make-code to form the matching break-code.
pub const BREAK_BIT: u8 = 0x80;

/// Left Shift make-code.
pub const SHIFT_MAKE: u8 = 0x2A;

/// Left Shift break-code.
pub const SHIFT_BREAK: u8 = SHIFT_MAKE | BREAK_BIT;

/// Returned when a key name or character has no entry in the table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key: {0}")]
pub struct UnknownKey(pub String);

/// One row of the scancode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyEntry {
    /// Set-1 make-code without any prefix.
    pub code: u8,
    /// Whether the key needs the `E0` extended prefix.
    pub extended: bool,
    /// Whether left Shift must be held around the key.
    pub shifted: bool,
}

impl KeyEntry {
    /// A plain, unprefixed key.
    pub const fn plain(code: u8) -> Self {
        Self {
            code,
            extended: false,
            shifted: false,
        }
    }

    /// A key that needs the `E0` prefix.
    pub const fn extended(code: u8) -> Self {
        Self {
            code,
            extended: true,
            shifted: false,
        }
    }

    /// A character produced by holding Shift over a plain key.
    pub const fn shifted(code: u8) -> Self {
        Self {
            code,
            extended: false,
            shifted: true,
        }
    }

    /// Byte sequence sent when the key goes down.
    pub fn make_code(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(3);
        if self.shifted {
            bytes.push(SHIFT_MAKE);
        }
        if self.extended {
            bytes.push(EXTENDED_PREFIX);
        }
        bytes.push(self.code);
        bytes
    }

    /// Byte sequence sent when the key comes back up.
    ///
    /// For shifted entries the Shift release comes last, mirroring the order
    /// a typist's fingers would leave the keys.
    pub fn break_code(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(3);
        if self.extended {
            bytes.push(EXTENDED_PREFIX);
        }
        bytes.push(self.code | BREAK_BIT);
        if self.shifted {
            bytes.push(SHIFT_BREAK);
        }
        bytes
    }
}

/// Read-only lookup into the scancode tables.
///
/// The tables are `match` expressions compiled into the binary, so there is
/// nothing to build at runtime and nothing that can be mutated.
pub struct ScancodeTable;

impl ScancodeTable {
    /// Looks up a literal character.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownKey`] naming the character when it is not covered.
    pub fn lookup_char(ch: char) -> Result<KeyEntry, UnknownKey> {
        char_entry(ch).ok_or_else(|| UnknownKey(ch.to_string()))
    }

    /// Looks up a special key by name, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownKey`] naming the key when the name is not recognised.
    pub fn lookup_name(name: &str) -> Result<KeyEntry, UnknownKey> {
        named_entry(&name.to_ascii_lowercase()).ok_or_else(|| UnknownKey(name.to_string()))
    }
}

/// Set-1 entry for a literal character.
fn char_entry(ch: char) -> Option<KeyEntry> {
    let entry = match ch {
        // Letters
        'a' => KeyEntry::plain(0x1E),
        'b' => KeyEntry::plain(0x30),
        'c' => KeyEntry::plain(0x2E),
        'd' => KeyEntry::plain(0x20),
        'e' => KeyEntry::plain(0x12),
        'f' => KeyEntry::plain(0x21),
        'g' => KeyEntry::plain(0x22),
        'h' => KeyEntry::plain(0x23),
        'i' => KeyEntry::plain(0x17),
        'j' => KeyEntry::plain(0x24),
        'k' => KeyEntry::plain(0x25),
        'l' => KeyEntry::plain(0x26),
        'm' => KeyEntry::plain(0x32),
        'n' => KeyEntry::plain(0x31),
        'o' => KeyEntry::plain(0x18),
        'p' => KeyEntry::plain(0x19),
        'q' => KeyEntry::plain(0x10),
        'r' => KeyEntry::plain(0x13),
        's' => KeyEntry::plain(0x1F),
        't' => KeyEntry::plain(0x14),
        'u' => KeyEntry::plain(0x16),
        'v' => KeyEntry::plain(0x2F),
        'w' => KeyEntry::plain(0x11),
        'x' => KeyEntry::plain(0x2D),
        'y' => KeyEntry::plain(0x15),
        'z' => KeyEntry::plain(0x2C),
        upper if upper.is_ascii_uppercase() => {
            let base = char_entry(upper.to_ascii_lowercase())?;
            KeyEntry::shifted(base.code)
        }

        // Digit row
        '1' => KeyEntry::plain(0x02),
        '2' => KeyEntry::plain(0x03),
        '3' => KeyEntry::plain(0x04),
        '4' => KeyEntry::plain(0x05),
        '5' => KeyEntry::plain(0x06),
        '6' => KeyEntry::plain(0x07),
        '7' => KeyEntry::plain(0x08),
        '8' => KeyEntry::plain(0x09),
        '9' => KeyEntry::plain(0x0A),
        '0' => KeyEntry::plain(0x0B),

        // Shifted digit row (US layout)
        '!' => KeyEntry::shifted(0x02),
        '@' => KeyEntry::shifted(0x03),
        '#' => KeyEntry::shifted(0x04),
        '$' => KeyEntry::shifted(0x05),
        '%' => KeyEntry::shifted(0x06),
        '^' => KeyEntry::shifted(0x07),
        '&' => KeyEntry::shifted(0x08),
        '*' => KeyEntry::shifted(0x09),
        '(' => KeyEntry::shifted(0x0A),
        ')' => KeyEntry::shifted(0x0B),

        // Punctuation
        '-' => KeyEntry::plain(0x0C),
        '=' => KeyEntry::plain(0x0D),
        '[' => KeyEntry::plain(0x1A),
        ']' => KeyEntry::plain(0x1B),
        '\\' => KeyEntry::plain(0x2B),
        ';' => KeyEntry::plain(0x27),
        '\'' => KeyEntry::plain(0x28),
        '`' => KeyEntry::plain(0x29),
        ',' => KeyEntry::plain(0x33),
        '.' => KeyEntry::plain(0x34),
        '/' => KeyEntry::plain(0x35),
        '_' => KeyEntry::shifted(0x0C),
        '+' => KeyEntry::shifted(0x0D),
        '{' => KeyEntry::shifted(0x1A),
        '}' => KeyEntry::shifted(0x1B),
        '|' => KeyEntry::shifted(0x2B),
        ':' => KeyEntry::shifted(0x27),
        '"' => KeyEntry::shifted(0x28),
        '~' => KeyEntry::shifted(0x29),
        '<' => KeyEntry::shifted(0x33),
        '>' => KeyEntry::shifted(0x34),
        '?' => KeyEntry::shifted(0x35),

        // Whitespace
        ' ' => KeyEntry::plain(0x39),
        '\t' => KeyEntry::plain(0x0F),
        '\n' => KeyEntry::plain(0x1C),

        _ => return None,
    };
    Some(entry)
}

/// Set-1 entry for a lower-case special key name.
fn named_entry(name: &str) -> Option<KeyEntry> {
    let entry = match name {
        "enter" | "return" => KeyEntry::plain(0x1C),
        "esc" | "escape" => KeyEntry::plain(0x01),
        "backspace" => KeyEntry::plain(0x0E),
        "tab" => KeyEntry::plain(0x0F),
        "space" => KeyEntry::plain(0x39),
        "capslock" => KeyEntry::plain(0x3A),

        // Modifiers (left-hand keys)
        "ctrl" | "strg" => KeyEntry::plain(0x1D),
        "shift" => KeyEntry::plain(SHIFT_MAKE),
        "alt" => KeyEntry::plain(0x38),
        "win" | "windows" => KeyEntry::extended(0x5B),

        // Keypad Delete; the guest treats it the same as the editing-cluster key.
        "delete" | "del" => KeyEntry::plain(0x53),

        // Editing cluster
        "insert" => KeyEntry::extended(0x52),
        "home" => KeyEntry::extended(0x47),
        "end" => KeyEntry::extended(0x4F),
        "pageup" => KeyEntry::extended(0x49),
        "pagedown" => KeyEntry::extended(0x51),

        // Arrows
        "up" => KeyEntry::extended(0x48),
        "down" => KeyEntry::extended(0x50),
        "left" => KeyEntry::extended(0x4B),
        "right" => KeyEntry::extended(0x4D),

        // Function keys; F11/F12 were added later and are not contiguous.
        "f1" => KeyEntry::plain(0x3B),
        "f2" => KeyEntry::plain(0x3C),
        "f3" => KeyEntry::plain(0x3D),
        "f4" => KeyEntry::plain(0x3E),
        "f5" => KeyEntry::plain(0x3F),
        "f6" => KeyEntry::plain(0x40),
        "f7" => KeyEntry::plain(0x41),
        "f8" => KeyEntry::plain(0x42),
        "f9" => KeyEntry::plain(0x43),
        "f10" => KeyEntry::plain(0x44),
        "f11" => KeyEntry::plain(0x57),
        "f12" => KeyEntry::plain(0x58),

        _ => return None,
    };
    Some(entry)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
