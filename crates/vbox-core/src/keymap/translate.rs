//! Keystroke translator: text with `<token>` markers → ordered scancode actions.
//!
//! The browser sends strings such as `"ls -l<enter>"`.  Translation happens
//! in two stages:
//!
//! 1. [`tokenize`] splits the string into [`KeyToken`]s, recognising
//!    `<name>` markers for special keys and treating everything else as
//!    literal characters.
//! 2. [`lower`] resolves each token in the [`ScancodeTable`] and emits one
//!    press action followed by one release action.
//!
//! Each token is a self-contained press-then-release unit.  `<ctrl>c` is a
//! tap of Ctrl followed by a tap of `c`, not Ctrl+C; there is no chord
//! syntax.
//!
//! Timing is not this module's concern.  The output is only an ordered list;
//! whoever transmits it decides how to pace it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::scancode::{KeyEntry, ScancodeTable};

/// Errors produced while translating keystroke text.
///
/// Both variants are detected locally, before anything is sent to a VM.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// A literal character has no scancode table entry.
    #[error("no scancode for character {0:?}")]
    UnknownKey(char),

    /// A `<name>` marker did not name a known special key.
    #[error("malformed keystroke input: {0}")]
    MalformedInput(String),
}

/// One parsed unit of keystroke input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyToken {
    /// A literal character typed as-is.
    Literal(char),
    /// A `<name>` marker; the name is stored without the brackets, as written.
    Special(String),
}

/// Whether an action pushes a key down or lets it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyDirection {
    Press,
    Release,
}

/// A single press or release event for one key, as raw set-1 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScancodeAction {
    pub direction: KeyDirection,
    pub bytes: Vec<u8>,
}

impl ScancodeAction {
    /// The make-code action for `entry`.
    pub fn press(entry: KeyEntry) -> Self {
        Self {
            direction: KeyDirection::Press,
            bytes: entry.make_code(),
        }
    }

    /// The break-code action for `entry`.
    pub fn release(entry: KeyEntry) -> Self {
        Self {
            direction: KeyDirection::Release,
            bytes: entry.break_code(),
        }
    }

    pub fn is_press(&self) -> bool {
        self.direction == KeyDirection::Press
    }

    /// Bytes formatted the way `keyboardputscancode` expects them (`"1e"`).
    pub fn hex_codes(&self) -> impl Iterator<Item = String> + '_ {
        self.bytes.iter().map(|b| format!("{b:02x}"))
    }
}

/// Splits keystroke text into tokens.
///
/// A `<` starts a special-key marker when a `>` closes it and the text in
/// between is non-empty and holds no other `<` or `>`.  So `<page up>` and
/// `<ctrl+alt>` are markers (and [`lower`] rejects them), while `a<b`, `<>`
/// and a lone `>` are ordinary characters.  Tokenizing never fails.
pub fn tokenize(input: &str) -> Vec<KeyToken> {
    let mut tokens = Vec::new();
    let mut rest = input;

    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some(name) = bracketed_name(&rest[1..]) {
                tokens.push(KeyToken::Special(name.to_string()));
                // '<' + name + '>'
                rest = &rest[name.len() + 2..];
                continue;
            }
        }
        tokens.push(KeyToken::Literal(ch));
        rest = &rest[ch.len_utf8()..];
    }

    tokens
}

/// Returns the marker name if `after_open` starts with `name>`.
fn bracketed_name(after_open: &str) -> Option<&str> {
    let end = after_open.find(|c: char| c == '<' || c == '>')?;
    let closes_here = after_open[end..].starts_with('>');
    (closes_here && end > 0).then(|| &after_open[..end])
}

/// Resolves tokens to press/release pairs, preserving token order.
///
/// # Errors
///
/// - [`TranslateError::UnknownKey`] for a literal character outside the table.
/// - [`TranslateError::MalformedInput`] for an unrecognised `<name>`.
pub fn lower(tokens: &[KeyToken]) -> Result<Vec<ScancodeAction>, TranslateError> {
    let mut actions = Vec::with_capacity(tokens.len() * 2);
    for token in tokens {
        let entry = match token {
            KeyToken::Literal(ch) => {
                ScancodeTable::lookup_char(*ch).map_err(|_| TranslateError::UnknownKey(*ch))?
            }
            KeyToken::Special(name) => ScancodeTable::lookup_name(name).map_err(|_| {
                TranslateError::MalformedInput(format!("unrecognized key token <{name}>"))
            })?,
        };
        actions.push(ScancodeAction::press(entry));
        actions.push(ScancodeAction::release(entry));
    }
    Ok(actions)
}

/// Translates keystroke text into an ordered list of scancode actions.
///
/// Empty input yields an empty list.
///
/// # Errors
///
/// See [`lower`].
///
/// # Example
///
/// ```rust
/// use vbox_core::translate;
///
/// let actions = translate("<enter>").unwrap();
/// assert_eq!(actions.len(), 2);
/// assert_eq!(actions[0].bytes, vec![0x1c]);
/// assert_eq!(actions[1].bytes, vec![0x9c]);
/// ```
pub fn translate(input: &str) -> Result<Vec<ScancodeAction>, TranslateError> {
    lower(&tokenize(input))
}

/// Packs actions into byte batches of at most `max_bytes` each.
///
/// Batches break only between actions, so a make-code and its prefix never
/// end up in different batches.  An action longer than `max_bytes` gets a
/// batch of its own.  Concatenating the batches reproduces the unbatched
/// byte stream exactly.
pub fn pack_batches(actions: &[ScancodeAction], max_bytes: usize) -> Vec<Vec<u8>> {
    let mut batches: Vec<Vec<u8>> = Vec::new();
    let mut current: Vec<u8> = Vec::new();

    for action in actions {
        if !current.is_empty() && current.len() + action.bytes.len() > max_bytes {
            batches.push(std::mem::take(&mut current));
        }
        current.extend_from_slice(&action.bytes);
    }
    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

// ── Tests ─────────────────────────────────────────────────────────────────────
