//! Keyboard scancode table and keystroke translation.
//!
//! The VM's virtual keyboard speaks PS/2 scancode set 1.  [`scancode`] holds
//! the table; [`translate`] turns operator text into press/release actions.

pub mod scancode;
pub mod translate;

pub use scancode::{KeyEntry, ScancodeTable, UnknownKey};
pub use translate::{pack_batches, translate, KeyDirection, KeyToken, ScancodeAction, TranslateError};
