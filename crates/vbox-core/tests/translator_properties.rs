//! Integration tests for the keystroke translator.
//!
//! These exercise the public API end to end: tokenizing, table lookup, and
//! lowering to press/release actions, plus packing into CLI batches.

use vbox_core::{
    keymap::translate::{tokenize, KeyToken},
    pack_batches,
    protocol::commands::put_scancodes,
    translate, KeyDirection, TranslateError, VmName,
};

/// Counts literal characters and special tokens the slow way.
fn count_units(input: &str) -> usize {
    tokenize(input).len()
}

#[test]
fn test_action_count_is_two_per_literal_or_token() {
    let samples = [
        "",
        "a",
        "root<enter>",
        "<ctrl><alt><delete>",
        "echo \"Hello, World!\" > /tmp/x<enter>",
        "a<b c",
        "<up><up><down><down><left><right><left><right>ba<enter>",
        "x > y && y < z",
    ];

    for input in samples {
        let actions = translate(input).unwrap_or_else(|e| panic!("{input:?}: {e}"));
        assert_eq!(actions.len(), 2 * count_units(input), "input {input:?}");
    }
}

#[test]
fn test_each_unit_contributes_one_press_and_one_release() {
    let actions = translate("Pa$$w0rd<tab><enter>").unwrap();
    let presses = actions
        .iter()
        .filter(|a| a.direction == KeyDirection::Press)
        .count();
    let releases = actions.len() - presses;
    assert_eq!(presses, 10);
    assert_eq!(releases, 10);
}

#[test]
fn test_tokens_and_literals_counted_separately() {
    let tokens = tokenize("ab<enter>c");
    assert_eq!(
        tokens,
        vec![
            KeyToken::Literal('a'),
            KeyToken::Literal('b'),
            KeyToken::Special("enter".to_string()),
            KeyToken::Literal('c'),
        ]
    );
}

#[test]
fn test_empty_string_translates_to_nothing() {
    assert!(translate("").unwrap().is_empty());
}

#[test]
fn test_bad_token_fails_before_producing_anything() {
    let result = translate("ls<badtoken>");
    assert!(matches!(result, Err(TranslateError::MalformedInput(_))));
}

#[test]
fn test_unknown_character_is_named_in_error() {
    let err = translate("price: 5€").unwrap_err();
    assert_eq!(err, TranslateError::UnknownKey('€'));
    assert!(err.to_string().contains('€'));
}

#[test]
fn test_batches_rebuild_the_exact_command_stream() {
    // Arrange
    let vm = VmName::parse("dev").unwrap();
    let actions = translate("sudo reboot<enter>").unwrap();
    let expected: Vec<String> = actions.iter().flat_map(|a| a.hex_codes()).collect();

    // Act: split into small batches, then rebuild the hex argument list
    let rebuilt: Vec<String> = pack_batches(&actions, 4)
        .iter()
        .flat_map(|batch| put_scancodes(&vm, batch).into_iter().skip(3))
        .collect();

    // Assert
    assert_eq!(rebuilt, expected);
}
