use crate::RedactedPairingCode;

#[test]
fn given_six_digits_when_parsed_then_accepts_trimmed_code() {
    let code = RedactedPairingCode::parse("  123456 \n").expect("six digits are valid");

    assert_eq!(code.expose(), "123456");
    assert_eq!(code.len(), 6);
}

#[test]
fn given_malformed_reply_when_parsed_then_rejects() {
    for input in ["", "12345", "1234567", "12a456", "12 456", "１２３４５６"] {
        assert!(
            RedactedPairingCode::parse(input).is_none(),
            "Should reject {input:?}"
        );
    }
}

/// **VALUE**: Pairing codes travel inside queued operations that get `{:?}`-logged.
///
/// **BUG THIS CATCHES**: Would catch a derived Debug/Display leaking the digits.
#[test]
fn given_pairing_code_when_formatted_then_digits_are_hidden() {
    let code = RedactedPairingCode::new("987654");

    assert!(!format!("{code:?}").contains("987654"));
    assert!(!format!("{code}").contains("987654"));
}

#[test]
fn given_pairing_code_when_serialized_then_fails() {
    let code = RedactedPairingCode::new("987654");

    let result = serde_json::to_string(&code);

    assert!(result.is_err(), "Serialization must be refused");
}
