use crate::command::tokenize;

/// **VALUE**: Pins down the quoting and escaping rules in one realistic line.
///
/// **WHY THIS MATTERS**: Users paste shell-ish commands; every argument must reach
/// the backend exactly as the user meant it.
///
/// **BUG THIS CATCHES**: An escaped quote inside single quotes closing the span
/// early, or an escaped space splitting a token.
#[test]
fn given_mixed_quotes_and_escapes_when_tokenized_then_tokens_are_preserved() {
    // GIVEN: Double quotes, single quotes with an escaped quote, escaped space
    let input = r#"a "b c" 'd\'e' f\ g"#;

    // WHEN: Tokenizing
    let tokens = tokenize(input);

    // THEN: Four tokens
    assert_eq!(tokens, vec!["a", "b c", "d'e", "f g"]);
}

#[test]
fn given_leading_adb_when_tokenized_then_program_name_is_dropped() {
    assert_eq!(tokenize("adb devices -l"), vec!["devices", "-l"]);
}

#[test]
fn given_adb_in_later_position_when_tokenized_then_it_is_kept() {
    assert_eq!(tokenize("shell echo adb"), vec!["shell", "echo", "adb"]);
}

#[test]
fn given_empty_or_blank_input_when_tokenized_then_no_tokens() {
    assert!(tokenize("").is_empty());
    assert!(tokenize(" \t\n ").is_empty());
}

/// **VALUE**: Verifies the best-effort handling of malformed input.
///
/// **WHY THIS MATTERS**: The tokenizer has no error path; malformed input must
/// still produce tokens instead of panicking or swallowing text.
///
/// **BUG THIS CATCHES**: Losing the last token when a quote is never closed or the
/// input ends in a lone backslash.
#[test]
fn given_unterminated_quote_or_trailing_backslash_when_tokenized_then_token_ends_at_input_end() {
    assert_eq!(tokenize("shell 'echo hi"), vec!["shell", "echo hi"]);
    assert_eq!(tokenize("shell ls\\"), vec!["shell", "ls"]);
}

#[test]
fn given_other_quote_inside_quoted_span_when_tokenized_then_it_is_literal() {
    assert_eq!(tokenize(r#"shell "it's""#), vec!["shell", "it's"]);
}

#[test]
fn given_tabs_and_newlines_when_tokenized_then_they_separate_tokens() {
    assert_eq!(tokenize("shell\tls\n-la"), vec!["shell", "ls", "-la"]);
}

#[test]
fn given_empty_quotes_when_tokenized_then_no_empty_token_is_produced() {
    assert_eq!(tokenize(r#"shell "" ls"#), vec!["shell", "ls"]);
}
