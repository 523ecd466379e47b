use crate::ADB_BINARY;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Quoted(char),
}

/// Split a raw command string into arguments.
///
/// Whitespace separates tokens outside quotes. `"` and `'` open a quoted span
/// closed only by the same character. A backslash takes the next character
/// literally, inside quotes too. Unterminated quotes and a trailing backslash
/// end the token at end of input. A leading `adb` token is dropped.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut mode = Mode::Normal;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match (mode, ch) {
            (_, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            (Mode::Normal, '"' | '\'') => mode = Mode::Quoted(ch),
            (Mode::Quoted(open), c) if c == open => mode = Mode::Normal,
            (Mode::Normal, ' ' | '\t' | '\n') => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            (_, c) => current.push(c),
        }
    }

    if !current.is_empty() {
        out.push(current);
    }

    if out.first().is_some_and(|first| first == ADB_BINARY) {
        out.remove(0);
    }

    out
}
