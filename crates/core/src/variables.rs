//! Operation variables and storage key evaluation.

use serde_json::{Map, Value as JsonValue};

/// Variables of an operation, by name.
pub type Variables = Map<String, JsonValue>;

/// Rendering used for a variable the operation did not provide.
const UNDEFINED: &str = "undefined";

/// Substitutes `$name` references in a raw storage key.
///
/// Values render as compact JSON, so `friends(first: $first)` with
/// `first = 10` evaluates to `friends(first: 10)`. Keys without `$` are
/// returned as-is.
pub fn evaluate_key(key_raw: &str, variables: &Variables) -> String {
    if !key_raw.contains('$') {
        return key_raw.to_string();
    }

    let mut out = String::with_capacity(key_raw.len());
    let mut chars = key_raw.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }

        let mut end = start + 1;
        while let Some(&(i, c)) = chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                end = i + c.len_utf8();
                chars.next();
            } else {
                break;
            }
        }

        let name = &key_raw[start + 1..end];
        if name.is_empty() {
            out.push('$');
            continue;
        }

        match variables.get(name) {
            Some(value) => out.push_str(&value.to_string()),
            None => out.push_str(UNDEFINED),
        }
    }

    out
}
