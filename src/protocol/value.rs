//! The value model: a tagged union over the types the protocol admits.
//!
//! Input text is discriminated into Integer, Boolean, String, or Nil by the
//! ordered rules in [`parse_value`]; the same discriminator drives the
//! formatter. Nil is a sentinel that may be returned but never stored.

use super::{ProtocolError, ProtocolResult};

/// Reserved tokens; they parse as their typed form and are never valid keys.
const TRUE_TOKEN: &str = "TRUE";
const FALSE_TOKEN: &str = "FALSE";
const NIL_TOKEN: &str = "NIL";

/// A typed protocol value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// Signed 64-bit integer, canonicalized on parse.
    Integer(i64),

    /// Boolean, written as `TRUE` / `FALSE` on the wire.
    Boolean(bool),

    /// UTF-8 string.
    String(String),

    /// Absence sentinel; returned for missing keys, never stored.
    Nil,
}

impl From<Option<Value>> for Value {
    /// Collapses an absent value into the Nil sentinel.
    fn from(value: Option<Value>) -> Self {
        value.unwrap_or(Value::Nil)
    }
}

/// Whether `text` is a non-empty run of ASCII decimal digits.
pub(crate) fn is_digit_run(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Whether `text` is one of the reserved tokens.
pub(crate) fn is_reserved(text: &str) -> bool {
    matches!(text, TRUE_TOKEN | FALSE_TOKEN | NIL_TOKEN)
}

/// Parses a value token, applying the typing rules in order: the NIL
/// rejection, booleans, digit runs, quoted strings, then raw strings.
///
/// A quoted string must open and close with `"` and may carry `\"` for an
/// inner quote; nothing else is escaped. A digit run too wide for i64 is
/// kept as its textual form rather than failing the command.
pub fn parse_value(text: &str) -> ProtocolResult<Value> {
    match text {
        NIL_TOKEN => return Err(ProtocolError::NilValue),
        TRUE_TOKEN => return Ok(Value::Boolean(true)),
        FALSE_TOKEN => return Ok(Value::Boolean(false)),
        _ => {}
    }

    if is_digit_run(text) {
        if let Ok(n) = text.parse::<i64>() {
            return Ok(Value::Integer(n));
        }
        return Ok(Value::String(text.to_string()));
    }

    if text.starts_with('"') {
        if text.len() >= 2 && text.ends_with('"') {
            let inner = &text[1..text.len() - 1];
            return Ok(Value::String(inner.replace("\\\"", "\"")));
        }
        return Err(ProtocolError::UnclosedString);
    }

    Ok(Value::String(text.to_string()))
}

/// Validates a key token. Digit runs and reserved tokens are rejected;
/// every other string is accepted verbatim.
pub fn parse_key(text: &str) -> ProtocolResult<String> {
    if is_digit_run(text) || is_reserved(text) {
        return Err(ProtocolError::InvalidKey(text.to_string()));
    }
    Ok(text.to_string())
}
