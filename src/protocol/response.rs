//! Response formatting: protocol-faithful rendering of outcomes and errors.
//!
//! Rendering is the inverse of parsing. A string is quoted whenever writing
//! it bare would change how it parses back: it contains a space, looks like
//! a digit run, collides with a reserved token, or carries a quote.

use std::fmt;

use super::value::{is_digit_run, is_reserved};
use super::{Outcome, Value};

/// Renders a single value into its wire form.
pub fn render(value: &Value) -> String {
    match value {
        Value::Nil => "NIL".to_string(),
        Value::Boolean(true) => "TRUE".to_string(),
        Value::Boolean(false) => "FALSE".to_string(),
        Value::Integer(n) => n.to_string(),
        Value::String(s) => {
            if needs_quoting(s) {
                quote(s)
            } else {
                s.clone()
            }
        }
    }
}

fn needs_quoting(s: &str) -> bool {
    s.contains(' ') || is_digit_run(s) || is_reserved(s) || s.contains('"')
}

/// Wraps `s` in quotes, escaping each inner `"` as `\"`. No other escapes.
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\\\""))
}

/// Renders a successful outcome.
pub fn format_success(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Set { old, new } => format!("{} {}", render(old), render(new)),
        Outcome::Single(value) => render(value),
        Outcome::Ok => "OK".to_string(),
    }
}

/// Renders an error as `ERR "<message>"`, escaping inner quotes.
pub fn format_error<E: fmt::Display>(error: &E) -> String {
    format!("ERR {}", quote(&error.to_string()))
}
