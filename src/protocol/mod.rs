//! Wire protocol: typed values, parsing rules, and response formatting.
//!
//! The protocol is line-oriented text. A command names a verb, a key, and
//! optionally a value token; a response renders typed values back into the
//! same textual form. This module owns everything about that text:
//!
//! - The `Value` tagged union and its parsing rules
//! - Key validation (digit runs and reserved words are not keys)
//! - The response formatter, including quoting and escaping

pub mod response;
pub mod value;

pub use response::{format_error, format_success, render};
pub use value::{parse_key, parse_value, Value};

use thiserror::Error;

/// Errors produced while parsing keys and values. The display text is
/// exactly what reaches the wire.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Value {0} is not valid as key")]
    InvalidKey(String),

    #[error("Cannot SET key to NIL")]
    NilValue,

    #[error("Unclosed string")]
    UnclosedString,
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Typed result of executing one command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Previous and new value of a SET; `old` is Nil for a first write.
    Set { old: Value, new: Value },

    /// A single value (GET); Nil when the key is absent.
    Single(Value),

    /// Plain acknowledgement (BEGIN, COMMIT, ROLLBACK).
    Ok,
}
