use thiserror::Error;

/// Errors produced while parsing identifiers, type codes, and records.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("unknown {kind} name: {name}")]
    UnknownName { kind: &'static str, name: String },

    #[error("unknown {kind} code: {code}")]
    UnknownCode { kind: &'static str, code: i16 },

    #[error("invalid {field} value: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("malformed record at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}
