//! Error types for message encoding and decoding.

use thiserror::Error;

/// Errors that can occur while decoding a protocol message.
///
/// Faults discovered while decoding a model description name the offending
/// variable where one is known.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("message truncated: need {needed} bytes, have {available}")]
    UnexpectedEnd { needed: usize, available: usize },

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    #[error("bad description signature: {magic:#010x}")]
    BadSignature { magic: u32 },

    #[error("unsupported description schema version {0}")]
    UnsupportedVersion(u16),

    #[error("unknown value type {value} for variable {variable}")]
    UnknownValueType { variable: i32, value: u32 },

    #[error("unknown causality {value} for variable {variable}")]
    UnknownCausality { variable: i32, value: u32 },

    #[error("unknown status value {0}")]
    UnknownStatus(u32),

    #[error("invalid bool value {0}")]
    InvalidBool(u8),

    #[error("duplicate variable id {0} in value bundle")]
    DuplicateVariableId(i32),
}
