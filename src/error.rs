//! Unified error type for the simhost library.
//!
//! Module-specific failures ([`CodecError`], [`WasmHostError`]) are wrapped
//! transparently; protocol-level faults detected by the runtime itself get
//! their own variants so callers can branch on them directly.

use thiserror::Error;

use crate::codec::CodecError;
use crate::host::WasmHostError;
use crate::model::{Causality, VariableType};
use crate::runtime::Phase;

/// Unified error type for all simhost operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Failure reported by the wasm engine abstraction (load, link,
    /// instantiate, trap, memory access).
    #[error(transparent)]
    Host(#[from] WasmHostError),

    /// Malformed or schema-invalid message in either direction.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The guest wanted to write a larger response than the configured
    /// scratch region allows; the partial response is undecodable.
    #[error("response buffer too small: need {need} bytes, have {have}")]
    BufferTooSmall { need: usize, have: usize },

    /// Staging a request would run past the end of guest linear memory.
    #[error(
        "request of {len} bytes at offset {offset} overflows linear memory of {memory_size} bytes"
    )]
    LinearMemoryOverflow {
        offset: usize,
        len: usize,
        memory_size: usize,
    },

    /// The guest rejected the call with a negative length (guest-detected
    /// protocol error).
    #[error("guest rejected the call with code {0}")]
    GuestFault(i32),

    /// Lifecycle ordering violation; the guest was not invoked.
    #[error("`{operation}` is not legal in phase {phase:?}")]
    Precondition {
        operation: &'static str,
        phase: Phase,
    },

    /// `load_state` buffer length is not a positive multiple of the wasm
    /// page size.
    #[error("snapshot size {size} is not a positive multiple of 65536")]
    InvalidSnapshot { size: usize },

    /// A value bundle or id list referenced a variable the model does not
    /// declare.
    #[error("unknown variable id {0}")]
    UnknownVariableId(i32),

    /// A bundle entry's section does not match the variable's declared
    /// value type.
    #[error("variable {id} is declared {declared:?}, got a {got:?} value")]
    VariableTypeMismatch {
        id: i32,
        declared: VariableType,
        got: VariableType,
    },

    /// `set_values` targeted a variable whose causality the host may not
    /// write.
    #[error("causality {causality:?} does not allow writing variable {id}")]
    CausalityForbidsSet { id: i32, causality: Causality },
}

/// A [`Result`] type alias using the unified [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns `true` if this is a codec error.
    pub fn is_codec(&self) -> bool {
        matches!(self, Self::Codec(_))
    }

    /// Returns `true` if this is an engine-level error.
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host(_))
    }

    /// Whether this failure leaves the runtime unusable.
    ///
    /// Buffer overruns and traps poison the instance; validation, codec
    /// and guest-rejection faults do not.
    pub fn poisons_runtime(&self) -> bool {
        matches!(
            self,
            Self::BufferTooSmall { .. }
                | Self::LinearMemoryOverflow { .. }
                | Self::Host(WasmHostError::Trap(_))
        )
    }
}
