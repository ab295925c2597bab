//! Error types for the wasm engine abstraction.

use thiserror::Error;

/// Errors surfaced by the narrow wasm capability surface.
///
/// Everything the underlying engine reports is flattened to a message
/// string here; callers only ever branch on the variant.
#[derive(Error, Debug)]
pub enum WasmHostError {
    #[error("failed to configure wasm engine: {0}")]
    Engine(String),

    #[error("failed to load module: {0}")]
    Load(String),

    #[error("failed to instantiate module: {0}")]
    Instantiate(String),

    #[error("missing required export `{0}`")]
    MissingExport(String),

    #[error("export `{name}` has an unexpected signature: {reason}")]
    BadSignature { name: String, reason: String },

    #[error("guest call trapped: {0}")]
    Trap(String),

    #[error("guest allocator returned null for {len} bytes")]
    AllocFailed { len: i32 },

    #[error("memory access out of bounds: offset {offset} + len {len} > size {size}")]
    MemoryAccess {
        offset: usize,
        len: usize,
        size: usize,
    },

    #[error("failed to grow linear memory to {pages} pages: {reason}")]
    MemoryGrow { pages: u64, reason: String },
}
