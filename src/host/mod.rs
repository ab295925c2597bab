//! Narrow abstraction over the embedded WebAssembly engine.
//!
//! The runtime consumes guest modules exclusively through this module:
//! instantiation under a configured stack size, typed export lookup and
//! invocation, bounds-checked linear-memory windows, and memory
//! size/grow queries.

mod error;
mod sandbox;

pub use error::WasmHostError;
pub use sandbox::{GuestCall, Sandbox, REQUIRED_EXPORTS, WASM_PAGE_SIZE};
